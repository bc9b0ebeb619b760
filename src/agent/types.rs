// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Overtext and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::edit::{ClickEvent, Disposition, KeyInput};

/// Messages a management surface can send to the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// A missing `enable` flag means disable.
    ToggleEditMode {
        #[serde(default)]
        enable: bool,
    },
    GetState,
    Reapply,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    ToggleAck { enabled: bool },
    State { enabled: bool },
    Ack { ok: bool },
}

impl Request {
    /// `None` for anything that is not a well-formed request.
    pub fn from_value(value: &Value) -> Option<Self> {
        Self::deserialize(value).ok()
    }
}

impl Response {
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Inbound page events, processed in order by [`super::PageAgent::run`].
#[derive(Debug)]
pub enum PageEvent {
    Message {
        message: Value,
        reply: oneshot::Sender<Option<Value>>,
    },
    Click {
        event: ClickEvent,
        reply: oneshot::Sender<Disposition>,
    },
    PointerDown {
        within_edit_ui: bool,
    },
    Key {
        input: KeyInput,
        reply: oneshot::Sender<Disposition>,
    },
    Draft {
        text: String,
    },
}
