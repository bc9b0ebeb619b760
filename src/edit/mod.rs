// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Overtext and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Edit sessions.
//!
//! One [`EditController`] per page context drives the click-to-edit flow: capture a target,
//! hand it to the host's [`EditSurface`], then either commit (synthesize, persist, patch,
//! reconcile) or cancel. At most one session exists at a time.

use crate::config::SynthesisConfig;
use crate::dom::{NodeId, NodeKind};
use crate::reconcile::Reconciler;
use crate::synthesis::synthesize;

/// The host-rendered editing widget.
pub trait EditSurface: Send {
    fn open(&mut self, target: NodeId, initial_text: &str);
    fn close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPhase {
    Idle,
    Editing,
    Saving,
}

/// Whether the host must suppress the event's default action and propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    PassThrough,
    Consumed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickEvent {
    pub target: NodeId,
    /// The click originated inside the edit surface itself.
    pub within_edit_ui: bool,
}

/// A key press as seen in the capture phase. `key` uses DOM key names (`"Escape"`, `"Enter"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInput {
    pub key: String,
    pub ctrl: bool,
    pub meta: bool,
}

impl KeyInput {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ctrl: false,
            meta: false,
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    fn is_cancel(&self) -> bool {
        self.key == "Escape"
    }

    fn is_commit(&self) -> bool {
        self.key == "Enter" && (self.ctrl || self.meta)
    }
}

#[derive(Debug, Clone)]
struct EditSession {
    target: NodeId,
    draft: String,
}

pub struct EditController {
    reconciler: Reconciler,
    synthesis: SynthesisConfig,
    surface: Box<dyn EditSurface>,
    enabled: bool,
    phase: EditPhase,
    session: Option<EditSession>,
}

impl std::fmt::Debug for EditController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditController")
            .field("enabled", &self.enabled)
            .field("phase", &self.phase)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl EditController {
    pub fn new(reconciler: Reconciler, surface: Box<dyn EditSurface>) -> Self {
        let synthesis = reconciler.config().synthesis();
        Self {
            reconciler,
            synthesis,
            surface,
            enabled: false,
            phase: EditPhase::Idle,
            session: None,
        }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn phase(&self) -> EditPhase {
        self.phase
    }

    /// Node captured by the active session.
    pub fn target(&self) -> Option<NodeId> {
        self.session.as_ref().map(|s| s.target)
    }

    pub fn draft(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.draft.as_str())
    }

    pub fn enable(&mut self) {
        if !self.enabled {
            self.enabled = true;
            tracing::info!("edit mode enabled");
        }
    }

    /// Stops intercepting input. An open session is cancelled.
    pub fn disable(&mut self) {
        if !self.enabled {
            return;
        }
        self.enabled = false;
        self.cancel();
        tracing::info!("edit mode disabled");
    }

    pub async fn on_click(&mut self, event: ClickEvent) -> Disposition {
        if !self.enabled || event.within_edit_ui {
            return Disposition::PassThrough;
        }
        if self.phase != EditPhase::Idle {
            return Disposition::Consumed;
        }

        let captured = {
            let doc = self.reconciler.document().lock().await;
            let target = match doc.kind(event.target) {
                Some(NodeKind::Element(_)) => Some(event.target),
                Some(NodeKind::Text(_)) => doc.parent_element(event.target),
                _ => None,
            };
            target.map(|node| (node, doc.text_content(node).trim().to_owned()))
        };
        let Some((target, initial_text)) = captured else {
            return Disposition::PassThrough;
        };

        self.surface.open(target, &initial_text);
        self.session = Some(EditSession {
            target,
            draft: initial_text,
        });
        self.phase = EditPhase::Editing;
        tracing::debug!(?target, "edit session opened");
        Disposition::Consumed
    }

    /// A pointer-down outside the edit surface abandons the session.
    pub fn on_pointer_down(&mut self, within_edit_ui: bool) {
        if self.phase == EditPhase::Editing && !within_edit_ui {
            self.cancel();
        }
    }

    pub async fn on_key(&mut self, key: &KeyInput) -> Disposition {
        if self.phase != EditPhase::Editing {
            return Disposition::PassThrough;
        }
        if key.is_cancel() {
            self.cancel();
            return Disposition::Consumed;
        }
        if key.is_commit() {
            let text = self.draft().unwrap_or_default().to_owned();
            self.commit(&text).await;
            return Disposition::Consumed;
        }
        Disposition::PassThrough
    }

    pub fn set_draft(&mut self, text: &str) {
        if let Some(session) = self.session.as_mut() {
            session.draft = text.to_owned();
        }
    }

    /// Persists `text` for the captured node and patches it in place. Returns the synthesized
    /// selector, or `None` when no session is open.
    pub async fn commit(&mut self, text: &str) -> Option<String> {
        if self.phase != EditPhase::Editing {
            return None;
        }
        let target = self.target()?;
        self.phase = EditPhase::Saving;

        let selector = {
            let doc = self.reconciler.document().lock().await;
            synthesize(&doc, target, &self.synthesis)
        };
        self.reconciler
            .store()
            .save(self.reconciler.page(), &selector, text)
            .await;
        self.reconciler
            .document()
            .lock()
            .await
            .set_text_content(target, text);
        self.teardown();
        tracing::info!(%selector, "override saved");

        self.reconciler.apply_all().await;
        self.reconciler.start_observing().await;
        Some(selector)
    }

    /// Closes the session without persisting anything.
    pub fn cancel(&mut self) {
        if self.phase == EditPhase::Editing {
            self.teardown();
            tracing::debug!("edit session cancelled");
        }
    }

    fn teardown(&mut self) {
        if self.session.take().is_some() {
            self.surface.close();
        }
        self.phase = EditPhase::Idle;
    }
}
