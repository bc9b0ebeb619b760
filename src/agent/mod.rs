// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Overtext and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Page-resident agent.
//!
//! Owns the page's reconciler and edit controller and serves the management protocol. Host
//! input arrives as [`PageEvent`]s on a channel and is handled strictly in order by one task.

mod types;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::edit::{ClickEvent, Disposition, EditController, EditSurface, KeyInput};
use crate::reconcile::{ApplyReport, Reconciler};

pub use types::{PageEvent, Request, Response};

#[derive(Debug)]
pub struct PageAgent {
    controller: EditController,
}

impl PageAgent {
    pub fn new(reconciler: Reconciler, surface: Box<dyn EditSurface>) -> Self {
        Self {
            controller: EditController::new(reconciler, surface),
        }
    }

    pub fn controller(&self) -> &EditController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut EditController {
        &mut self.controller
    }

    pub fn reconciler(&self) -> &Reconciler {
        self.controller.reconciler()
    }

    pub async fn init(&self) -> ApplyReport {
        self.reconciler().init().await
    }

    /// Answers a recognised message exactly once; unrecognised input gets no response.
    pub async fn handle_message(&mut self, message: &Value) -> Option<Value> {
        let Some(request) = Request::from_value(message) else {
            tracing::debug!(%message, "ignoring unrecognised message");
            return None;
        };
        let response = self.handle_request(request).await;
        match response.to_value() {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(%err, "failed to encode response");
                None
            }
        }
    }

    pub async fn handle_request(&mut self, request: Request) -> Response {
        match request {
            Request::ToggleEditMode { enable } => {
                if enable {
                    self.controller.enable();
                } else {
                    self.controller.disable();
                }
                Response::ToggleAck {
                    enabled: self.controller.is_enabled(),
                }
            }
            Request::GetState => Response::State {
                enabled: self.controller.is_enabled(),
            },
            Request::Reapply => {
                let reconciler = self.reconciler().clone();
                reconciler.apply_all().await;
                Response::Ack { ok: true }
            }
        }
    }

    pub async fn handle_event(&mut self, event: PageEvent) {
        match event {
            PageEvent::Message { message, reply } => {
                let response = self.handle_message(&message).await;
                let _ = reply.send(response);
            }
            PageEvent::Click { event, reply } => {
                let disposition = self.controller.on_click(event).await;
                let _ = reply.send(disposition);
            }
            PageEvent::PointerDown { within_edit_ui } => {
                self.controller.on_pointer_down(within_edit_ui);
            }
            PageEvent::Key { input, reply } => {
                let disposition = self.controller.on_key(&input).await;
                let _ = reply.send(disposition);
            }
            PageEvent::Draft { text } => self.controller.set_draft(&text),
        }
    }

    /// Processes events until every sender is gone, then stops observing the page.
    pub async fn run(mut self, mut events: mpsc::Receiver<PageEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        self.controller.cancel();
        let reconciler = self.reconciler().clone();
        reconciler.stop_observing().await;
        tracing::debug!("page agent stopped");
    }

    /// Runs the agent on its own task and returns a handle for feeding it events.
    pub fn spawn(self, capacity: usize) -> (AgentHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let task = tokio::spawn(self.run(rx));
        (AgentHandle { tx }, task)
    }
}

/// Client side of a spawned [`PageAgent`]. Every call resolves to the agent's answer, or the
/// "nothing happened" value if the agent is gone.
#[derive(Debug, Clone)]
pub struct AgentHandle {
    tx: mpsc::Sender<PageEvent>,
}

impl AgentHandle {
    pub async fn send_message(&self, message: Value) -> Option<Value> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(PageEvent::Message { message, reply })
            .await
            .ok()?;
        rx.await.ok().flatten()
    }

    pub async fn click(&self, event: ClickEvent) -> Disposition {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(PageEvent::Click { event, reply }).await.is_err() {
            return Disposition::PassThrough;
        }
        rx.await.unwrap_or(Disposition::PassThrough)
    }

    pub async fn pointer_down(&self, within_edit_ui: bool) {
        let _ = self.tx.send(PageEvent::PointerDown { within_edit_ui }).await;
    }

    pub async fn key(&self, input: KeyInput) -> Disposition {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(PageEvent::Key { input, reply }).await.is_err() {
            return Disposition::PassThrough;
        }
        rx.await.unwrap_or(Disposition::PassThrough)
    }

    pub async fn set_draft(&self, text: impl Into<String>) {
        let _ = self.tx.send(PageEvent::Draft { text: text.into() }).await;
    }
}
