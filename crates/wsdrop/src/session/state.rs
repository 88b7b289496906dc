//! Session lifecycle: Connected -> Closing -> Closed.

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Writes are accepted.
    Connected,
    /// First error or close request seen. Writes are refused.
    Closing,
    /// Terminal.
    Closed,
}

/// Shared, watchable state cell. Transitions only move forward.
#[derive(Debug, Clone)]
pub(crate) struct StateCell(Arc<watch::Sender<SessionState>>);

impl StateCell {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(SessionState::Connected);
        Self(Arc::new(tx))
    }

    pub(crate) fn current(&self) -> SessionState {
        *self.0.borrow()
    }

    /// Connected -> Closing. Returns true if this call made the transition.
    pub(crate) fn begin_closing(&self) -> bool {
        self.0.send_if_modified(|state| {
            if *state == SessionState::Connected {
                *state = SessionState::Closing;
                true
            } else {
                false
            }
        })
    }

    pub(crate) fn mark_closed(&self) {
        self.0.send_if_modified(|state| {
            let changed = *state != SessionState::Closed;
            *state = SessionState::Closed;
            changed
        });
    }

    /// Resolves once the state leaves Connected.
    pub(crate) async fn leaving_connected(&self) {
        self.wait_until(|s| s != SessionState::Connected).await;
    }

    pub(crate) async fn closed(&self) {
        self.wait_until(|s| s == SessionState::Closed).await;
    }

    async fn wait_until(&self, done: impl Fn(SessionState) -> bool) {
        let mut rx = self.0.subscribe();
        loop {
            if done(*rx.borrow_and_update()) {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}
