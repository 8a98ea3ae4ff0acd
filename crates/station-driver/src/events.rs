use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

// ─── SessionEvent ─────────────────────────────────────────────────────────

/// Typed outcome events a device session emits to whoever dispatched it.
///
/// Events carry bin ids rather than bin references: the orchestrator owns
/// the batch and settles its own copies, so an outcome report is consumed
/// exactly once by exactly one consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// These bins were vended/stocked successfully.
    Success { bin_ids: Vec<i64> },
    /// These bins failed, with an operator-readable reason.
    Failure { bin_ids: Vec<i64>, reason: String },
    /// Instruction for the operator (e.g. "close the doors").
    UserHint(String),
    /// Terminal: the session has torn down its transport and watchdog.
    /// Emitted exactly once, always last.
    Complete,
}

// ─── SessionHandle ────────────────────────────────────────────────────────

/// An async stream of [`SessionEvent`]s from one device session.
///
/// Backed by a Tokio mpsc channel. A background task owns the transport,
/// command log, and watchdog, and sends events until `Complete`. Dropping
/// the handle closes the receiver; the session notices on its next send and
/// proceeds straight to teardown.
pub struct SessionHandle {
    rx: mpsc::Receiver<SessionEvent>,
}

impl SessionHandle {
    /// Create the event channel, returning the session side and the handle.
    pub(crate) fn channel(buffer: usize) -> (mpsc::Sender<SessionEvent>, SessionHandle) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, SessionHandle { rx })
    }

    /// Test-only constructor: wrap a raw receiver as a `SessionHandle`.
    #[cfg(test)]
    pub(crate) fn from_channel(rx: mpsc::Receiver<SessionEvent>) -> Self {
        Self { rx }
    }

    /// Receive the next event, or `None` once the session is gone.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }
}

impl Stream for SessionHandle {
    type Item = SessionEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
