//! Protocol step functions: pure decision logic that maps a conversation's
//! command history to the next action. One implementation per device
//! protocol; sessions own the transport and the clock, step functions own
//! nothing.

mod robo500;

pub use robo500::Robo500;

use crate::log::CommandRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Milestone
// ---------------------------------------------------------------------------

/// A protocol-specific named event that terminates a conversation. Which
/// milestone counts as success depends on the conversation: a vend finishes
/// when the operator opens the doors, a stocking run when they close them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    DoorOpened,
    DoorClosed,
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Milestone::DoorOpened => f.write_str("door_opened"),
            Milestone::DoorClosed => f.write_str("door_closed"),
        }
    }
}

// ---------------------------------------------------------------------------
// ProtocolAction
// ---------------------------------------------------------------------------

/// The result of one step-function evaluation. Transient: produced, acted
/// on by the session, and dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtocolAction {
    /// Text to transmit now, if any.
    pub reply: Option<String>,
    /// Milestone reached by the latest exchange, if any.
    pub milestone: Option<Milestone>,
    /// Instruction to surface to the operator (e.g. "close the doors").
    pub user_hint: Option<String>,
}

impl ProtocolAction {
    /// No reply, no milestone: wait for more input or a watchdog kick.
    pub fn wait() -> Self {
        Self::default()
    }

    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            reply: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn milestone(milestone: Milestone) -> Self {
        Self {
            milestone: Some(milestone),
            ..Self::default()
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.user_hint = Some(hint.into());
        self
    }

    pub fn should_reply(&self) -> bool {
        self.reply.is_some()
    }
}

// ---------------------------------------------------------------------------
// Protocol
// ---------------------------------------------------------------------------

/// A device conversation's decision function.
///
/// Implementations must be pure: state is derived from the sent/received
/// history on every call, never stored. That keeps every variant
/// unit-testable without a transport and lets a kick replay the same
/// decision after a silence.
pub trait Protocol: Send + Sync {
    fn name(&self) -> &'static str;

    /// The opening action of a conversation, before any history exists.
    fn start(&self) -> ProtocolAction;

    /// Decide the next action from the full history. Only received records
    /// strictly newer than the last send may influence the decision.
    fn on_response(&self, sent: &[CommandRecord], received: &[CommandRecord]) -> ProtocolAction;

    /// Last-chance nudge after a silence: re-issue the command the device
    /// failed to answer, or the opener if nothing was ever sent.
    fn kick(&self, sent: &[CommandRecord], _received: &[CommandRecord]) -> ProtocolAction {
        match sent.last() {
            Some(cmd) => ProtocolAction::reply(cmd.text.clone()),
            None => self.start(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
