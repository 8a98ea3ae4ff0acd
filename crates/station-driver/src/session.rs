use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

use vendo_core::{BinRequest, CommandLog, Milestone, Protocol, ProtocolAction};

use crate::comms::Comms;
use crate::events::{SessionEvent, SessionHandle};
use crate::supervisor::{Watchdog, DEFAULT_MAX_KICKS, STRUCTURED_INTERVAL};

// ─── VendingMachine ───────────────────────────────────────────────────────

/// One station's device, ready to run a single conversation.
///
/// Dispatching a batch consumes the machine: a session never outlives its
/// conversation, and the returned [`SessionHandle`] is the only way to
/// observe it. Every variant emits `Success`/`Failure` reports followed by
/// exactly one `Complete`.
pub trait VendingMachine: Send {
    fn name(&self) -> &str;

    /// Vend the bins' contents out of the machine.
    fn vend_items(self: Box<Self>, bins: Vec<BinRequest>) -> SessionHandle;

    /// Put stock into the machine (returns, stocking, physical stock-in).
    fn stock_items(self: Box<Self>, bins: Vec<BinRequest>) -> SessionHandle;
}

// ─── StructuredMachine ────────────────────────────────────────────────────

/// A machine driven by a command/response protocol over a transport.
///
/// The whole conversation runs on one actor task: inbound payloads and
/// watchdog expiry are arms of a single select loop, so log appends, kick
/// counting, and step-function evaluation are serialized by construction.
/// A vend conversation succeeds on [`Milestone::DoorOpened`]; a stocking
/// conversation on [`Milestone::DoorClosed`] (the operator loads the bins
/// and shuts the doors).
pub struct StructuredMachine {
    name: String,
    comms: Box<dyn Comms>,
    protocol: Box<dyn Protocol>,
    interval: Duration,
    max_kicks: u32,
}

impl StructuredMachine {
    pub fn new(
        name: impl Into<String>,
        comms: Box<dyn Comms>,
        protocol: Box<dyn Protocol>,
    ) -> Self {
        Self {
            name: name.into(),
            comms,
            protocol,
            interval: STRUCTURED_INTERVAL,
            max_kicks: DEFAULT_MAX_KICKS,
        }
    }

    pub fn with_watchdog(mut self, interval: Duration, max_kicks: u32) -> Self {
        self.interval = interval;
        self.max_kicks = max_kicks;
        self
    }

    fn dispatch(self: Box<Self>, bins: Vec<BinRequest>, target: Milestone) -> SessionHandle {
        let (events, handle) = SessionHandle::channel(32);
        let session_id = Uuid::new_v4();
        let span = tracing::info_span!("session", machine = %self.name, %session_id);
        tokio::spawn(run_conversation(*self, bins, target, events).instrument(span));
        handle
    }
}

impl VendingMachine for StructuredMachine {
    fn name(&self) -> &str {
        &self.name
    }

    fn vend_items(self: Box<Self>, bins: Vec<BinRequest>) -> SessionHandle {
        self.dispatch(bins, Milestone::DoorOpened)
    }

    fn stock_items(self: Box<Self>, bins: Vec<BinRequest>) -> SessionHandle {
        self.dispatch(bins, Milestone::DoorClosed)
    }
}

/// Per-conversation state owned by the actor task.
struct Conversation {
    name: String,
    comms: Box<dyn Comms>,
    protocol: Box<dyn Protocol>,
    log: CommandLog,
    watchdog: Watchdog,
    target: Milestone,
    bin_ids: Vec<i64>,
    events: mpsc::Sender<SessionEvent>,
}

impl Conversation {
    /// Act on one step-function result. Returns true when the conversation
    /// has reached a terminal outcome.
    async fn apply(&mut self, action: ProtocolAction) -> bool {
        if let Some(hint) = action.user_hint {
            let _ = self.events.send(SessionEvent::UserHint(hint)).await;
        }
        if let Some(reply) = action.reply {
            self.log.record_sent(&reply);
            self.watchdog.rearm();
            tracing::debug!(command = %reply, "send");
            if let Err(e) = self.comms.send(&reply).await {
                self.fail(format!("{} could not transmit: {e}", self.name))
                    .await;
                return true;
            }
        }
        if let Some(milestone) = action.milestone {
            if milestone == self.target {
                tracing::info!(%milestone, "conversation reached its goal");
                let _ = self
                    .events
                    .send(SessionEvent::Success {
                        bin_ids: self.bin_ids.clone(),
                    })
                    .await;
                return true;
            }
            tracing::debug!(%milestone, "milestone outside this conversation's goal");
        }
        false
    }

    async fn fail(&mut self, reason: String) {
        tracing::warn!(%reason, "session failed");
        let _ = self
            .events
            .send(SessionEvent::Failure {
                bin_ids: self.bin_ids.clone(),
                reason,
            })
            .await;
    }
}

async fn run_conversation(
    machine: StructuredMachine,
    bins: Vec<BinRequest>,
    target: Milestone,
    events: mpsc::Sender<SessionEvent>,
) {
    let StructuredMachine {
        name,
        mut comms,
        protocol,
        interval,
        max_kicks,
    } = machine;
    let bin_ids: Vec<i64> = bins.iter().map(|b| b.id).collect();

    let mut inbound = match comms.open().await {
        Ok(rx) => rx,
        Err(e) => {
            let _ = events
                .send(SessionEvent::Failure {
                    bin_ids,
                    reason: format!("{name} could not open comms: {e}"),
                })
                .await;
            let _ = events.send(SessionEvent::Complete).await;
            return;
        }
    };

    let mut convo = Conversation {
        name,
        comms,
        protocol,
        log: CommandLog::new(),
        watchdog: Watchdog::new(interval, max_kicks),
        target,
        bin_ids,
        events,
    };

    let opening = convo.protocol.start();
    let mut done = convo.apply(opening).await;

    while !done {
        tokio::select! {
            line = inbound.recv() => match line {
                Some(text) => {
                    tracing::debug!(payload = %text, "recv");
                    convo.log.record_received(&text);
                    convo.watchdog.rearm();
                    let action = convo.protocol.on_response(convo.log.sent(), convo.log.received());
                    done = convo.apply(action).await;
                }
                None => {
                    // Nothing more can ever arrive
                    convo.fail(format!("{} comms link dropped", convo.name)).await;
                    done = true;
                }
            },
            _ = tokio::time::sleep_until(convo.watchdog.deadline()) => {
                convo.watchdog.note_expiry();
                let action = convo.protocol.kick(convo.log.sent(), convo.log.received());
                done = convo.apply(action).await;
                // A kick that transmitted has rearmed and survives; a silent
                // kick runs the counter out.
                if !done && convo.watchdog.exhausted() {
                    convo.fail(format!("Vending machine {} timed out.", convo.name)).await;
                    done = true;
                }
            }
        }
    }

    // Teardown strictly precedes the completion signal: no orphaned link or
    // deadline survives a finished session.
    convo.comms.close().await;
    let _ = convo.events.send(SessionEvent::Complete).await;
}

// ─── Trivial variants ─────────────────────────────────────────────────────

fn finish_immediately(bins: Vec<BinRequest>, failure: Option<String>) -> SessionHandle {
    let (events, handle) = SessionHandle::channel(8);
    let bin_ids: Vec<i64> = bins.iter().map(|b| b.id).collect();
    tokio::spawn(async move {
        match failure {
            None => {
                let _ = events.send(SessionEvent::Success { bin_ids }).await;
            }
            Some(reason) => {
                let _ = events.send(SessionEvent::Failure { bin_ids, reason }).await;
            }
        }
        let _ = events.send(SessionEvent::Complete).await;
    });
    handle
}

/// Hardware that needs no conversation: every request succeeds on the spot.
pub struct ImmediateSuccessMachine {
    name: String,
}

impl ImmediateSuccessMachine {
    pub fn new() -> Self {
        Self {
            name: "TestSuccess".into(),
        }
    }
}

impl Default for ImmediateSuccessMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl VendingMachine for ImmediateSuccessMachine {
    fn name(&self) -> &str {
        &self.name
    }

    fn vend_items(self: Box<Self>, bins: Vec<BinRequest>) -> SessionHandle {
        finish_immediately(bins, None)
    }

    fn stock_items(self: Box<Self>, bins: Vec<BinRequest>) -> SessionHandle {
        finish_immediately(bins, None)
    }
}

/// Stand-in for a station nothing is configured for: every request fails
/// immediately with the standard reason.
pub struct UnconfiguredMachine {
    name: String,
}

pub(crate) const UNCONFIGURED_REASON: &str = "No vending machine was configured for these bins";

impl UnconfiguredMachine {
    pub fn new() -> Self {
        Self {
            name: "Unconfigured".into(),
        }
    }
}

impl Default for UnconfiguredMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl VendingMachine for UnconfiguredMachine {
    fn name(&self) -> &str {
        &self.name
    }

    fn vend_items(self: Box<Self>, bins: Vec<BinRequest>) -> SessionHandle {
        finish_immediately(bins, Some(UNCONFIGURED_REASON.to_string()))
    }

    fn stock_items(self: Box<Self>, bins: Vec<BinRequest>) -> SessionHandle {
        finish_immediately(bins, Some(UNCONFIGURED_REASON.to_string()))
    }
}

/// A machine that accepts requests and never acts on them; the watchdog is
/// the only thing that resolves its sessions.
pub struct TimeoutOnlyMachine {
    name: String,
    interval: Duration,
}

impl TimeoutOnlyMachine {
    pub fn new() -> Self {
        Self {
            name: "TestTimeout".into(),
            interval: Duration::from_secs(1),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    fn dispatch(self: Box<Self>, bins: Vec<BinRequest>) -> SessionHandle {
        let (events, handle) = SessionHandle::channel(8);
        let bin_ids: Vec<i64> = bins.iter().map(|b| b.id).collect();
        let Self { name, interval } = *self;
        tokio::spawn(async move {
            let mut watchdog = Watchdog::new(interval, DEFAULT_MAX_KICKS);
            loop {
                tokio::time::sleep_until(watchdog.deadline()).await;
                watchdog.note_expiry();
                // This machine's kick has nothing to say
                if watchdog.exhausted() {
                    break;
                }
            }
            let _ = events
                .send(SessionEvent::Failure {
                    bin_ids,
                    reason: format!("Vending machine {name} timed out."),
                })
                .await;
            let _ = events.send(SessionEvent::Complete).await;
        });
        handle
    }
}

impl Default for TimeoutOnlyMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl VendingMachine for TimeoutOnlyMachine {
    fn name(&self) -> &str {
        &self.name
    }

    fn vend_items(self: Box<Self>, bins: Vec<BinRequest>) -> SessionHandle {
        self.dispatch(bins)
    }

    fn stock_items(self: Box<Self>, bins: Vec<BinRequest>) -> SessionHandle {
        self.dispatch(bins)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{ScriptedRoboComms, SilentComms};
    use vendo_core::Robo500;

    fn robo_bins() -> Vec<BinRequest> {
        vec![
            BinRequest::new(1, 1, "robo", "testrobo"),
            BinRequest::new(2, 1, "robo", "testrobo"),
        ]
    }

    async fn collect_events(mut handle: SessionHandle) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Some(event) = handle.next_event().await {
            let done = event == SessionEvent::Complete;
            events.push(event);
            if done {
                break;
            }
        }
        events
    }

    #[tokio::test]
    async fn scripted_vend_succeeds() {
        let machine = Box::new(StructuredMachine::new(
            "Robo500",
            Box::new(ScriptedRoboComms::new()),
            Box::new(Robo500),
        ));
        let events = collect_events(machine.vend_items(robo_bins())).await;

        assert_eq!(
            events,
            vec![
                SessionEvent::Success { bin_ids: vec![1, 2] },
                SessionEvent::Complete,
            ]
        );
    }

    #[tokio::test]
    async fn scripted_stocking_succeeds_on_door_close() {
        let machine = Box::new(StructuredMachine::new(
            "Robo500",
            Box::new(ScriptedRoboComms::new()),
            Box::new(Robo500),
        ));
        let events = collect_events(machine.stock_items(robo_bins())).await;

        assert_eq!(
            events,
            vec![
                SessionEvent::Success { bin_ids: vec![1, 2] },
                SessionEvent::Complete,
            ]
        );
    }

    /// Protocol that opens the conversation but has nothing to say on a
    /// kick, so a silent device runs the watchdog out.
    struct MuteAfterStart;

    impl Protocol for MuteAfterStart {
        fn name(&self) -> &'static str {
            "mute"
        }

        fn start(&self) -> ProtocolAction {
            ProtocolAction::reply("HELLO")
        }

        fn on_response(
            &self,
            _sent: &[vendo_core::CommandRecord],
            _received: &[vendo_core::CommandRecord],
        ) -> ProtocolAction {
            ProtocolAction::wait()
        }

        fn kick(
            &self,
            _sent: &[vendo_core::CommandRecord],
            _received: &[vendo_core::CommandRecord],
        ) -> ProtocolAction {
            ProtocolAction::wait()
        }
    }

    #[tokio::test]
    async fn silent_device_fails_pending_bins_exactly_once() {
        let machine = Box::new(
            StructuredMachine::new("Mute", Box::new(SilentComms::new()), Box::new(MuteAfterStart))
                .with_watchdog(Duration::from_millis(50), 1),
        );
        let events = collect_events(machine.vend_items(robo_bins())).await;

        assert_eq!(events.len(), 2);
        match &events[0] {
            SessionEvent::Failure { bin_ids, reason } => {
                assert_eq!(bin_ids, &vec![1, 2]);
                assert!(reason.contains("timed out"));
            }
            other => panic!("expected Failure, got {other:?}"),
        }
        assert_eq!(events[1], SessionEvent::Complete);
    }

    #[tokio::test]
    async fn open_failure_fails_the_bins() {
        let machine = Box::new(StructuredMachine::new(
            "Robo500",
            Box::new(crate::serial::SerialComms::new("COM3", true)),
            Box::new(Robo500),
        ));
        let events = collect_events(machine.vend_items(robo_bins())).await;

        assert!(matches!(events[0], SessionEvent::Failure { .. }));
        assert_eq!(events[1], SessionEvent::Complete);
    }

    #[tokio::test]
    async fn immediate_success_machine() {
        let machine = Box::new(ImmediateSuccessMachine::new());
        let events = collect_events(machine.vend_items(robo_bins())).await;
        assert_eq!(
            events,
            vec![
                SessionEvent::Success { bin_ids: vec![1, 2] },
                SessionEvent::Complete,
            ]
        );
    }

    #[tokio::test]
    async fn unconfigured_machine_fails_with_standard_reason() {
        let machine = Box::new(UnconfiguredMachine::new());
        let events = collect_events(machine.vend_items(robo_bins())).await;
        assert_eq!(
            events,
            vec![
                SessionEvent::Failure {
                    bin_ids: vec![1, 2],
                    reason: UNCONFIGURED_REASON.to_string(),
                },
                SessionEvent::Complete,
            ]
        );
    }

    #[tokio::test]
    async fn timeout_only_machine_resolves_via_watchdog() {
        let machine =
            Box::new(TimeoutOnlyMachine::new().with_interval(Duration::from_millis(50)));
        let events = collect_events(machine.vend_items(robo_bins())).await;

        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], SessionEvent::Failure { .. }));
        assert_eq!(events[1], SessionEvent::Complete);
    }
}
