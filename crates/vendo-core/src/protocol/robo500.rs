use chrono::{DateTime, Utc};

use super::{Milestone, Protocol, ProtocolAction};
use crate::log::CommandRecord;

// ---------------------------------------------------------------------------
// Robo500
// ---------------------------------------------------------------------------

/// Step function for the Robo500 carousel's text protocol.
///
/// The conversation is a fixed ladder of short uppercase tokens:
///
/// ```text
/// -> RDS   (read door status)
/// <- DC    doors closed            -> RCS   (read calibration status)
/// <- DO    doors open              (ask the operator to shut them)
/// <- CC    calibration clear       -> FET   (fetch the bin)
/// <- CI    calibration needed      -> CAL
/// <- MC    motion complete         -> LON   (lock open)
/// <- DO    operator opened door    => DoorOpened milestone
/// <- DC    operator shut door      => DoorClosed milestone
/// ```
///
/// Inbound payloads are matched by substring containment, not equality —
/// the unit pads status words with chatter. When several rows could match
/// one payload, the row listed first wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct Robo500;

impl Robo500 {
    /// The latest received record strictly after `since`. Records sharing
    /// the greatest timestamp resolve to the first-appended one.
    fn answer_since(received: &[CommandRecord], since: DateTime<Utc>) -> Option<&CommandRecord> {
        let mut best: Option<&CommandRecord> = None;
        for record in received.iter().filter(|r| r.at > since) {
            if best.is_none_or(|b| record.at > b.at) {
                best = Some(record);
            }
        }
        best
    }
}

impl Protocol for Robo500 {
    fn name(&self) -> &'static str {
        "robo500"
    }

    fn start(&self) -> ProtocolAction {
        ProtocolAction::reply("RDS")
    }

    fn on_response(&self, sent: &[CommandRecord], received: &[CommandRecord]) -> ProtocolAction {
        let Some(last_sent) = sent.last() else {
            return ProtocolAction::wait();
        };
        let Some(answer) = Self::answer_since(received, last_sent.at) else {
            return ProtocolAction::wait();
        };

        match last_sent.text.as_str() {
            "RDS" => {
                if answer.text.contains("DC") {
                    // Doors closed: move on to calibration checks
                    return ProtocolAction::reply("RCS");
                }
                if answer.text.contains("DO") {
                    // Doors open before we started: the operator has to shut
                    // them before the unit will do anything
                    return ProtocolAction::wait()
                        .with_hint("Close the station doors to continue.");
                }
            }
            "RCS" => {
                if answer.text.contains("CC") {
                    return ProtocolAction::reply("FET");
                }
                if answer.text.contains("CI") {
                    return ProtocolAction::reply("CAL");
                }
            }
            "FET" => {
                if answer.text.contains("MC") {
                    return ProtocolAction::reply("LON");
                }
            }
            "LON" => {
                if answer.text.contains("DO") {
                    return ProtocolAction::milestone(Milestone::DoorOpened);
                }
                if answer.text.contains("DC") {
                    return ProtocolAction::milestone(Milestone::DoorClosed);
                }
            }
            _ => {}
        }
        ProtocolAction::wait()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::CommandLog;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    /// One sent command at t=10 and one received answer at t=20.
    fn exchange(sent: &str, received: &str) -> CommandLog {
        let mut log = CommandLog::new();
        log.record_sent_at(sent, at(10));
        log.record_received_at(received, at(20));
        log
    }

    fn step(log: &CommandLog) -> ProtocolAction {
        Robo500.on_response(log.sent(), log.received())
    }

    #[test]
    fn starts_with_door_status_request() {
        assert_eq!(Robo500.start(), ProtocolAction::reply("RDS"));
    }

    #[test]
    fn doors_closed_leads_to_calibration_check() {
        let log = exchange("RDS", "DC");
        assert_eq!(step(&log).reply.as_deref(), Some("RCS"));
    }

    #[test]
    fn doors_open_asks_operator_and_waits() {
        let log = exchange("RDS", "DO");
        let action = step(&log);
        assert!(!action.should_reply());
        assert!(action.milestone.is_none());
        assert!(action.user_hint.is_some());
    }

    #[test]
    fn calibration_clear_fetches() {
        let log = exchange("RCS", "CC");
        assert_eq!(step(&log).reply.as_deref(), Some("FET"));
    }

    #[test]
    fn calibration_needed_calibrates() {
        let log = exchange("RCS", "CI");
        assert_eq!(step(&log).reply.as_deref(), Some("CAL"));
    }

    #[test]
    fn motion_complete_unlocks() {
        let log = exchange("FET", "MC");
        assert_eq!(step(&log).reply.as_deref(), Some("LON"));
    }

    #[test]
    fn door_opened_after_unlock_is_the_vend_milestone() {
        let log = exchange("LON", "DO");
        let action = step(&log);
        assert!(!action.should_reply());
        assert_eq!(action.milestone, Some(Milestone::DoorOpened));
    }

    #[test]
    fn door_closed_after_unlock_is_the_stocking_milestone() {
        let log = exchange("LON", "DC");
        assert_eq!(step(&log).milestone, Some(Milestone::DoorClosed));
    }

    #[test]
    fn matching_is_substring_containment() {
        // Real units pad status words with chatter
        let log = exchange("RDS", "l23423 DC m234");
        assert_eq!(step(&log).reply.as_deref(), Some("RCS"));
    }

    #[test]
    fn listed_order_wins_when_both_substrings_match() {
        // A payload containing both DC and DO takes the DC row on RDS...
        let log = exchange("RDS", "DC DO");
        assert_eq!(step(&log).reply.as_deref(), Some("RCS"));

        // ...and the DO row on LON
        let log = exchange("LON", "DO DC");
        assert_eq!(step(&log).milestone, Some(Milestone::DoorOpened));
    }

    #[test]
    fn stale_receipts_never_match() {
        let mut log = CommandLog::new();
        log.record_received_at("DC", at(5));
        log.record_sent_at("RDS", at(10));
        assert_eq!(step(&log), ProtocolAction::wait());

        // A receipt stamped exactly at the send instant is stale too
        log.record_received_at("DC", at(10));
        assert_eq!(step(&log), ProtocolAction::wait());
    }

    #[test]
    fn latest_qualifying_receipt_decides() {
        let mut log = CommandLog::new();
        log.record_sent_at("RCS", at(10));
        log.record_received_at("CI", at(20));
        log.record_received_at("CC", at(30));
        assert_eq!(step(&log).reply.as_deref(), Some("FET"));
    }

    #[test]
    fn timestamp_ties_keep_the_first_appended() {
        let mut log = CommandLog::new();
        log.record_sent_at("RCS", at(10));
        log.record_received_at("CC", at(20));
        log.record_received_at("CI", at(20));
        assert_eq!(step(&log).reply.as_deref(), Some("FET"));
    }

    #[test]
    fn no_history_waits() {
        let log = CommandLog::new();
        assert_eq!(step(&log), ProtocolAction::wait());
    }

    #[test]
    fn unanswered_command_waits() {
        let mut log = CommandLog::new();
        log.record_sent_at("FET", at(10));
        assert_eq!(step(&log), ProtocolAction::wait());
    }

    #[test]
    fn kick_reissues_the_unanswered_command() {
        let mut log = CommandLog::new();
        log.record_sent_at("RCS", at(10));
        let action = Robo500.kick(log.sent(), log.received());
        assert_eq!(action.reply.as_deref(), Some("RCS"));
    }

    #[test]
    fn kick_with_no_history_opens_the_conversation() {
        let log = CommandLog::new();
        let action = Robo500.kick(log.sent(), log.received());
        assert_eq!(action.reply.as_deref(), Some("RDS"));
    }

    #[test]
    fn full_vend_ladder() {
        let mut log = CommandLog::new();

        log.record_sent_at("RDS", at(10));
        log.record_received_at("DC", at(20));
        assert_eq!(step(&log).reply.as_deref(), Some("RCS"));

        log.record_sent_at("RCS", at(30));
        log.record_received_at("CC", at(40));
        assert_eq!(step(&log).reply.as_deref(), Some("FET"));

        log.record_sent_at("FET", at(50));
        log.record_received_at("MC", at(60));
        assert_eq!(step(&log).reply.as_deref(), Some("LON"));

        log.record_sent_at("LON", at(70));
        log.record_received_at("DO", at(80));
        let action = step(&log);
        assert_eq!(action.milestone, Some(Milestone::DoorOpened));
        assert!(!action.should_reply());
    }
}
