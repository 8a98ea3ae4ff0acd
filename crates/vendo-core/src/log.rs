use chrono::{DateTime, Utc};

// ---------------------------------------------------------------------------
// CommandRecord / CommandLog
// ---------------------------------------------------------------------------

/// One command payload plus the instant it crossed the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRecord {
    pub text: String,
    pub at: DateTime<Utc>,
}

/// Append-only history of one device conversation: everything sent to the
/// machine and everything received from it, each sequence in timestamp order.
///
/// Owned exclusively by one session and discarded with it. Protocol step
/// functions read the two sequences and never mutate them.
#[derive(Debug, Default)]
pub struct CommandLog {
    sent: Vec<CommandRecord>,
    received: Vec<CommandRecord>,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sent(&mut self, text: impl Into<String>) {
        self.record_sent_at(text, Utc::now());
    }

    pub fn record_received(&mut self, text: impl Into<String>) {
        self.record_received_at(text, Utc::now());
    }

    /// Append with an explicit instant (replays and tests).
    pub fn record_sent_at(&mut self, text: impl Into<String>, at: DateTime<Utc>) {
        Self::append(&mut self.sent, text.into(), at);
    }

    /// Append with an explicit instant (replays and tests).
    pub fn record_received_at(&mut self, text: impl Into<String>, at: DateTime<Utc>) {
        Self::append(&mut self.received, text.into(), at);
    }

    pub fn sent(&self) -> &[CommandRecord] {
        &self.sent
    }

    pub fn received(&self) -> &[CommandRecord] {
        &self.received
    }

    pub fn last_sent(&self) -> Option<&CommandRecord> {
        self.sent.last()
    }

    fn append(seq: &mut Vec<CommandRecord>, text: String, at: DateTime<Utc>) {
        // Each sequence stays timestamp-monotonic even if the wall clock
        // steps backwards between appends.
        let at = match seq.last() {
            Some(prev) if prev.at > at => prev.at,
            _ => at,
        };
        seq.push(CommandRecord { text, at });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn sequences_are_independent() {
        let mut log = CommandLog::new();
        log.record_sent("RDS");
        log.record_received("DC");
        log.record_sent("RCS");

        assert_eq!(log.sent().len(), 2);
        assert_eq!(log.received().len(), 1);
        assert_eq!(log.last_sent().unwrap().text, "RCS");
    }

    #[test]
    fn appends_preserve_order() {
        let mut log = CommandLog::new();
        log.record_received_at("first", at(10));
        log.record_received_at("second", at(20));

        let texts: Vec<_> = log.received().iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn clock_stepping_backwards_is_clamped() {
        let mut log = CommandLog::new();
        log.record_sent_at("RDS", at(100));
        log.record_sent_at("RCS", at(50));

        assert_eq!(log.sent()[1].at, at(100));
        assert!(log.sent()[0].at <= log.sent()[1].at);
    }

    #[test]
    fn empty_log_has_no_last_sent() {
        let log = CommandLog::new();
        assert!(log.last_sent().is_none());
    }
}
