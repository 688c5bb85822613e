use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::{info, warn};

/// A single hub event kept for the collaboration report.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub agent_id: Option<String>,
    pub details: String,
    pub outcome: ActivityOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityOutcome {
    Success,
    Rejected,
    Error,
}

impl ActivityEntry {
    /// One-line rendering used in reports.
    pub fn line(&self) -> String {
        let agent = self.agent_id.as_deref().unwrap_or("hub");
        format!(
            "[{}] {} ({}): {}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.action,
            agent,
            self.details
        )
    }
}

/// Bounded, append-only activity log of hub events.
///
/// Entries are mirrored to `tracing`. Once `capacity` is reached the oldest
/// entry is dropped.
pub struct ActivityLog {
    entries: Mutex<VecDeque<ActivityEntry>>,
    capacity: usize,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
        }
    }

    pub fn log(&self, entry: ActivityEntry) {
        match entry.outcome {
            ActivityOutcome::Success => info!(
                action = %entry.action,
                agent_id = ?entry.agent_id,
                details = %entry.details,
                "activity"
            ),
            ActivityOutcome::Rejected | ActivityOutcome::Error => warn!(
                action = %entry.action,
                agent_id = ?entry.agent_id,
                details = %entry.details,
                outcome = ?entry.outcome,
                "activity"
            ),
        }
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn log_action(
        &self,
        action: impl Into<String>,
        agent_id: Option<&str>,
        details: impl Into<String>,
        outcome: ActivityOutcome,
    ) {
        self.log(ActivityEntry {
            timestamp: Utc::now(),
            action: action.into(),
            agent_id: agent_id.map(str::to_string),
            details: details.into(),
            outcome,
        });
    }

    /// The last `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<ActivityEntry> {
        let entries = self.entries.lock();
        let start = entries.len().saturating_sub(n);
        entries.iter().skip(start).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_capacity() {
        let log = ActivityLog::new(3);
        for i in 0..5 {
            log.log_action("tick", None, format!("#{i}"), ActivityOutcome::Success);
        }
        assert_eq!(log.len(), 3);
        let recent = log.recent(10);
        assert_eq!(recent[0].details, "#2");
        assert_eq!(recent[2].details, "#4");
    }

    #[test]
    fn test_recent_subset() {
        let log = ActivityLog::new(100);
        log.log_action("join", Some("a1"), "Security Auditor joined", ActivityOutcome::Success);
        log.log_action("reject", Some("a1"), "busy", ActivityOutcome::Rejected);
        let recent = log.recent(1);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].outcome, ActivityOutcome::Rejected);
    }

    #[test]
    fn test_line_format() {
        let log = ActivityLog::new(10);
        log.log_action("join", Some("a1"), "joined", ActivityOutcome::Success);
        let line = log.recent(1)[0].line();
        assert!(line.contains("join (a1): joined"));
    }
}
