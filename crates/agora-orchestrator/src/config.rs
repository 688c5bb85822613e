use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for a [`CommunicationHub`](crate::CommunicationHub).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Maximum activity entries kept in memory.
    #[serde(default = "default_activity_capacity")]
    pub activity_capacity: usize,
    /// Buffer of the task event stream before slow receivers lag.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    #[serde(default)]
    pub report: ReportLimits,
}

fn default_activity_capacity() -> usize {
    1000
}

fn default_event_capacity() -> usize {
    256
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            activity_capacity: default_activity_capacity(),
            event_capacity: default_event_capacity(),
            report: ReportLimits::default(),
        }
    }
}

/// How much history a collaboration report includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLimits {
    #[serde(default = "default_report_messages")]
    pub messages: usize,
    #[serde(default = "default_report_log_lines")]
    pub log_lines: usize,
}

fn default_report_messages() -> usize {
    10
}

fn default_report_log_lines() -> usize {
    20
}

impl Default for ReportLimits {
    fn default() -> Self {
        Self {
            messages: default_report_messages(),
            log_lines: default_report_log_lines(),
        }
    }
}

/// Settings for an [`Orchestrator`](crate::Orchestrator) run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Upper bound on waiting for the whole task graph.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

impl OrchestratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Pacing of the simulated specialists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Simulated work time per task, in milliseconds.
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
}

fn default_step_delay_ms() -> u64 {
    150
}

impl SimulationConfig {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    /// No simulated delay; used by tests.
    pub fn instant() -> Self {
        Self { step_delay_ms: 0 }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            step_delay_ms: default_step_delay_ms(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let hub: HubConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(hub.activity_capacity, 1000);
        assert_eq!(hub.event_capacity, 256);
        assert_eq!(hub.report, ReportLimits::default());

        let orch: OrchestratorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(orch.timeout(), Duration::from_secs(60));

        let sim: SimulationConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(sim.step_delay(), Duration::from_millis(150));
    }

    #[test]
    fn test_partial_report_limits() {
        let hub: HubConfig = serde_json::from_str(r#"{"report": {"messages": 3}}"#).unwrap();
        assert_eq!(hub.report.messages, 3);
        assert_eq!(hub.report.log_lines, 20);
    }
}
