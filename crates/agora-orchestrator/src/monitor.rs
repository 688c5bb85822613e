use crate::types::{AgentStatus, TaskId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Counters tracked per agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub tasks_completed: u32,
    pub tasks_failed: u32,
    pub rejected_assignments: u32,
    pub messages_received: u32,
    pub busy_ms: u64,
}

impl AgentMetrics {
    pub fn record_completion(&mut self, elapsed: Duration) {
        self.tasks_completed += 1;
        self.busy_ms += elapsed.as_millis() as u64;
    }

    pub fn record_failure(&mut self, elapsed: Duration) {
        self.tasks_failed += 1;
        self.busy_ms += elapsed.as_millis() as u64;
    }

    pub fn record_rejection(&mut self) {
        self.rejected_assignments += 1;
    }

    pub fn record_message(&mut self) {
        self.messages_received += 1;
    }

    fn absorb(&mut self, other: &AgentMetrics) {
        self.tasks_completed += other.tasks_completed;
        self.tasks_failed += other.tasks_failed;
        self.rejected_assignments += other.rejected_assignments;
        self.messages_received += other.messages_received;
        self.busy_ms += other.busy_ms;
    }
}

/// Point-in-time view of one agent, for monitoring and reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: String,
    pub role: String,
    pub status: AgentStatus,
    pub completed_count: usize,
    pub current_task_id: Option<TaskId>,
    /// Description of the in-flight task, if any.
    pub current_task: Option<String>,
    pub metrics: AgentMetrics,
}

/// Sum metrics across agents.
pub fn aggregate_metrics(snapshots: &[AgentSnapshot]) -> AgentMetrics {
    let mut total = AgentMetrics::default();
    for snapshot in snapshots {
        total.absorb(&snapshot.metrics);
    }
    total
}

/// Serialize agent state plus aggregate metrics as JSON.
pub fn to_json(snapshots: &[AgentSnapshot]) -> serde_json::Value {
    serde_json::json!({
        "agents": snapshots,
        "aggregate": aggregate_metrics(snapshots),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn snapshot(id: &str, metrics: AgentMetrics) -> AgentSnapshot {
        AgentSnapshot {
            id: id.to_string(),
            role: "tester".to_string(),
            status: AgentStatus::Idle,
            completed_count: metrics.tasks_completed as usize,
            current_task_id: None,
            current_task: None,
            metrics,
        }
    }

    #[test]
    fn test_record_metrics() {
        let mut metrics = AgentMetrics::default();
        metrics.record_completion(Duration::from_millis(120));
        metrics.record_completion(Duration::from_millis(80));
        metrics.record_failure(Duration::from_millis(5));
        metrics.record_rejection();
        metrics.record_message();

        assert_eq!(metrics.tasks_completed, 2);
        assert_eq!(metrics.tasks_failed, 1);
        assert_eq!(metrics.rejected_assignments, 1);
        assert_eq!(metrics.messages_received, 1);
        assert_eq!(metrics.busy_ms, 205);
    }

    #[test]
    fn test_aggregate_metrics() {
        let mut a = AgentMetrics::default();
        a.record_completion(Duration::from_millis(10));
        let mut b = AgentMetrics::default();
        b.record_completion(Duration::from_millis(20));
        b.record_rejection();

        let agg = aggregate_metrics(&[snapshot("a", a), snapshot("b", b)]);
        assert_eq!(agg.tasks_completed, 2);
        assert_eq!(agg.rejected_assignments, 1);
        assert_eq!(agg.busy_ms, 30);
    }

    #[test]
    fn test_to_json() {
        let json = to_json(&[snapshot("a", AgentMetrics::default())]);
        assert!(json["agents"].is_array());
        assert!(json["aggregate"].is_object());
        assert_eq!(json["agents"][0]["status"], "idle");
    }
}
