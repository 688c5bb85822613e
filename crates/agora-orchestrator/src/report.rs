use crate::knowledge::KnowledgeEntry;
use crate::monitor::{aggregate_metrics, AgentSnapshot};
use agora_core::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Aggregate counts at the top of a report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_agents: usize,
    pub total_messages: usize,
    pub total_tasks: usize,
    pub pending_tasks: usize,
    pub in_progress_tasks: usize,
    pub completed_tasks: usize,
    pub blocked_tasks: usize,
}

/// Point-in-time summary of a hub's collaboration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaborationReport {
    pub generated_at: DateTime<Utc>,
    pub summary: ReportSummary,
    pub agents: Vec<AgentSnapshot>,
    pub recent_messages: Vec<Message>,
    pub shared_knowledge: Vec<KnowledgeEntry>,
    pub recent_activity: Vec<String>,
}

impl CollaborationReport {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    /// Human-readable rendering for terminals.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let s = &self.summary;
        let _ = writeln!(out, "Collaboration report ({})", self.generated_at.to_rfc3339());
        let _ = writeln!(
            out,
            "  agents: {}  messages: {}  tasks: {}/{} completed  in progress: {}  pending: {}  blocked: {}",
            s.total_agents,
            s.total_messages,
            s.completed_tasks,
            s.total_tasks,
            s.in_progress_tasks,
            s.pending_tasks,
            s.blocked_tasks
        );

        let totals = aggregate_metrics(&self.agents);
        let _ = writeln!(
            out,
            "  busy: {} ms  rejected assignments: {}",
            totals.busy_ms, totals.rejected_assignments
        );

        let _ = writeln!(out, "\nAgents:");
        for agent in &self.agents {
            let current = agent.current_task.as_deref().unwrap_or("-");
            let _ = writeln!(
                out,
                "  {:<14} {:<26} {:<13} done={} current={}",
                agent.id,
                agent.role,
                agent.status.to_string(),
                agent.completed_count,
                current
            );
        }

        let _ = writeln!(out, "\nRecent messages:");
        for m in &self.recent_messages {
            let _ = writeln!(
                out,
                "  [{}] {} -> {} ({}, {:?})",
                m.timestamp.format("%H:%M:%S%.3f"),
                m.from,
                m.to,
                m.kind,
                m.priority
            );
        }

        let _ = writeln!(out, "\nShared knowledge:");
        for entry in &self.shared_knowledge {
            let _ = writeln!(out, "  {} (by {}): {}", entry.key, entry.written_by, entry.value);
        }

        let _ = writeln!(out, "\nActivity:");
        for line in &self.recent_activity {
            let _ = writeln!(out, "  {line}");
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::monitor::AgentMetrics;
    use crate::types::AgentStatus;
    use agora_core::MessageKind;

    fn sample() -> CollaborationReport {
        CollaborationReport {
            generated_at: Utc::now(),
            summary: ReportSummary {
                total_agents: 1,
                total_messages: 1,
                total_tasks: 2,
                pending_tasks: 0,
                in_progress_tasks: 1,
                completed_tasks: 1,
                blocked_tasks: 0,
            },
            agents: vec![AgentSnapshot {
                id: "security".into(),
                role: "Security Auditor".into(),
                status: AgentStatus::Working,
                completed_count: 1,
                current_task_id: Some("T2".into()),
                current_task: Some("Audit headers".into()),
                metrics: AgentMetrics::default(),
            }],
            recent_messages: vec![Message::broadcast(
                "security",
                MessageKind::Result,
                serde_json::json!({"task_id": "T1"}),
            )],
            shared_knowledge: vec![KnowledgeEntry {
                key: "security_findings".into(),
                value: serde_json::json!({"score": 72}),
                written_by: "security".into(),
                updated_at: Utc::now(),
            }],
            recent_activity: vec!["[12:00:00.000] join (security): joined".into()],
        }
    }

    #[test]
    fn test_to_json_shape() {
        let json = sample().to_json();
        assert_eq!(json["summary"]["total_tasks"], 2);
        assert_eq!(json["agents"][0]["status"], "working");
        assert_eq!(json["recent_messages"][0]["kind"], "result");
        assert_eq!(json["shared_knowledge"][0]["written_by"], "security");
    }

    #[test]
    fn test_render_text() {
        let text = sample().render_text();
        assert!(text.contains("tasks: 1/2 completed"));
        assert!(text.contains("Audit headers"));
        assert!(text.contains("security -> *"));
        assert!(text.contains("security_findings (by security)"));
        assert!(text.contains("join (security): joined"));
    }
}
