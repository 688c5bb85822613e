//! Simulated specialist workers used by the demo workflow.
//!
//! Each worker sleeps for a configured step delay, produces fixed findings
//! and publishes them to shared knowledge. Nothing here touches the network.

use crate::agent::{Agent, Worker};
use crate::types::Task;
use agora_core::{AgoraResult, Message, MessageKind, Priority};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

/// Knowledge keys the audit workers publish under.
pub const SECURITY_FINDINGS: &str = "security_findings";
pub const ACCESSIBILITY_FINDINGS: &str = "accessibility_findings";
pub const PERFORMANCE_FINDINGS: &str = "performance_findings";
pub const STRATEGY_KEY: &str = "strategy";
pub const IMPLEMENTATION_PLAN: &str = "implementation_plan";
pub const REVIEW_KEY: &str = "review";

/// Review verdict threshold on the average audit score.
const APPROVAL_SCORE: f64 = 75.0;

fn target_of(task: &Task) -> String {
    task.input
        .get("target")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string()
}

/// Plans which audits to run.
pub struct StrategyWorker {
    delay: Duration,
}

impl StrategyWorker {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Worker for StrategyWorker {
    async fn execute(&self, task: &Task, agent: &Agent) -> AgoraResult<Value> {
        tokio::time::sleep(self.delay).await;
        let strategy = json!({
            "target": target_of(task),
            "focus_areas": ["security", "accessibility", "performance"],
            "priorities": [
                "Protect authentication and session handling",
                "Keep core journeys usable with assistive technology",
                "Hold first contentful paint under two seconds",
            ],
        });
        agent.update_knowledge(STRATEGY_KEY, strategy.clone())?;
        Ok(strategy)
    }
}

/// Which fixed audit an [`AuditWorker`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditArea {
    Security,
    Accessibility,
    Performance,
}

impl AuditArea {
    pub fn knowledge_key(self) -> &'static str {
        match self {
            AuditArea::Security => SECURITY_FINDINGS,
            AuditArea::Accessibility => ACCESSIBILITY_FINDINGS,
            AuditArea::Performance => PERFORMANCE_FINDINGS,
        }
    }

    fn findings(self, target: &str) -> Value {
        match self {
            AuditArea::Security => json!({
                "area": "security",
                "target": target,
                "score": 72,
                "issues": [
                    {"severity": "high", "title": "Missing Content-Security-Policy header"},
                    {"severity": "medium", "title": "Session cookie without Secure flag"},
                    {"severity": "low", "title": "Server version disclosed in headers"},
                ],
                "recommendations": [
                    "Add a restrictive Content-Security-Policy",
                    "Set Secure and HttpOnly on session cookies",
                ],
            }),
            AuditArea::Accessibility => json!({
                "area": "accessibility",
                "target": target,
                "score": 88,
                "issues": [
                    {"severity": "medium", "title": "Images without alt text"},
                    {"severity": "low", "title": "Insufficient contrast on footer links"},
                ],
                "recommendations": ["Provide alt text for informative images"],
            }),
            AuditArea::Performance => json!({
                "area": "performance",
                "target": target,
                "score": 64,
                "issues": [
                    {"severity": "high", "title": "Uncompressed hero images"},
                    {"severity": "medium", "title": "Render-blocking scripts in head"},
                ],
                "recommendations": [
                    "Serve images as WebP with explicit dimensions",
                    "Defer non-critical scripts",
                ],
            }),
        }
    }

    fn advice(self) -> &'static str {
        match self {
            AuditArea::Security => "Ship the Content-Security-Policy and cookie flags first; both are header-only changes.",
            AuditArea::Accessibility => "Fix alt text before contrast; it blocks screen reader users entirely.",
            AuditArea::Performance => "Compress images first; it is the largest share of page weight.",
        }
    }
}

/// Runs one fixed audit and answers questions in its area.
pub struct AuditWorker {
    area: AuditArea,
    delay: Duration,
}

impl AuditWorker {
    pub fn new(area: AuditArea, delay: Duration) -> Self {
        Self { area, delay }
    }
}

#[async_trait]
impl Worker for AuditWorker {
    async fn execute(&self, task: &Task, agent: &Agent) -> AgoraResult<Value> {
        tokio::time::sleep(self.delay).await;
        let findings = self.area.findings(&target_of(task));
        agent.update_knowledge(self.area.knowledge_key(), findings.clone())?;
        Ok(findings)
    }

    async fn handle_message(&self, message: &Message, agent: &Agent) -> AgoraResult<()> {
        if message.kind != MessageKind::Question {
            return Ok(());
        }
        let Some(expertise) = message.payload.get("expertise").and_then(Value::as_str) else {
            return Ok(());
        };
        if !agent.profile().has_expertise(expertise) {
            return Ok(());
        }

        info!(agent = %agent.id(), asker = %message.from, "Answering collaboration request");
        let reply = json!({
            "in_reply_to": message.id,
            "question": message.payload.get("question").cloned().unwrap_or(Value::Null),
            "advice": self.area.advice(),
        });
        agent.send_message(&message.from, MessageKind::Recommendation, reply, Priority::High)?;
        Ok(())
    }
}

/// Turns the audit findings into a change plan, consulting security.
pub struct ImplementationWorker {
    delay: Duration,
}

impl ImplementationWorker {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Worker for ImplementationWorker {
    async fn execute(&self, task: &Task, agent: &Agent) -> AgoraResult<Value> {
        let mut changes = Vec::new();
        let mut issues_addressed = 0;
        for key in [SECURITY_FINDINGS, ACCESSIBILITY_FINDINGS, PERFORMANCE_FINDINGS] {
            let Some(findings) = agent.shared_knowledge(key) else {
                debug!(agent = %agent.id(), key, "No findings published");
                continue;
            };
            issues_addressed += findings
                .get("issues")
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            if let Some(recs) = findings.get("recommendations").and_then(Value::as_array) {
                changes.extend(recs.iter().cloned());
            }
        }

        agent.request_collaboration("security", "Which security fix should ship first?")?;
        tokio::time::sleep(self.delay).await;

        let plan = json!({
            "target": target_of(task),
            "changes": changes,
            "issues_addressed": issues_addressed,
            "consulted": ["security"],
            "security_advice": agent.local_knowledge("security_advice"),
        });
        agent.update_knowledge(IMPLEMENTATION_PLAN, plan.clone())?;
        Ok(plan)
    }

    async fn handle_message(&self, message: &Message, agent: &Agent) -> AgoraResult<()> {
        if message.kind == MessageKind::Recommendation && !message.is_broadcast() {
            if let Some(advice) = message.payload.get("advice") {
                agent.remember("security_advice", advice.clone());
            }
        }
        Ok(())
    }
}

/// Averages the audit scores into a verdict.
pub struct ReviewWorker {
    delay: Duration,
}

impl ReviewWorker {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Worker for ReviewWorker {
    async fn execute(&self, task: &Task, agent: &Agent) -> AgoraResult<Value> {
        tokio::time::sleep(self.delay).await;
        let scores: Vec<f64> = [SECURITY_FINDINGS, ACCESSIBILITY_FINDINGS, PERFORMANCE_FINDINGS]
            .iter()
            .filter_map(|key| agent.shared_knowledge(key))
            .filter_map(|f| f.get("score").and_then(Value::as_f64))
            .collect();
        let average = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        };
        let verdict = if average >= APPROVAL_SCORE {
            "approved"
        } else {
            "changes-requested"
        };
        let planned_changes = agent
            .shared_knowledge(IMPLEMENTATION_PLAN)
            .and_then(|p| p.get("changes").and_then(Value::as_array).map(Vec::len))
            .unwrap_or(0);

        let review = json!({
            "target": target_of(task),
            "average_score": (average * 10.0).round() / 10.0,
            "verdict": verdict,
            "planned_changes": planned_changes,
        });
        agent.update_knowledge(REVIEW_KEY, review.clone())?;
        Ok(review)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::hub::derive_recommendations;

    #[test]
    fn test_security_findings_flagged() {
        let findings = AuditArea::Security.findings("https://example.com");
        assert_eq!(findings["score"], 72);
        let recs = derive_recommendations(&findings);
        assert!(recs.iter().any(|r| r.contains("below 80")));
        assert!(recs.contains(&"3 issues found".to_string()));
    }

    #[test]
    fn test_accessibility_not_flagged_for_score() {
        let findings = AuditArea::Accessibility.findings("https://example.com");
        let recs = derive_recommendations(&findings);
        assert!(!recs.iter().any(|r| r.contains("below 80")));
        assert!(recs.contains(&"2 issues found".to_string()));
    }

    #[test]
    fn test_target_defaults_to_unknown() {
        let task = Task::new("audit", "Audit", "security");
        assert_eq!(target_of(&task), "unknown");
        let task = task.with_input(json!({"target": "https://example.com"}));
        assert_eq!(target_of(&task), "https://example.com");
    }
}
