use crate::agent::{Agent, Worker};
use crate::config::SimulationConfig;
use crate::specialists::{
    AuditArea, AuditWorker, ImplementationWorker, ReviewWorker, StrategyWorker,
};
use crate::types::AgentProfile;
use std::sync::Arc;

pub const STRATEGIST: &str = "strategist";
pub const SECURITY: &str = "security";
pub const ACCESSIBILITY: &str = "accessibility";
pub const PERFORMANCE: &str = "performance";
pub const IMPLEMENTER: &str = "implementer";
pub const REVIEWER: &str = "reviewer";

/// Profiles of the six demo agents.
pub fn default_profiles() -> Vec<AgentProfile> {
    vec![
        AgentProfile::new(STRATEGIST, "Strategy Planner").with_expertise(["planning", "scoping"]),
        AgentProfile::new(SECURITY, "Security Auditor")
            .with_expertise(["security", "headers", "authentication"]),
        AgentProfile::new(ACCESSIBILITY, "Accessibility Auditor")
            .with_expertise(["accessibility", "wcag"]),
        AgentProfile::new(PERFORMANCE, "Performance Auditor")
            .with_expertise(["performance", "web-vitals"]),
        AgentProfile::new(IMPLEMENTER, "Implementation Engineer")
            .with_expertise(["implementation", "frontend"]),
        AgentProfile::new(REVIEWER, "Quality Reviewer").with_expertise(["review", "quality"]),
    ]
}

/// Build the six demo agents with their simulated workers.
pub fn default_roster(simulation: &SimulationConfig) -> Vec<Arc<Agent>> {
    let delay = simulation.step_delay();
    default_profiles()
        .into_iter()
        .map(|profile| {
            let worker: Arc<dyn Worker> = match profile.id.as_str() {
                STRATEGIST => Arc::new(StrategyWorker::new(delay)),
                SECURITY => Arc::new(AuditWorker::new(AuditArea::Security, delay)),
                ACCESSIBILITY => Arc::new(AuditWorker::new(AuditArea::Accessibility, delay)),
                PERFORMANCE => Arc::new(AuditWorker::new(AuditArea::Performance, delay)),
                IMPLEMENTER => Arc::new(ImplementationWorker::new(delay)),
                _ => Arc::new(ReviewWorker::new(delay)),
            };
            Agent::with_worker(profile, worker)
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::types::AgentStatus;
    use std::collections::HashSet;

    #[test]
    fn test_default_profiles_count() {
        let profiles = default_profiles();
        assert_eq!(profiles.len(), 6);
        let ids: HashSet<&str> = profiles.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids.len(), 6);
    }

    #[test]
    fn test_security_has_expertise() {
        let profiles = default_profiles();
        let security = profiles.iter().find(|p| p.id == SECURITY).unwrap();
        assert!(security.has_expertise("Security"));
        assert!(!security.has_expertise("performance"));
    }

    #[test]
    fn test_roster_agents_start_idle() {
        let roster = default_roster(&SimulationConfig::instant());
        assert_eq!(roster.len(), 6);
        assert!(roster.iter().all(|a| a.status() == AgentStatus::Idle));
        assert_eq!(roster[5].id(), REVIEWER);
    }
}
