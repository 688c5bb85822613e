use crate::config::OrchestratorConfig;
use crate::hub::CommunicationHub;
use crate::profiles::{ACCESSIBILITY, IMPLEMENTER, PERFORMANCE, REVIEWER, SECURITY, STRATEGIST};
use crate::task_table::TaskTable;
use crate::types::{Task, TaskId, TaskStatus};
use agora_core::{AgoraError, AgoraResult};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

/// Builds the task graph, seeds it into the hub and waits for it.
///
/// Follows a plan → execute → synthesize pipeline. Execution itself is driven
/// by the hub's dependency activation; the orchestrator only waits on the
/// completion signal. Dropping the future returned by [`Orchestrator::run`]
/// cancels the wait but not tasks already handed to agents.
pub struct Orchestrator {
    hub: CommunicationHub,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(hub: CommunicationHub, config: OrchestratorConfig) -> Self {
        Self { hub, config }
    }

    pub fn hub(&self) -> &CommunicationHub {
        &self.hub
    }

    /// Run the demo workflow against `target`.
    pub async fn run(&self, target: &str) -> AgoraResult<OrchestratorResult> {
        info!(target = %target, "Orchestrator: starting pipeline");
        let tasks = self.plan(target);
        self.execute(target, tasks).await
    }

    /// Phase 1: the fixed audit graph for one target.
    ///
    /// `strategy → {security, accessibility, performance} → implementation → review`
    pub fn plan(&self, target: &str) -> Vec<Task> {
        let input = serde_json::json!({ "target": target });
        let audits = ["security-audit", "accessibility-audit", "performance-audit"];

        vec![
            Task::new("strategy", format!("Plan the audit of {target}"), STRATEGIST)
                .with_id("strategy")
                .with_input(input.clone()),
            Task::new("security", format!("Security audit of {target}"), SECURITY)
                .with_id(audits[0])
                .with_input(input.clone())
                .with_dependencies(["strategy"]),
            Task::new(
                "accessibility",
                format!("Accessibility audit of {target}"),
                ACCESSIBILITY,
            )
            .with_id(audits[1])
            .with_input(input.clone())
            .with_dependencies(["strategy"]),
            Task::new("performance", format!("Performance audit of {target}"), PERFORMANCE)
                .with_id(audits[2])
                .with_input(input.clone())
                .with_dependencies(["strategy"]),
            Task::new(
                "implementation",
                format!("Plan fixes for {target}"),
                IMPLEMENTER,
            )
            .with_id("implementation")
            .with_input(input.clone())
            .with_dependencies(audits),
            Task::new("review", format!("Review the fixes for {target}"), REVIEWER)
                .with_id("review")
                .with_input(input)
                .with_dependencies(["implementation"]),
        ]
    }

    /// Phase 2 and 3 for an arbitrary graph: validate, submit, wait, synthesize.
    ///
    /// A blocked task ends the wait early and is reported in the result; a
    /// timeout is returned as an error.
    pub async fn execute(&self, target: &str, tasks: Vec<Task>) -> AgoraResult<OrchestratorResult> {
        let start = Instant::now();
        validate(&tasks)?;
        for task in &tasks {
            if self.hub.agent(&task.assigned_to).is_none() {
                return Err(AgoraError::UnknownAgent(task.assigned_to.clone()));
            }
        }

        let ids = self.hub.add_tasks(tasks)?;
        let roots = self.hub.activate_ready();
        info!(tasks = ids.len(), roots = ?roots, "Orchestrator: graph submitted");

        match self.hub.wait_for(&ids, self.config.timeout()).await {
            Ok(()) => {}
            Err(e @ AgoraError::Timeout(_)) => {
                warn!(error = %e, "Orchestrator: graph did not finish in time");
                return Err(e);
            }
            Err(e) => warn!(error = %e, "Orchestrator: graph stalled"),
        }

        let result = self.synthesize(target, &ids, start.elapsed().as_millis() as u64);
        info!(
            duration_ms = result.duration_ms,
            completed = result.completed_tasks,
            blocked = result.blocked_tasks,
            "Orchestrator: pipeline complete"
        );
        Ok(result)
    }

    /// Phase 3: collect per-task outcomes.
    fn synthesize(&self, target: &str, ids: &[TaskId], duration_ms: u64) -> OrchestratorResult {
        let tasks: Vec<TaskOutcome> = ids
            .iter()
            .filter_map(|id| self.hub.task(id))
            .map(|t| TaskOutcome {
                id: t.id,
                task_type: t.task_type,
                assigned_to: t.assigned_to,
                status: t.status,
                result: t.result,
            })
            .collect();

        let completed = tasks.iter().filter(|t| t.status == TaskStatus::Completed).count();
        let blocked = tasks
            .iter()
            .filter(|t| matches!(t.status, TaskStatus::Blocked { .. }))
            .count();
        let summary = format!(
            "Orchestration of {target}: {completed}/{} tasks completed, {blocked} blocked",
            tasks.len()
        );

        OrchestratorResult {
            target: target.to_string(),
            summary,
            total_tasks: tasks.len(),
            completed_tasks: completed,
            blocked_tasks: blocked,
            duration_ms,
            tasks,
        }
    }
}

/// Reject duplicate ids, dependencies outside the graph and cycles.
pub fn validate(tasks: &[Task]) -> AgoraResult<()> {
    let mut table = TaskTable::new();
    for task in tasks {
        table.insert(task.clone())?;
    }
    if let Some((task, dep)) = table.missing_dependencies().into_iter().next() {
        return Err(AgoraError::Orchestrator(format!(
            "task {task} depends on unknown task {dep}"
        )));
    }
    if let Some(id) = table.find_cycle() {
        return Err(AgoraError::DependencyCycle(id));
    }
    Ok(())
}

/// Final state of one task in an orchestration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub id: TaskId,
    pub task_type: String,
    pub assigned_to: String,
    pub status: TaskStatus,
    pub result: Option<serde_json::Value>,
}

/// Result of a full orchestration pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorResult {
    pub target: String,
    pub summary: String,
    pub tasks: Vec<TaskOutcome>,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub blocked_tasks: usize,
    pub duration_ms: u64,
}

impl OrchestratorResult {
    pub fn is_success(&self) -> bool {
        self.completed_tasks == self.total_tasks
    }
}
