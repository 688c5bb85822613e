use crate::activity::{ActivityEntry, ActivityLog, ActivityOutcome};
use crate::agent::{Agent, Assignment};
use crate::bus::{Delivery, InMemoryBus, MessageBus};
use crate::config::{HubConfig, ReportLimits};
use crate::knowledge::{KnowledgeEntry, SharedKnowledge};
use crate::monitor::AgentSnapshot;
use crate::report::{CollaborationReport, ReportSummary};
use crate::task_table::TaskTable;
use crate::types::{Task, TaskEvent, TaskId, TaskStatus};
use agora_core::{AgoraError, AgoraResult, Message, MessageKind, Priority, HUB_SENDER};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

/// Outcome of a successful [`CommunicationHub::assign_task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOutcome {
    /// The assignee accepted the task and is executing it.
    Started,
    /// The task is stored and waits for its dependencies.
    Waiting,
}

pub(crate) struct HubInner {
    bus: Arc<dyn MessageBus>,
    agents: RwLock<HashMap<String, Arc<Agent>>>,
    tasks: Mutex<TaskTable>,
    knowledge: SharedKnowledge,
    activity: ActivityLog,
    events: broadcast::Sender<TaskEvent>,
    /// Bumped on every task state change; drives `wait_for`.
    progress: watch::Sender<u64>,
    config: HubConfig,
}

/// Central registry and router connecting agents.
///
/// Owns the task table, the shared knowledge store and the activity log,
/// and drives dependency-based task activation. Cloning is cheap and every
/// clone refers to the same hub. Registration spawns tokio tasks, so the hub
/// must be used inside a runtime.
#[derive(Clone)]
pub struct CommunicationHub {
    inner: Arc<HubInner>,
}

/// Non-owning link from an agent back to its hub.
#[derive(Clone)]
pub(crate) struct WeakHub(Weak<HubInner>);

impl WeakHub {
    pub(crate) fn upgrade(&self) -> Option<CommunicationHub> {
        self.0.upgrade().map(|inner| CommunicationHub { inner })
    }
}

impl CommunicationHub {
    pub fn new(config: HubConfig) -> Self {
        Self::with_bus(Arc::new(InMemoryBus::new()), config)
    }

    /// Build a hub on a custom message transport.
    pub fn with_bus(bus: Arc<dyn MessageBus>, config: HubConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (progress, _) = watch::channel(0);
        Self {
            inner: Arc::new(HubInner {
                bus,
                agents: RwLock::new(HashMap::new()),
                tasks: Mutex::new(TaskTable::new()),
                knowledge: SharedKnowledge::new(),
                activity: ActivityLog::new(config.activity_capacity),
                events,
                progress,
                config,
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakHub {
        WeakHub(Arc::downgrade(&self.inner))
    }

    // --- Registry -----------------------------------------------------------

    /// Register an agent, bind the hub into it and start its message pump.
    ///
    /// Re-registering an id replaces the earlier agent; its inbox is closed
    /// and tasks it held are not migrated.
    pub fn register_agent(&self, agent: Arc<Agent>) {
        let id = agent.id().to_string();
        agent.bind(self.downgrade());
        let inbox = self.inner.bus.subscribe(&id);
        let replaced = self
            .inner
            .agents
            .write()
            .insert(id.clone(), Arc::clone(&agent))
            .is_some();
        agent.spawn_pump(inbox);

        if replaced {
            self.inner.activity.log_action(
                "rejoin",
                Some(&id),
                "replaced an existing registration",
                ActivityOutcome::Rejected,
            );
        }
        let profile = agent.profile();
        self.inner.activity.log_action(
            "join",
            Some(&id),
            format!(
                "{} joined with expertise [{}]",
                profile.role,
                profile.expertise.join(", ")
            ),
            ActivityOutcome::Success,
        );
    }

    pub fn agent(&self, id: &str) -> Option<Arc<Agent>> {
        self.inner.agents.read().get(id).cloned()
    }

    pub fn agent_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.agents.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Snapshot of every agent, sorted by id.
    pub fn agent_status(&self) -> Vec<AgentSnapshot> {
        let agents: Vec<Arc<Agent>> = self.inner.agents.read().values().cloned().collect();
        let mut snapshots: Vec<AgentSnapshot> = agents.iter().map(|a| a.snapshot()).collect();
        snapshots.sort_by(|a, b| a.id.cmp(&b.id));
        snapshots
    }

    /// Clear a blocked agent and re-offer every ready task.
    pub fn reset_agent(&self, id: &str) -> AgoraResult<Vec<TaskId>> {
        let agent = self
            .agent(id)
            .ok_or_else(|| AgoraError::UnknownAgent(id.to_string()))?;
        if agent.reset() {
            self.inner
                .activity
                .log_action("reset", Some(id), "cleared blocked state", ActivityOutcome::Success);
        }
        Ok(self.activate_ready())
    }

    // --- Messaging ----------------------------------------------------------

    /// Record and route a message through the bus.
    pub fn send_message(&self, message: Message) -> AgoraResult<Delivery> {
        let from = message.from.clone();
        let to = message.to.to_string();
        let kind = message.kind;
        match self.inner.bus.publish(message) {
            Ok(delivery) => {
                self.inner.activity.log_action(
                    "message",
                    Some(&from),
                    format!("{kind} -> {to} ({} recipients)", delivery.count()),
                    ActivityOutcome::Success,
                );
                Ok(delivery)
            }
            Err(e) => {
                self.inner.activity.log_action(
                    "message",
                    Some(&from),
                    format!("{kind} -> {to} undeliverable: {e}"),
                    ActivityOutcome::Rejected,
                );
                Err(e)
            }
        }
    }

    pub fn message_history(&self) -> Vec<Message> {
        self.inner.bus.history()
    }

    pub fn recent_messages(&self, n: usize) -> Vec<Message> {
        self.inner.bus.recent(n)
    }

    pub fn recent_activity(&self, n: usize) -> Vec<ActivityEntry> {
        self.inner.activity.recent(n)
    }

    // --- Tasks --------------------------------------------------------------

    /// Store a task without trying to start it.
    pub fn add_task(&self, task: Task) -> AgoraResult<TaskId> {
        let id = self.inner.tasks.lock().insert(task)?;
        self.bump();
        Ok(id)
    }

    /// Store a batch of tasks, all or none.
    ///
    /// Every id is checked against the table and the rest of the batch before
    /// anything is inserted, so a duplicate leaves the table untouched.
    pub fn add_tasks(&self, batch: Vec<Task>) -> AgoraResult<Vec<TaskId>> {
        let ids = {
            let mut tasks = self.inner.tasks.lock();
            if let Some(dup) = tasks.first_conflict(&batch) {
                return Err(AgoraError::DuplicateTask(dup));
            }
            batch
                .into_iter()
                .map(|task| tasks.insert(task))
                .collect::<AgoraResult<Vec<_>>>()?
        };
        self.bump();
        Ok(ids)
    }

    /// Store a task and start it if its dependencies are complete.
    ///
    /// The task stays in the table whatever the outcome. An unknown assignee
    /// or a busy agent is reported as an error and leaves the task pending.
    /// The hub does not retry a rejected task; it starts only through a later
    /// [`start_task`](Self::start_task), [`activate_ready`](Self::activate_ready)
    /// or [`reset_agent`](Self::reset_agent).
    pub fn assign_task(&self, task: Task) -> AgoraResult<AssignOutcome> {
        let id = self.add_task(task)?;
        self.start_task(&id)
    }

    /// Try to start a task that is already in the table.
    pub fn start_task(&self, task_id: &str) -> AgoraResult<AssignOutcome> {
        let mut tasks = self.inner.tasks.lock();
        let task = tasks
            .get(task_id)
            .cloned()
            .ok_or_else(|| AgoraError::UnknownTask(task_id.to_string()))?;

        if task.status != TaskStatus::Pending {
            return Err(AgoraError::Hub(format!(
                "task {task_id} is {}, not pending",
                task.status
            )));
        }
        if !tasks.is_ready(task_id) {
            return Ok(AssignOutcome::Waiting);
        }

        let Some(agent) = self.agent(&task.assigned_to) else {
            self.inner.activity.log_action(
                "assign",
                None,
                format!("task {task_id} names unknown agent {}", task.assigned_to),
                ActivityOutcome::Error,
            );
            return Err(AgoraError::UnknownAgent(task.assigned_to));
        };

        // The table lock is held across the hand-off so the agent's completion
        // cannot be recorded before the task is marked in progress.
        match agent.assign_task(task.clone()) {
            Assignment::Accepted => {
                tasks.mark_in_progress(task_id);
                // Emitted under the lock so `started` always precedes `completed`.
                self.emit(TaskEvent::Started {
                    task_id: task.id.clone(),
                    agent_id: task.assigned_to.clone(),
                });
                drop(tasks);
                self.inner.activity.log_action(
                    "assign",
                    Some(&task.assigned_to),
                    format!("started {} ({})", task.id, task.description),
                    ActivityOutcome::Success,
                );
                Ok(AssignOutcome::Started)
            }
            Assignment::Rejected(err) => {
                self.emit(TaskEvent::Rejected {
                    task_id: task.id.clone(),
                    agent_id: task.assigned_to.clone(),
                });
                drop(tasks);
                self.inner.activity.log_action(
                    "assign",
                    Some(&task.assigned_to),
                    format!("rejected {}: {err}", task.id),
                    ActivityOutcome::Rejected,
                );
                Err(err)
            }
        }
    }

    /// Start every pending task whose dependencies are complete.
    /// Returns the ids that started.
    pub fn activate_ready(&self) -> Vec<TaskId> {
        let ready = self.inner.tasks.lock().all_ready();
        self.start_all(ready)
    }

    fn start_all(&self, candidates: Vec<TaskId>) -> Vec<TaskId> {
        candidates
            .into_iter()
            .filter(|id| match self.start_task(id) {
                Ok(AssignOutcome::Started) => true,
                Ok(AssignOutcome::Waiting) => false,
                Err(e) => {
                    warn!(task_id = %id, error = %e, "Task could not be started");
                    false
                }
            })
            .collect()
    }

    /// Record a completion reported by an agent.
    ///
    /// Broadcasts a `result` message with derived recommendations, then
    /// starts the dependents that became ready. Only an in-progress task can
    /// complete. Activation order among siblings is unspecified.
    pub fn complete_task(&self, task_id: &str, result: serde_json::Value) -> AgoraResult<()> {
        let (agent_id, candidates) = {
            let mut tasks = self.inner.tasks.lock();
            let agent_id = Self::running_assignee(&tasks, task_id)?;
            tasks.mark_completed(task_id, result.clone());
            (agent_id, tasks.ready_dependents(task_id))
        };

        self.emit(TaskEvent::Completed {
            task_id: task_id.to_string(),
            agent_id: agent_id.clone(),
        });
        self.inner.activity.log_action(
            "complete",
            Some(&agent_id),
            format!("completed {task_id}"),
            ActivityOutcome::Success,
        );

        let recommendations = derive_recommendations(&result);
        let payload = serde_json::json!({
            "task_id": task_id,
            "result": result,
            "recommendations": recommendations,
        });
        if let Err(e) = self.send_message(Message::broadcast(agent_id, MessageKind::Result, payload)) {
            warn!(task_id = %task_id, error = %e, "Result broadcast failed");
        }

        let started = self.start_all(candidates);
        if !started.is_empty() {
            info!(task_id = %task_id, activated = ?started, "Dependents activated");
        }
        Ok(())
    }

    /// Record that an in-progress task's execution failed. Dependents stay
    /// pending.
    pub fn block_task(&self, task_id: &str, reason: String) -> AgoraResult<()> {
        let agent_id = {
            let mut tasks = self.inner.tasks.lock();
            let agent_id = Self::running_assignee(&tasks, task_id)?;
            tasks.mark_blocked(task_id, reason.clone());
            agent_id
        };

        self.emit(TaskEvent::Blocked {
            task_id: task_id.to_string(),
            reason: reason.clone(),
        });
        self.inner.activity.log_action(
            "block",
            Some(&agent_id),
            format!("task {task_id} blocked: {reason}"),
            ActivityOutcome::Error,
        );

        let alert = serde_json::json!({
            "task_id": task_id,
            "agent": agent_id,
            "reason": reason,
        });
        let message = Message::broadcast(HUB_SENDER, MessageKind::Alert, alert)
            .with_priority(Priority::Critical);
        if let Err(e) = self.send_message(message) {
            warn!(task_id = %task_id, error = %e, "Block alert failed");
        }
        Ok(())
    }

    fn running_assignee(tasks: &TaskTable, task_id: &str) -> AgoraResult<String> {
        let task = tasks
            .get(task_id)
            .ok_or_else(|| AgoraError::UnknownTask(task_id.to_string()))?;
        if task.status != TaskStatus::InProgress {
            return Err(AgoraError::Hub(format!(
                "task {task_id} is {}, not in progress",
                task.status
            )));
        }
        Ok(task.assigned_to.clone())
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        self.inner.tasks.lock().get(id).cloned()
    }

    /// All tasks in insertion order.
    pub fn tasks(&self) -> Vec<Task> {
        self.inner
            .tasks
            .lock()
            .all_tasks()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Stream of task state changes. Slow receivers may lag and miss events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<TaskEvent> {
        self.inner.events.subscribe()
    }

    /// Wait until every listed task is completed.
    ///
    /// Fails fast if one of them is blocked or unknown, and with
    /// [`AgoraError::Timeout`] once `timeout` elapses. Dropping the future
    /// cancels the wait.
    pub async fn wait_for(&self, ids: &[TaskId], timeout: Duration) -> AgoraResult<()> {
        let mut progress = self.inner.progress.subscribe();
        let wait = async {
            loop {
                if let Some(outcome) = self.check_finished(ids) {
                    return outcome;
                }
                if progress.changed().await.is_err() {
                    return Err(AgoraError::Hub("hub shut down".to_string()));
                }
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| AgoraError::Timeout(timeout))?
    }

    /// Wait until every task in the table is completed.
    pub async fn wait_all(&self, timeout: Duration) -> AgoraResult<()> {
        let ids: Vec<TaskId> = self.tasks().into_iter().map(|t| t.id).collect();
        self.wait_for(&ids, timeout).await
    }

    fn check_finished(&self, ids: &[TaskId]) -> Option<AgoraResult<()>> {
        let tasks = self.inner.tasks.lock();
        for id in ids {
            match tasks.get(id) {
                None => return Some(Err(AgoraError::UnknownTask(id.clone()))),
                Some(Task {
                    status: TaskStatus::Blocked { reason },
                    ..
                }) => {
                    return Some(Err(AgoraError::Orchestrator(format!(
                        "task {id} is blocked: {reason}"
                    ))));
                }
                Some(task) if !task.is_completed() => return None,
                Some(_) => {}
            }
        }
        Some(Ok(()))
    }

    fn emit(&self, event: TaskEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
        self.bump();
    }

    fn bump(&self) {
        self.inner.progress.send_modify(|v| *v += 1);
    }

    // --- Shared knowledge ---------------------------------------------------

    /// Last-write-wins update attributed to `writer`.
    pub fn update_shared_knowledge(
        &self,
        key: impl Into<String>,
        value: serde_json::Value,
        writer: &str,
    ) {
        let key = key.into();
        self.inner.activity.log_action(
            "knowledge",
            Some(writer),
            format!("updated {key}"),
            ActivityOutcome::Success,
        );
        self.inner.knowledge.update(key, value, writer);
    }

    pub fn get_shared_knowledge(&self, key: &str) -> Option<serde_json::Value> {
        self.inner.knowledge.get(key)
    }

    pub fn knowledge_entry(&self, key: &str) -> Option<KnowledgeEntry> {
        self.inner.knowledge.entry(key)
    }

    // --- Reporting ----------------------------------------------------------

    /// Report using the limits from [`HubConfig`].
    pub fn generate_collaboration_report(&self) -> CollaborationReport {
        self.generate_collaboration_report_with(self.inner.config.report)
    }

    pub fn generate_collaboration_report_with(&self, limits: ReportLimits) -> CollaborationReport {
        let task_counts = {
            let tasks = self.inner.tasks.lock();
            ReportSummary {
                total_tasks: tasks.total_count(),
                pending_tasks: tasks.pending_count(),
                in_progress_tasks: tasks.in_progress_count(),
                completed_tasks: tasks.completed_count(),
                blocked_tasks: tasks.blocked_count(),
                ..ReportSummary::default()
            }
        };
        let agents = self.agent_status();

        CollaborationReport {
            generated_at: Utc::now(),
            summary: ReportSummary {
                total_agents: agents.len(),
                total_messages: self.inner.bus.message_count(),
                ..task_counts
            },
            agents,
            recent_messages: self.inner.bus.recent(limits.messages),
            shared_knowledge: self.inner.knowledge.snapshot(),
            recent_activity: self
                .inner
                .activity
                .recent(limits.log_lines)
                .iter()
                .map(ActivityEntry::line)
                .collect(),
        }
    }
}

impl Default for CommunicationHub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

/// Recommendations attached to a `result` broadcast.
///
/// Looks at a numeric `score` (below 80 is flagged), an `issues` array and
/// an explicit `recommendations` array of strings.
pub fn derive_recommendations(result: &serde_json::Value) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(score) = result.get("score").and_then(serde_json::Value::as_f64) {
        if score < 80.0 {
            out.push(format!("Score {score:.0} is below 80; prioritise remediation"));
        }
    }
    if let Some(issues) = result.get("issues").and_then(serde_json::Value::as_array) {
        if !issues.is_empty() {
            out.push(format!("{} issues found", issues.len()));
        }
    }
    if let Some(explicit) = result
        .get("recommendations")
        .and_then(serde_json::Value::as_array)
    {
        out.extend(explicit.iter().filter_map(|r| r.as_str().map(str::to_string)));
    }
    out
}
