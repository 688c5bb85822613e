use crate::bus::Delivery;
use crate::hub::{CommunicationHub, WeakHub};
use crate::monitor::{AgentMetrics, AgentSnapshot};
use crate::types::{AgentProfile, AgentStatus, Task, TaskStatus};
use agora_core::{AgoraError, AgoraResult, Message, MessageKind, Priority};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Domain behaviour plugged into an [`Agent`].
///
/// The agent owns the state machine and hub plumbing; a worker only decides
/// what a task produces and how to react to incoming messages.
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    /// Perform the task and return its result payload. An error blocks the
    /// agent until it is reset.
    async fn execute(&self, task: &Task, agent: &Agent) -> AgoraResult<serde_json::Value>;

    /// React to a delivered message.
    async fn handle_message(&self, _message: &Message, _agent: &Agent) -> AgoraResult<()> {
        Ok(())
    }
}

/// Result of offering a task to an agent.
#[derive(Debug)]
pub enum Assignment {
    /// The agent moved to `working` and started executing.
    Accepted,
    /// The agent is busy or blocked. An alert has been broadcast.
    Rejected(AgoraError),
}

struct AgentState {
    status: AgentStatus,
    current: Option<Task>,
    completed: Vec<Task>,
    metrics: AgentMetrics,
}

/// A named worker that runs at most one task at a time.
pub struct Agent {
    profile: AgentProfile,
    worker: Arc<dyn Worker>,
    state: Mutex<AgentState>,
    knowledge: RwLock<HashMap<String, serde_json::Value>>,
    hub: RwLock<Option<WeakHub>>,
}

impl Agent {
    pub fn new(profile: AgentProfile, worker: impl Worker) -> Arc<Self> {
        Self::with_worker(profile, Arc::new(worker))
    }

    pub fn with_worker(profile: AgentProfile, worker: Arc<dyn Worker>) -> Arc<Self> {
        Arc::new(Self {
            profile,
            worker,
            state: Mutex::new(AgentState {
                status: AgentStatus::Idle,
                current: None,
                completed: Vec::new(),
                metrics: AgentMetrics::default(),
            }),
            knowledge: RwLock::new(HashMap::new()),
            hub: RwLock::new(None),
        })
    }

    pub fn id(&self) -> &str {
        &self.profile.id
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    pub fn status(&self) -> AgentStatus {
        self.state.lock().status
    }

    pub fn current_task(&self) -> Option<Task> {
        self.state.lock().current.clone()
    }

    pub fn completed_tasks(&self) -> Vec<Task> {
        self.state.lock().completed.clone()
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        let state = self.state.lock();
        AgentSnapshot {
            id: self.profile.id.clone(),
            role: self.profile.role.clone(),
            status: state.status,
            completed_count: state.completed.len(),
            current_task_id: state.current.as_ref().map(|t| t.id.clone()),
            current_task: state.current.as_ref().map(|t| t.description.clone()),
            metrics: state.metrics.clone(),
        }
    }

    pub(crate) fn bind(&self, hub: WeakHub) {
        *self.hub.write() = Some(hub);
    }

    fn hub(&self) -> AgoraResult<CommunicationHub> {
        self.hub
            .read()
            .as_ref()
            .and_then(WeakHub::upgrade)
            .ok_or_else(|| AgoraError::Hub(format!("agent {} is not registered", self.id())))
    }

    /// Offer a task. An idle (or collaborating) agent starts it on a spawned
    /// tokio task; a working or blocked agent rejects it without queueing.
    pub fn assign_task(self: &Arc<Self>, mut task: Task) -> Assignment {
        let mut state = self.state.lock();
        let conflict = match (state.status, state.current.as_ref()) {
            (AgentStatus::Working, current) => Some(AgoraError::AgentBusy {
                agent: self.profile.id.clone(),
                current_task: current.map(|t| t.id.clone()).unwrap_or_default(),
            }),
            (AgentStatus::Blocked, _) => Some(AgoraError::AgentBlocked(self.profile.id.clone())),
            (AgentStatus::Idle | AgentStatus::Collaborating, _) => None,
        };

        if let Some(err) = conflict {
            state.metrics.record_rejection();
            let current = state.current.as_ref().map(|t| t.id.clone());
            drop(state);

            warn!(agent = %self.id(), task_id = %task.id, error = %err, "Assignment rejected");
            let alert = serde_json::json!({
                "conflict": "assignment_rejected",
                "agent": self.id(),
                "rejected_task": task.id,
                "current_task": current,
                "reason": err.to_string(),
            });
            if let Err(e) = self.broadcast(MessageKind::Alert, alert, Priority::High) {
                warn!(agent = %self.id(), error = %e, "Failed to broadcast conflict alert");
            }
            return Assignment::Rejected(err);
        }

        task.status = TaskStatus::InProgress;
        state.status = AgentStatus::Working;
        state.current = Some(task.clone());
        drop(state);

        info!(agent = %self.id(), task_id = %task.id, task_type = %task.task_type, "Task started");
        let agent = Arc::clone(self);
        tokio::spawn(async move { agent.run(task).await });
        Assignment::Accepted
    }

    async fn run(self: Arc<Self>, task: Task) {
        let started = Instant::now();
        let worker = Arc::clone(&self.worker);
        let agent = Arc::clone(&self);
        let job = task.clone();

        // Run the worker on its own task so a panic surfaces as a JoinError.
        let outcome = tokio::spawn(async move { worker.execute(&job, &agent).await }).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(Ok(result)) => self.complete_task(task, result, elapsed),
            Ok(Err(e)) => self.fail_task(task, e.to_string(), elapsed),
            Err(join) => self.fail_task(task, format!("execution panicked: {join}"), elapsed),
        }
    }

    fn complete_task(&self, mut task: Task, result: serde_json::Value, elapsed: Duration) {
        task.status = TaskStatus::Completed;
        task.completed_at = Some(Utc::now());
        task.result = Some(result.clone());
        let task_id = task.id.clone();

        // Idle before notifying the hub, so a dependent assigned to this same
        // agent is accepted rather than rejected as busy.
        {
            let mut state = self.state.lock();
            state.completed.push(task);
            state.current = None;
            state.status = AgentStatus::Idle;
            state.metrics.record_completion(elapsed);
        }
        info!(
            agent = %self.id(),
            task_id = %task_id,
            duration_ms = elapsed.as_millis() as u64,
            "Task completed"
        );

        match self.hub() {
            Ok(hub) => {
                if let Err(e) = hub.complete_task(&task_id, result) {
                    error!(agent = %self.id(), task_id = %task_id, error = %e, "Hub rejected completion");
                }
            }
            Err(e) => warn!(agent = %self.id(), error = %e, "Completed task with no hub"),
        }
    }

    fn fail_task(&self, task: Task, reason: String, elapsed: Duration) {
        {
            let mut state = self.state.lock();
            state.status = AgentStatus::Blocked;
            state.metrics.record_failure(elapsed);
        }
        error!(agent = %self.id(), task_id = %task.id, reason = %reason, "Task failed, agent blocked");

        if let Ok(hub) = self.hub() {
            if let Err(e) = hub.block_task(&task.id, reason) {
                error!(agent = %self.id(), task_id = %task.id, error = %e, "Hub rejected block");
            }
        }
    }

    /// Clear a `blocked` state. Returns whether the agent was blocked.
    pub(crate) fn reset(&self) -> bool {
        let mut state = self.state.lock();
        if state.status != AgentStatus::Blocked {
            return false;
        }
        state.status = AgentStatus::Idle;
        state.current = None;
        true
    }

    /// Handle a delivered message: count it, then hand it to the worker.
    pub async fn receive_message(&self, message: Message) {
        {
            let mut state = self.state.lock();
            state.metrics.record_message();
            if message.kind == MessageKind::Recommendation
                && !message.is_broadcast()
                && state.status == AgentStatus::Collaborating
            {
                state.status = AgentStatus::Idle;
            }
        }
        debug!(
            agent = %self.id(),
            from = %message.from,
            kind = %message.kind,
            "Message received"
        );

        if let Err(e) = self.worker.handle_message(&message, self).await {
            warn!(agent = %self.id(), message_id = %message.id, error = %e, "Message handler failed");
        }
    }

    pub(crate) fn spawn_pump(
        self: &Arc<Self>,
        mut inbox: mpsc::UnboundedReceiver<Message>,
    ) -> JoinHandle<()> {
        let agent = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(message) = inbox.recv().await {
                agent.receive_message(message).await;
            }
            debug!(agent = %agent.id(), "Inbox closed");
        })
    }

    pub fn send_message(
        &self,
        to: impl Into<String>,
        kind: MessageKind,
        payload: serde_json::Value,
        priority: Priority,
    ) -> AgoraResult<Delivery> {
        let message = Message::new(self.id(), to, kind, payload).with_priority(priority);
        self.hub()?.send_message(message)
    }

    pub fn broadcast(
        &self,
        kind: MessageKind,
        payload: serde_json::Value,
        priority: Priority,
    ) -> AgoraResult<Delivery> {
        let message = Message::broadcast(self.id(), kind, payload).with_priority(priority);
        self.hub()?.send_message(message)
    }

    /// Write to the hub's shared store and cache the value locally.
    pub fn update_knowledge(
        &self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> AgoraResult<()> {
        let key = key.into();
        self.knowledge.write().insert(key.clone(), value.clone());
        self.hub()?.update_shared_knowledge(key, value, self.id());
        Ok(())
    }

    /// Read from the hub's shared store, caching what is found. Falls back
    /// to the local cache when the agent is not registered.
    pub fn shared_knowledge(&self, key: &str) -> Option<serde_json::Value> {
        match self.hub() {
            Ok(hub) => {
                let value = hub.get_shared_knowledge(key)?;
                self.knowledge.write().insert(key.to_string(), value.clone());
                Some(value)
            }
            Err(_) => self.local_knowledge(key),
        }
    }

    /// Store a value in this agent's private cache only.
    pub fn remember(&self, key: impl Into<String>, value: serde_json::Value) {
        self.knowledge.write().insert(key.into(), value);
    }

    pub fn local_knowledge(&self, key: &str) -> Option<serde_json::Value> {
        self.knowledge.read().get(key).cloned()
    }

    /// Broadcast a question to agents with the given expertise.
    ///
    /// Does not wait for an answer; replies arrive as messages and are
    /// correlated by the worker. An idle agent moves to `collaborating`,
    /// a working agent keeps working.
    pub fn request_collaboration(
        &self,
        expertise: &str,
        question: &str,
    ) -> AgoraResult<Delivery> {
        {
            let mut state = self.state.lock();
            if state.status == AgentStatus::Idle {
                state.status = AgentStatus::Collaborating;
            }
        }
        let payload = serde_json::json!({
            "expertise": expertise,
            "question": question,
            "requested_by": self.id(),
        });
        self.broadcast(MessageKind::Question, payload, Priority::Medium)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl Worker for Noop {
        async fn execute(&self, _task: &Task, _agent: &Agent) -> AgoraResult<serde_json::Value> {
            Ok(serde_json::Value::Null)
        }
    }

    #[test]
    fn test_new_agent_is_idle() {
        let agent = Agent::new(AgentProfile::new("a1", "tester"), Noop);
        let snapshot = agent.snapshot();
        assert_eq!(snapshot.status, AgentStatus::Idle);
        assert_eq!(snapshot.completed_count, 0);
        assert!(snapshot.current_task.is_none());
    }

    #[test]
    fn test_unregistered_agent_caches_locally() {
        let agent = Agent::new(AgentProfile::new("a1", "tester"), Noop);
        let err = agent.update_knowledge("k", serde_json::json!(1)).unwrap_err();
        assert!(matches!(err, AgoraError::Hub(_)));
        assert_eq!(agent.local_knowledge("k"), Some(serde_json::json!(1)));
        assert_eq!(agent.shared_knowledge("k"), Some(serde_json::json!(1)));
    }

    #[test]
    fn test_collaboration_without_hub_errors() {
        let agent = Agent::new(AgentProfile::new("a1", "tester"), Noop);
        assert!(agent.request_collaboration("security", "?").is_err());
        assert_eq!(agent.status(), AgentStatus::Collaborating);
    }

    #[test]
    fn test_reset_only_from_blocked() {
        let agent = Agent::new(AgentProfile::new("a1", "tester"), Noop);
        assert!(!agent.reset());
        agent.state.lock().status = AgentStatus::Blocked;
        assert!(agent.reset());
        assert_eq!(agent.status(), AgentStatus::Idle);
    }

    #[tokio::test]
    async fn test_busy_agent_rejects_second_task() {
        let agent = Agent::new(AgentProfile::new("a1", "tester"), Noop);
        {
            let mut state = agent.state.lock();
            state.status = AgentStatus::Working;
            state.current = Some(Task::new("t", "first", "a1").with_id("T1"));
        }
        let outcome = agent.assign_task(Task::new("t", "second", "a1").with_id("T2"));
        match outcome {
            Assignment::Rejected(AgoraError::AgentBusy { current_task, .. }) => {
                assert_eq!(current_task, "T1");
            }
            other => panic!("expected busy rejection, got {other:?}"),
        }
        assert_eq!(agent.current_task().unwrap().id, "T1");
        assert_eq!(agent.snapshot().metrics.rejected_assignments, 1);
    }
}
