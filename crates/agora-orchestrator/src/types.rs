use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Identifier of a task in the hub's task table.
pub type TaskId = String;

/// Identity of a registered agent: id, role name and expertise tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: String,
    pub role: String,
    #[serde(default)]
    pub expertise: Vec<String>,
}

impl AgentProfile {
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            expertise: Vec::new(),
        }
    }

    pub fn with_expertise<I, S>(mut self, expertise: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expertise = expertise.into_iter().map(Into::into).collect();
        self
    }

    /// Case-insensitive match against the expertise tags.
    pub fn has_expertise(&self, tag: &str) -> bool {
        self.expertise.iter().any(|e| e.eq_ignore_ascii_case(tag))
    }
}

/// Status of a task in the hub's task table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Blocked { reason: String },
}

impl TaskStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Blocked { .. } => "blocked",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A unit of work assigned to a single agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub task_type: String,
    pub description: String,
    pub assigned_to: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub input: serde_json::Value,
    /// Ordered, de-duplicated ids of tasks that must complete first.
    #[serde(default)]
    pub dependencies: Vec<TaskId>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(
        task_type: impl Into<String>,
        description: impl Into<String>,
        assigned_to: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            task_type: task_type.into(),
            description: description.into(),
            assigned_to: assigned_to.into(),
            status: TaskStatus::Pending,
            input: serde_json::Value::Null,
            dependencies: Vec::new(),
            result: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<TaskId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_input(mut self, input: serde_json::Value) -> Self {
        self.input = input;
        self
    }

    /// Set the dependency list, keeping first-seen order and dropping repeats.
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskId>,
    {
        let mut seen = HashSet::new();
        self.dependencies = deps
            .into_iter()
            .map(Into::into)
            .filter(|d: &TaskId| seen.insert(d.clone()))
            .collect();
        self
    }

    pub fn is_ready<F>(&self, is_completed: F) -> bool
    where
        F: Fn(&str) -> bool,
    {
        self.status == TaskStatus::Pending && self.dependencies.iter().all(|d| is_completed(d))
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self.status, TaskStatus::Blocked { .. })
    }
}

/// Lifecycle state of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Working,
    Collaborating,
    Blocked,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentStatus::Idle => write!(f, "idle"),
            AgentStatus::Working => write!(f, "working"),
            AgentStatus::Collaborating => write!(f, "collaborating"),
            AgentStatus::Blocked => write!(f, "blocked"),
        }
    }
}

/// Notification emitted by the hub whenever a task changes state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TaskEvent {
    Started { task_id: TaskId, agent_id: String },
    Rejected { task_id: TaskId, agent_id: String },
    Completed { task_id: TaskId, agent_id: String },
    Blocked { task_id: TaskId, reason: String },
}

impl TaskEvent {
    pub fn task_id(&self) -> &str {
        match self {
            TaskEvent::Started { task_id, .. }
            | TaskEvent::Rejected { task_id, .. }
            | TaskEvent::Completed { task_id, .. }
            | TaskEvent::Blocked { task_id, .. } => task_id,
        }
    }
}
