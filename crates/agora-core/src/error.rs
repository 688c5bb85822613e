use std::time::Duration;
use thiserror::Error;

/// A convenience `Result` alias using [`AgoraError`].
pub type AgoraResult<T> = Result<T, AgoraError>;

/// Top-level error type for the Agora hub and its agents.
///
/// Unknown recipients and assignees, busy agents and stalled graphs each have
/// their own variant so callers can decide whether they are fatal.
#[derive(Error, Debug)]
pub enum AgoraError {
    /// An error raised by a worker while executing a task.
    #[error("Agent error: {0}")]
    Agent(String),

    /// The hub was dropped or is otherwise unavailable.
    #[error("Hub error: {0}")]
    Hub(String),

    /// A task names an assignee that is not registered.
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    /// A point-to-point message names a recipient that is not subscribed.
    #[error("Unknown recipient: {0}")]
    UnknownRecipient(String),

    /// A task id that is not in the task table.
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    /// A task id that is already in the task table.
    #[error("Duplicate task: {0}")]
    DuplicateTask(String),

    /// The agent already holds an in-progress task.
    #[error("Agent {agent} is busy with task {current_task}")]
    AgentBusy {
        /// The agent that rejected the assignment.
        agent: String,
        /// The task the agent is currently working on.
        current_task: String,
    },

    /// The agent is blocked after a failed execution and must be reset.
    #[error("Agent {0} is blocked")]
    AgentBlocked(String),

    /// The task graph contains a dependency cycle.
    #[error("Dependency cycle detected: {0}")]
    DependencyCycle(String),

    /// A wait did not finish before its deadline.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// An error from the orchestrator (invalid graph, blocked task).
    #[error("Orchestrator error: {0}")]
    Orchestrator(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
