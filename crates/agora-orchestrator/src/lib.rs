//! Task coordination hub, worker agents and the orchestrator for Agora.
//!
//! A [`CommunicationHub`] keeps a registry of [`Agent`]s, routes point-to-point
//! and broadcast messages over a [`MessageBus`], owns the task table and a
//! shared knowledge store, and starts tasks as soon as their dependencies
//! complete. The [`Orchestrator`] seeds a fixed task graph into the hub and
//! waits for it.
//!
//! # Main types
//!
//! - [`CommunicationHub`] — Agent registry, message router and task table owner.
//! - [`Agent`] — Single-task-at-a-time worker with its own state machine.
//! - [`Worker`] — Async trait supplying an agent's domain behaviour.
//! - [`Orchestrator`] — Plans, submits and awaits the demo task graph.
//! - [`MessageBus`] / [`InMemoryBus`] — Pub/sub transport between hub and agents.
//! - [`CollaborationReport`] — Serialisable summary of a hub's state.

/// Hub activity log.
pub mod activity;
/// Worker agents and the worker trait.
pub mod agent;
/// Message bus trait and in-memory implementation.
pub mod bus;
/// Hub, orchestrator and simulation settings.
pub mod config;
/// Orchestration engine and pipeline execution.
pub mod engine;
/// The communication hub.
pub mod hub;
/// Shared knowledge store.
pub mod knowledge;
/// Agent metrics and snapshots.
pub mod monitor;
/// Default agent profiles and the demo roster.
pub mod profiles;
/// Collaboration reports.
pub mod report;
/// Simulated specialist workers.
pub mod specialists;
/// Task table with dependency tracking.
pub mod task_table;
/// Shared orchestration types (Task, AgentProfile, TaskEvent, etc.).
pub mod types;

pub use activity::{ActivityEntry, ActivityLog, ActivityOutcome};
pub use agent::{Agent, Assignment, Worker};
pub use bus::{Delivery, InMemoryBus, MessageBus};
pub use config::{HubConfig, OrchestratorConfig, ReportLimits, SimulationConfig};
pub use engine::{validate, Orchestrator, OrchestratorResult, TaskOutcome};
pub use hub::{derive_recommendations, AssignOutcome, CommunicationHub};
pub use knowledge::{KnowledgeEntry, SharedKnowledge};
pub use monitor::{aggregate_metrics, AgentMetrics, AgentSnapshot};
pub use profiles::{default_profiles, default_roster};
pub use report::{CollaborationReport, ReportSummary};
pub use task_table::TaskTable;
pub use types::{AgentProfile, AgentStatus, Task, TaskEvent, TaskId, TaskStatus};
