//! Core types and error definitions for Agora.
//!
//! This crate provides the types shared by the hub, its agents and the CLI:
//! the unified error type and the message envelope routed by the hub.
//!
//! # Main types
//!
//! - [`AgoraError`] — Unified error enum for hub, agent and orchestrator failures.
//! - [`AgoraResult`] — Convenience alias for `Result<T, AgoraError>`.
//! - [`Message`] — An addressed envelope (point-to-point or broadcast).
//! - [`MessageKind`] — `task`, `result`, `question`, `recommendation` or `alert`.
//! - [`Priority`] — `low` through `critical`.

mod error;
mod message;

pub use error::{AgoraError, AgoraResult};
pub use message::{Message, MessageKind, Priority, Recipient};

/// Sender id used for messages that originate from the hub itself.
pub const HUB_SENDER: &str = "hub";
