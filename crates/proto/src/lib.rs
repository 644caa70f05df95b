//! Shared protocol types for the chat session and its hosts.
//!
//! This crate defines timeline messages, model profiles, request outcomes,
//! session events/intents, and strongly-typed error enums shared across the
//! workspace.

pub mod error;
pub mod event;
pub mod message;
pub mod model;

/// Re-export of all protocol error types.
pub use error::*;
/// Re-export of session event, intent, and outcome types.
pub use event::{Generation, RequestOutcome, ScrollDecision, SessionEvent, UserIntent};
/// Re-export of timeline message types.
pub use message::{Message, MessageId, Role};
/// Re-export of model catalog types.
pub use model::{ModelProfile, default_catalog, find_profile};
