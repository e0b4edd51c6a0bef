//! Core type definitions for the provider adapter layer.
//!
//! These are the provider-agnostic shapes callers see: role-tagged messages
//! in, canonical responses and stream chunks out.

pub mod messages;
pub mod response;

pub use messages::*;
pub use response::*;

/// A unique identifier for tracking a single generate or stream call
pub type OperationId = uuid::Uuid;
