//! Shared domain types for Confab.
//!
//! This crate contains the types used across the Confab engine: chat items,
//! feedback, identifier newtypes, the wire envelope, and error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod chat;
pub mod error;
pub mod ids;
pub mod wire;
