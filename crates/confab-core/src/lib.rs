//! Session synchronization engine for Confab.
//!
//! This crate keeps a single conversation's message list, pagination
//! cursor, and live typing rendering consistent while messages arrive from
//! three uncoordinated sources: a request/response send, a realtime push,
//! and a paginated history fetch. All mutation flows through a pure reducer
//! over the session state; a single controller task owns the state and
//! interprets the reducer's effects.
//!
//! The crate defines the "ports" (collaborator traits) that the
//! infrastructure layer implements. It depends only on `confab-types` and
//! the async runtime -- never on `confab-client` or any IO crate.

pub mod controller;
pub mod ports;
pub mod session;
pub mod typewriter;
