//! Infrastructure implementations of the Confab ports.
//!
//! `HttpChatApi` talks to the chat server over HTTP, `WsConnector` opens
//! the realtime WebSocket channel, and `FileVisitorStore` persists the
//! server-issued visitor identity. Each implements the corresponding trait
//! from `confab-core`.

pub mod http;
pub mod realtime;
pub mod visitor;

pub use http::HttpChatApi;
pub use realtime::WsConnector;
pub use visitor::FileVisitorStore;
