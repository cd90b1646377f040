//! WebSocket Lesson Sessions
//!
//! - `protocol`: Defines the JSON-based message format for client-server communication.
//! - `session`: Runs one lesson per connection, from handshake to termination.

pub mod protocol;
pub mod session;

pub use session::ws_handler;
