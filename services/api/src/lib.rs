//! Island API Library Crate
//!
//! The web service around the lesson engine: application state, REST
//! handlers for lesson metadata and the AI credential, the WebSocket lesson
//! runner, and routing. The binaries are thin wrappers around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod ws;
