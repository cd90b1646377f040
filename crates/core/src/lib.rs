//! Island Core
//!
//! The lesson engine behind the Desert Island Adventure: a scripted,
//! phase-based group chat between a facilitator, six simulated kids and the
//! end-user. [`session::LessonSession`] is the entry point; everything else
//! is the data and services it is built from.

pub mod agenda;
pub mod credential;
pub mod llm_client;
pub mod phase;
pub mod response_bank;
pub mod roster;
pub mod script;
pub mod sequencer;
pub mod session;
pub mod transcript;
