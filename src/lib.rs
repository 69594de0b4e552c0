//! Attache - personal AI assistant CLI
//!
//! Routes each line of user input either to a language-model completion or
//! to one of a small set of structured commands (send/list email, add/list
//! calendar events), keeping a bounded window of recent conversation turns
//! as context between runs.

pub mod config;
pub mod conversation;
pub mod core;
pub mod providers;
