//! Coaching sessions: prompt construction, locked output formats and the
//! multi-turn transcript.

pub mod format;
pub mod handlers;
pub mod prompt_builder;
pub mod prompts;
pub mod session;
pub mod settings;
pub mod store;
