//! Conversational turn processing for tabletalk.
//!
//! Each incoming user turn is classified by the [`router::IntentRouter`] into
//! one of three routes and dispatched to the matching strategy: a fixed
//! refusal for out-of-domain input, free-form streamed chat, or the
//! build/execute/interpret SQL answering pipeline. The [`agent::Agent`]
//! coordinates a turn end to end: it checks the session history out of the
//! store, streams the strategy's output to the caller while accumulating it,
//! appends the turn's Human/AI pair, and checks the history back in.

pub mod agent;
pub mod config;
pub mod prompts;
pub mod router;
pub mod strategy;

#[cfg(test)]
mod agent_tests;
#[cfg(test)]
pub mod test_utils;

pub use agent::Agent;
pub use config::{Config, ConfigError};
pub use prompts::Prompts;
pub use router::{IntentRouter, Route};
