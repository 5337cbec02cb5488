//! Hosted inference transport
//!
//! The completion pipeline sees one operation, [`InferenceClient::submit_prompt`],
//! which always returns a [`Reply`]. Network and protocol failures are folded
//! into the reply instead of being returned as errors.

mod events;
mod gradio;

pub use events::*;
pub use gradio::*;

use async_trait::async_trait;
use uuid::Uuid;

/// Outcome of one prompt exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The model's answer, with `<summary>` regions removed
    Text(String),
    /// The event stream ended without a completed event
    NoAnswer,
    /// The exchange failed on the network or with an HTTP error status
    TransportFailure(String),
}

impl std::fmt::Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reply::Text(text) => write!(f, "{}", text),
            Reply::NoAnswer => write!(f, "no answer from model"),
            Reply::TransportFailure(reason) => write!(f, "transport failure: {}", reason),
        }
    }
}

/// Trait for chat-completion transports
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Send a prompt and wait for the single reply
    async fn submit_prompt(&self, prompt: &str) -> Reply;
}

/// Mint a fresh session hash for one run
pub fn new_session_hash() -> String {
    Uuid::new_v4().simple().to_string()
}
