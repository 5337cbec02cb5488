//! Ask command - send one raw prompt through the inference transport

use super::inference_client;
use crate::config::Config;
use crate::error::Result;
use crate::inference::{InferenceClient, Reply};
use serde::{Deserialize, Serialize};

/// Reply to a raw prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResult {
    pub session_hash: String,
    /// `text`, `no_answer` or `transport_failure`
    pub status: String,
    pub text: Option<String>,
    pub error: Option<String>,
}

/// Submit `prompt` and wait for the reply
pub async fn cmd_ask(config: &Config, prompt: &str, session: Option<String>) -> Result<AskResult> {
    let client = inference_client(config, session)?;
    let session_hash = client.session_hash().to_string();

    let result = match client.submit_prompt(prompt).await {
        Reply::Text(text) => AskResult {
            session_hash,
            status: "text".to_string(),
            text: Some(text),
            error: None,
        },
        Reply::NoAnswer => AskResult {
            session_hash,
            status: "no_answer".to_string(),
            text: None,
            error: None,
        },
        Reply::TransportFailure(reason) => AskResult {
            session_hash,
            status: "transport_failure".to_string(),
            text: None,
            error: Some(reason),
        },
    };
    Ok(result)
}

/// Print the reply to console
pub fn print_ask_result(result: &AskResult) {
    match (&result.text, &result.error) {
        (Some(text), _) => println!("{}", text),
        (None, Some(error)) => eprintln!("✗ Transport failure: {}", error),
        (None, None) => eprintln!("✗ The model returned no answer"),
    }
}
