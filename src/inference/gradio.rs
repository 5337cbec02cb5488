use super::{completed_reply, InferenceClient, LineBuffer, Reply};
use crate::config::InferenceConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, ORIGIN, REFERER, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Client for a Gradio chat demo driven through its queue protocol.
///
/// One prompt is three calls: `run/predict`, `queue/join`, then a
/// server-sent event read of `queue/data` for the session hash. The demo
/// answers on the stream of the session, so prompts must not overlap.
pub struct GradioClient {
    client: Client,
    base_url: Url,
    session_hash: String,
    user_agent: String,
    predict_fn_index: u32,
    join_fn_index: u32,
    trigger_id: u32,
}

impl GradioClient {
    pub fn new(config: &InferenceConfig, session_hash: impl Into<String>) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| Error::Config(format!("Invalid inference base URL: {}", e)))?;
        // Bounds connect, headers and the full streamed body of each call
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            session_hash: session_hash.into(),
            user_agent: config.user_agent.clone(),
            predict_fn_index: config.predict_fn_index,
            join_fn_index: config.join_fn_index,
            trigger_id: config.trigger_id,
        })
    }

    pub fn session_hash(&self) -> &str {
        &self.session_hash
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("Invalid inference endpoint: {}", e)))
    }

    fn origin(&self) -> String {
        self.base_url.as_str().trim_end_matches('/').to_string()
    }

    fn referer(&self) -> String {
        format!("{}/?__theme=system", self.origin())
    }

    fn post_json(&self, path: &str, body: &Value) -> Result<RequestBuilder> {
        let mut url = self.endpoint(path)?;
        url.set_query(Some("__theme=system"));
        Ok(self
            .client
            .post(url)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "*/*")
            .header(ORIGIN, self.origin())
            .header(REFERER, self.referer())
            .json(body))
    }

    fn predict_payload(&self, prompt: &str) -> Value {
        json!({
            "data": [
                {"files": [], "text": prompt},
                [[chat_message(prompt), [chat_message(""), null, null]]],
                null
            ],
            "event_data": null,
            "fn_index": self.predict_fn_index,
            "trigger_id": self.trigger_id,
            "session_hash": self.session_hash,
        })
    }

    fn join_payload(&self, prompt: &str) -> Value {
        json!({
            "data": [[[chat_message(prompt), null]], null, 0],
            "event_data": null,
            "fn_index": self.join_fn_index,
            "trigger_id": self.trigger_id,
            "session_hash": self.session_hash,
        })
    }

    /// Register the prompt with the demo's chat state
    async fn predict(&self, prompt: &str) -> Result<()> {
        let request = self.post_json("/run/predict", &self.predict_payload(prompt))?;
        request.send().await?.error_for_status()?;
        debug!(session = %self.session_hash, "predict accepted");
        Ok(())
    }

    /// Enqueue the generation job for this session
    async fn join_queue(&self, prompt: &str) -> Result<()> {
        let request = self.post_json("/queue/join", &self.join_payload(prompt))?;
        request.send().await?.error_for_status()?;
        debug!(session = %self.session_hash, "queue joined");
        Ok(())
    }

    /// Scan the session's event stream for the completed event
    async fn read_completion(&self) -> Result<Reply> {
        let mut url = self.endpoint("/queue/data")?;
        url.query_pairs_mut()
            .append_pair("session_hash", &self.session_hash);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .header(USER_AGENT, &self.user_agent)
            .header(REFERER, self.referer())
            .send()
            .await?
            .error_for_status()?;

        let mut stream = response.bytes_stream();
        let mut lines = LineBuffer::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for line in lines.push(&chunk) {
                if let Some(text) = completed_reply(&line) {
                    return Ok(Reply::Text(text));
                }
            }
        }

        if let Some(text) = lines.finish().as_deref().and_then(completed_reply) {
            return Ok(Reply::Text(text));
        }

        Ok(Reply::NoAnswer)
    }

    async fn exchange(&self, prompt: &str) -> Result<Reply> {
        self.predict(prompt).await?;
        self.join_queue(prompt).await?;
        self.read_completion().await
    }
}

fn chat_message(text: &str) -> Value {
    json!({
        "id": null,
        "elem_id": null,
        "elem_classes": null,
        "name": null,
        "text": text,
        "flushing": null,
        "avatar": "",
        "files": []
    })
}

#[async_trait]
impl InferenceClient for GradioClient {
    async fn submit_prompt(&self, prompt: &str) -> Reply {
        match self.exchange(prompt).await {
            Ok(Reply::NoAnswer) => {
                warn!(session = %self.session_hash, "Event stream ended without a completed event");
                Reply::NoAnswer
            }
            Ok(reply) => {
                info!(session = %self.session_hash, "Received model reply");
                reply
            }
            Err(e) => {
                warn!(session = %self.session_hash, error = %e, "Network error while getting response");
                Reply::TransportFailure(e.to_string())
            }
        }
    }
}
