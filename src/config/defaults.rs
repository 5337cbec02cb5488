//! Default values for configuration

/// Default hosted inference demo (Gradio space)
pub fn default_inference_base_url() -> String {
    std::env::var("CONTENT_COMPLETER_INFERENCE_URL")
        .unwrap_or_else(|_| "https://qwen-qwq-32b-preview.hf.space".to_string())
}

/// Default read timeout for the whole predict/join/stream exchange, in seconds
pub fn default_inference_timeout() -> u64 {
    60
}

/// Default user agent. The demo rejects obvious non-browser clients.
pub fn default_inference_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36".to_string()
}

/// Gradio function index of the "predict" endpoint
pub fn default_predict_fn_index() -> u32 {
    1
}

/// Gradio function index of the queued chat endpoint
pub fn default_join_fn_index() -> u32 {
    2
}

/// Gradio trigger id sent with both calls
pub fn default_trigger_id() -> u32 {
    5
}

/// Maximum characters of a model-generated title
pub fn default_max_title_length() -> usize {
    100
}

/// Title written to records that have nothing to complete from
pub fn default_default_title() -> String {
    "Untitled Content".to_string()
}

/// Title values treated as "no real title"
pub fn default_placeholder_titles() -> Vec<String> {
    vec![
        "".to_string(),
        "None".to_string(),
        "Untitled Content".to_string(),
    ]
}

/// Minimum similarity for a fuzzy category match
pub fn default_category_match_cutoff() -> f64 {
    0.4
}

/// Number of fuzzy category candidates considered
pub fn default_max_close_matches() -> usize {
    3
}
