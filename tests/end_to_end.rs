//! Full completion runs against a mocked Gradio space and a SQLite database

use content_completer::commands::{cmd_run, cmd_status, RunCommandOptions};
use content_completer::completer::{run_batch, RunOptions};
use content_completer::inference::GradioClient;
use content_completer::store::{ContentStore, SqliteContentStore};
use content_completer::{Config, Error};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const SESSION: &str = "e2e-session";

/// Answers each `queue/data` read with the next scripted reply
struct ScriptedStream {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedStream {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
        }
    }
}

impl Respond for ScriptedStream {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let body = match self.replies.lock().unwrap().pop_front() {
            Some(reply) => {
                let event = json!({
                    "msg": "process_completed",
                    "output": {"data": [[[{"text": "prompt"}, [{"text": reply}, null, null]]], null]},
                    "success": true
                });
                format!(
                    "data: {{\"msg\": \"estimation\", \"rank\": 0}}\n\ndata: {}\n\n",
                    event
                )
            }
            None => "data: {\"msg\": \"heartbeat\"}\n\n".to_string(),
        };
        ResponseTemplate::new(200).set_body_raw(body.into_bytes(), "text/event-stream")
    }
}

async fn mount_space(server: &MockServer, replies: &[&str]) {
    Mock::given(method("POST"))
        .and(path("/run/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/queue/join"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"event_id": "e"})))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/queue/data"))
        .and(query_param("session_hash", SESSION))
        .respond_with(ScriptedStream::new(replies))
        .mount(server)
        .await;
}

fn test_config(tmp: &TempDir, server: &MockServer) -> Config {
    let mut config = Config::default();
    config.init_paths(Some(tmp.path().to_path_buf()));
    config.inference.base_url = server.uri();
    config.inference.timeout_secs = 5;
    config.inference.session_hash = Some(SESSION.to_string());
    config
}

#[tokio::test]
async fn test_batch_run_completes_every_pass() {
    let server = MockServer::start().await;
    mount_space(
        &server,
        &[
            // missing title pass
            "Thinking about it... Final Output {\"Title\": \"Renewable Energy Trends\", \"Description\": \"ignored\", \"Category\": \"Energy\"}",
            // missing description pass
            "{\"Title\": \"ignored\", \"Description\": \"How photovoltaic panels turn light into power.\", \"Category\": \"energy\"}",
            // placeholder title pass
            "<summary>draft {\"Title\": \"x\"}</summary>```json\n{\"Title\": \"Stretching for Runners\", \"Category\": \"Health\"}\n```",
        ],
    )
    .await;

    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp, &server);

    let store = SqliteContentStore::connect(&config).await.unwrap();
    store.insert_category("Technology").await.unwrap();
    let health = store.insert_category("Health").await.unwrap();
    let article = store
        .insert_content(None, Some("An article about renewable energy trends"), None)
        .await
        .unwrap();
    let empty = store.insert_content(None, None, None).await.unwrap();
    let solar = store
        .insert_content(Some("Solar Panels"), None, None)
        .await
        .unwrap();
    let stretching = store
        .insert_content(Some("None"), Some("Stretching routines for runners"), None)
        .await
        .unwrap();
    let done = store
        .insert_content(Some("Done"), Some("Already complete"), None)
        .await
        .unwrap();
    store.close().await;

    let stats = cmd_run(&config, RunCommandOptions::default()).await.unwrap();

    assert_eq!(stats.records_selected, 4);
    assert_eq!(stats.records_updated, 3);
    assert_eq!(stats.records_defaulted, 1);
    assert_eq!(stats.records_failed, 0);
    assert_eq!(stats.categories_created, 1);
    assert!(stats.errors.is_empty());

    let store = SqliteContentStore::connect(&config).await.unwrap();
    let categories = store.select_categories().await.unwrap();
    assert_eq!(categories.len(), 3);
    let energy = categories.iter().find(|c| c.title == "Energy").unwrap().id;

    let record = store.get_content(article).await.unwrap().unwrap();
    assert_eq!(record.title.as_deref(), Some("Renewable Energy Trends"));
    assert_eq!(
        record.description.as_deref(),
        Some("An article about renewable energy trends")
    );
    assert_eq!(record.category_id, Some(energy));
    assert!(record.complete_datetime.is_some());

    let record = store.get_content(empty).await.unwrap().unwrap();
    assert_eq!(record.title.as_deref(), Some("Untitled Content"));
    assert_eq!(record.description, None);
    assert_eq!(record.category_id, None);

    let record = store.get_content(solar).await.unwrap().unwrap();
    assert_eq!(record.title.as_deref(), Some("Solar Panels"));
    assert_eq!(
        record.description.as_deref(),
        Some("How photovoltaic panels turn light into power.")
    );
    assert_eq!(record.category_id, Some(energy));

    let record = store.get_content(stretching).await.unwrap().unwrap();
    assert_eq!(record.title.as_deref(), Some("Stretching for Runners"));
    assert_eq!(record.category_id, Some(health));

    let record = store.get_content(done).await.unwrap().unwrap();
    assert_eq!(record.title.as_deref(), Some("Done"));
    assert!(record.complete_datetime.is_none());
    store.close().await;

    let status = cmd_status(&config).await.unwrap();
    assert_eq!(status.counts.pending(), 0);
    assert_eq!(status.counts.total_content, 5);
}

#[tokio::test]
async fn test_unreachable_model_leaves_database_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run/predict"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp, &server);

    let store = SqliteContentStore::connect(&config).await.unwrap();
    let id = store
        .insert_content(None, Some("Notes on sourdough starters"), None)
        .await
        .unwrap();
    store.close().await;

    let stats = cmd_run(&config, RunCommandOptions::default()).await.unwrap();
    assert_eq!(stats.records_failed, 1);
    assert_eq!(stats.records_updated, 0);

    let store = SqliteContentStore::connect(&config).await.unwrap();
    let record = store.get_content(id).await.unwrap().unwrap();
    assert_eq!(record.title, None);
    assert!(record.complete_datetime.is_none());
    assert!(store.select_categories().await.unwrap().is_empty());
    store.close().await;
}

#[tokio::test]
async fn test_snapshot_failure_aborts_run() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp, &server);

    let store = SqliteContentStore::connect(&config).await.unwrap();
    store.close().await;

    let client = GradioClient::new(&config.inference, SESSION).unwrap();
    let result = run_batch(&store, &client, &config.completion, &RunOptions::default()).await;
    assert!(matches!(result, Err(Error::Database(_))));
}

#[tokio::test]
async fn test_run_requires_initialized_database() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp, &server);

    let result = cmd_run(&config, RunCommandOptions::default()).await;
    assert!(matches!(result, Err(Error::NotInitialized)));
}
