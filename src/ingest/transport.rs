// src/ingest/transport.rs
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde_json::Value;

use crate::ingest::error::FetchError;

/// One JSON GET. Providers never see reqwest directly.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, FetchError>;
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gold-ingest/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, FetchError> {
        // API keys ride in the query string; strip the URL from every error.
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.without_url().to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Transport(format!("HTTP {status}")));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.without_url().to_string()))?;
        serde_json::from_str(&body).map_err(|e| FetchError::DataShape(format!("invalid JSON: {e}")))
    }
}

// --- Test helper ---
/// Replays canned responses. A route matches when every listed query pair is
/// present in the request; the first matching route wins.
pub struct StubTransport {
    routes: Vec<(Vec<(String, String)>, Result<Value, FetchError>)>,
    pub calls: Mutex<Vec<String>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self {
            routes: vec![],
            calls: Mutex::new(vec![]),
        }
    }

    pub fn route(mut self, matcher: &[(&str, &str)], body: Value) -> Self {
        self.routes.push((owned(matcher), Ok(body)));
        self
    }

    pub fn fail(mut self, matcher: &[(&str, &str)], err: FetchError) -> Self {
        self.routes.push((owned(matcher), Err(err)));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl Default for StubTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn owned(matcher: &[(&str, &str)]) -> Vec<(String, String)> {
    matcher
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[async_trait]
impl Transport for StubTransport {
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, FetchError> {
        let rendered: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
        self.calls
            .lock()
            .push(format!("{url}?{}", rendered.join("&")));

        let hit = self.routes.iter().find(|(matcher, _)| {
            matcher
                .iter()
                .all(|(mk, mv)| query.iter().any(|(k, v)| k == mk && v == mv))
        });
        match hit {
            Some((_, resp)) => resp.clone(),
            None => Err(FetchError::Transport(format!("no stub route for {url}"))),
        }
    }
}
