// src/ingest/providers/news_api.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use super::{decode, endpoint, gated_get, require_key, EventProvider};
use crate::ingest::classify::classify;
use crate::ingest::error::FetchError;
use crate::ingest::normalize_text;
use crate::ingest::rate_gate::RateGate;
use crate::ingest::transport::Transport;
use crate::ingest::types::GeoEvent;

pub const LABEL: &str = "newsapi";
pub const ENV_KEY: &str = "NEWS_API_KEY";
pub const QUERY: &str = r#"gold OR "safe haven" OR geopolitical OR sanctions OR war"#;
pub const MAX_ARTICLES: usize = 20;

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    status: Option<String>,
    message: Option<String>,
    articles: Option<Vec<Article>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
}

/// Publication instant plus its UTC calendar day.
fn published_day(ts: &str) -> Option<(i64, NaiveDate)> {
    let dt = DateTime::parse_from_rfc3339(ts).ok()?.with_timezone(&Utc);
    Some((dt.timestamp(), dt.date_naive()))
}

/// Keep at most `max_chars` characters, never splitting a code point.
pub fn truncate_headline(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let cut: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", cut.trim_end())
}

pub struct NewsApiProvider {
    transport: Arc<dyn Transport>,
    base_url: String,
    api_key: Option<String>,
    headline_max_chars: usize,
}

impl NewsApiProvider {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        headline_max_chars: usize,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            api_key,
            headline_max_chars,
        }
    }

    fn normalize(&self, resp: EverythingResponse) -> Result<Vec<GeoEvent>, FetchError> {
        if resp.status.as_deref() == Some("error") {
            return Err(FetchError::provider(
                LABEL,
                resp.message.unwrap_or_else(|| "unspecified error".into()),
            ));
        }
        let articles = resp
            .articles
            .ok_or_else(|| FetchError::DataShape(format!("{LABEL}: missing `articles`")))?;

        let mut dated: Vec<(i64, GeoEvent)> = Vec::with_capacity(articles.len());
        for a in articles {
            let title = normalize_text(a.title.as_deref().unwrap_or_default());
            // NewsAPI blanks out takedowns as "[Removed]"
            if title.is_empty() || title == "[Removed]" {
                continue;
            }
            let Some((ts, date)) = a.published_at.as_deref().and_then(published_day) else {
                continue;
            };
            let summary = normalize_text(a.description.as_deref().unwrap_or_default());
            let (severity, impact) = classify(&title, &summary);
            dated.push((
                ts,
                GeoEvent {
                    date,
                    headline: truncate_headline(&title, self.headline_max_chars),
                    severity,
                    impact,
                    link: a.url.unwrap_or_default(),
                },
            ));
        }

        // newest first, stable for equal timestamps
        dated.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(dated
            .into_iter()
            .take(MAX_ARTICLES)
            .map(|(_, ev)| ev)
            .collect())
    }
}

#[async_trait]
impl EventProvider for NewsApiProvider {
    fn label(&self) -> &'static str {
        LABEL
    }

    async fn fetch_events(&self, gate: &mut RateGate) -> Result<Vec<GeoEvent>, FetchError> {
        let key = require_key(&self.api_key, ENV_KEY)?;
        let url = endpoint(&self.base_url, "everything");
        let query = [
            ("q", QUERY.to_string()),
            ("sortBy", "publishedAt".to_string()),
            ("language", "en".to_string()),
            ("pageSize", MAX_ARTICLES.to_string()),
            ("apiKey", key.to_string()),
        ];
        let raw = gated_get(gate, self.transport.as_ref(), LABEL, &url, &query).await?;
        self.normalize(decode(LABEL, raw)?)
    }
}
