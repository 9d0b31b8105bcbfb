// src/ingest/providers/mod.rs
pub mod alpha_vantage;
pub mod fred;
pub mod fx_proxy;
pub mod news_api;
pub mod twelve_data;

use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde_json::Value;

use crate::ingest::error::FetchError;
use crate::ingest::rate_gate::RateGate;
use crate::ingest::transport::Transport;
use crate::ingest::types::{GeoEvent, SeriesFetch};

/// One tier of a time-series source (price, policy, index).
#[async_trait]
pub trait SeriesProvider: Send + Sync {
    /// Provenance label written into the record set's `source` field.
    fn label(&self) -> &'static str;

    /// Fetch and normalize. Every outbound request goes through `gate`.
    async fn fetch_series(&self, gate: &mut RateGate) -> Result<SeriesFetch, FetchError>;
}

/// The news path.
#[async_trait]
pub trait EventProvider: Send + Sync {
    fn label(&self) -> &'static str;
    async fn fetch_events(&self, gate: &mut RateGate) -> Result<Vec<GeoEvent>, FetchError>;
}

/// Gated, instrumented GET shared by every client.
pub(crate) async fn gated_get(
    gate: &mut RateGate,
    transport: &dyn Transport,
    provider: &'static str,
    url: &str,
    query: &[(&str, String)],
) -> Result<Value, FetchError> {
    gate.pace().await;

    let t0 = Instant::now();
    let res = transport.get_json(url, query).await;
    gate.record_call();

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_fetch_ms", "provider" => provider).record(ms);
    counter!("ingest_requests_total", "provider" => provider).increment(1);
    if let Err(e) = &res {
        counter!("ingest_provider_errors_total", "provider" => provider, "kind" => e.kind())
            .increment(1);
    }
    res
}

/// Credential or `MissingCredential` naming the unset variable.
pub(crate) fn require_key<'a>(key: &'a Option<String>, env_name: &str) -> Result<&'a str, FetchError> {
    key.as_deref()
        .ok_or_else(|| FetchError::MissingCredential(format!("{env_name} is not set")))
}

/// Join a configured base URL with an API path.
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Decode a provider payload into its typed shape.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    provider: &'static str,
    v: Value,
) -> Result<T, FetchError> {
    serde_json::from_value(v).map_err(|e| FetchError::DataShape(format!("{provider}: {e}")))
}
