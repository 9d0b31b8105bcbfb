// src/ingest/providers/fred.rs
//! FRED macro-policy client: effective fed funds rate (`DFF`) paired with the
//! 10-year TIPS real yield (`DFII10`). No fallback tier.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{decode, endpoint, gated_get, require_key, SeriesProvider};
use crate::ingest::error::FetchError;
use crate::ingest::normalize::{format_rate, parse_provider_date};
use crate::ingest::rate_gate::RateGate;
use crate::ingest::transport::Transport;
use crate::ingest::types::{SeriesFetch, SeriesValue, TimeSeriesPoint};

pub const LABEL: &str = "fred";
pub const ENV_KEY: &str = "FRED_API_KEY";
pub const RATE_SERIES: &str = "DFF";
pub const REAL_YIELD_SERIES: &str = "DFII10";

/// Raw observations requested per series.
const LIMIT: usize = 365;

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    error_message: Option<String>,
    observations: Option<Vec<Observation>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Observation {
    pub date: String,
    pub value: String,
}

impl Observation {
    pub fn new(date: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            value: value.into(),
        }
    }
}

pub struct FredPolicyProvider {
    transport: Arc<dyn Transport>,
    base_url: String,
    api_key: Option<String>,
    window: usize,
}

impl FredPolicyProvider {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        window: usize,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            api_key,
            window,
        }
    }

    async fn observations(
        &self,
        gate: &mut RateGate,
        key: &str,
        series_id: &str,
    ) -> Result<Vec<Observation>, FetchError> {
        let url = endpoint(&self.base_url, "series/observations");
        let query = [
            ("series_id", series_id.to_string()),
            ("api_key", key.to_string()),
            ("file_type", "json".to_string()),
            ("sort_order", "desc".to_string()),
            ("limit", LIMIT.to_string()),
        ];
        let raw = gated_get(gate, self.transport.as_ref(), LABEL, &url, &query).await?;
        let resp: ObservationsResponse = decode(LABEL, raw)?;
        if let Some(msg) = resp.error_message {
            return Err(FetchError::provider(LABEL, msg));
        }
        resp.observations
            .ok_or_else(|| FetchError::DataShape(format!("{LABEL}: {series_id} missing `observations`")))
    }
}

/// Pair newest-first observations by position, drop any pair where either
/// side is missing, keep the newest `window` pairs, return chronological.
///
/// Series of different lengths are paired from the newest end and the
/// longer one's oldest tail is ignored.
pub fn pair_observations(
    rates: &[Observation],
    yields: &[Observation],
    window: usize,
) -> Vec<TimeSeriesPoint> {
    if rates.len() != yields.len() {
        tracing::warn!(
            target: "ingest",
            rates = rates.len(),
            yields = yields.len(),
            "policy series lengths differ; pairing the newest {} observations",
            rates.len().min(yields.len())
        );
    }

    let mut pairs: Vec<TimeSeriesPoint> = rates
        .iter()
        .zip(yields.iter())
        .filter_map(|(r, y)| {
            let date = parse_provider_date(&r.date)?;
            let rate = format_rate(&r.value)?;
            let real_yield = format_rate(&y.value)?;
            Some(TimeSeriesPoint::new(date, SeriesValue::Policy { rate, real_yield }))
        })
        .take(window)
        .collect();
    pairs.reverse();
    pairs
}

#[async_trait]
impl SeriesProvider for FredPolicyProvider {
    fn label(&self) -> &'static str {
        LABEL
    }

    async fn fetch_series(&self, gate: &mut RateGate) -> Result<SeriesFetch, FetchError> {
        let key = require_key(&self.api_key, ENV_KEY)?;
        let rates = self.observations(gate, key, RATE_SERIES).await?;
        let yields = self.observations(gate, key, REAL_YIELD_SERIES).await?;

        let points = pair_observations(&rates, &yields, self.window);
        let current = points
            .last()
            .map(|p| p.value.clone())
            .ok_or_else(|| FetchError::DataShape(format!("{LABEL}: no complete observation pairs")))?;
        Ok(SeriesFetch { points, current })
    }
}
