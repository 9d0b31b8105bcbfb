// src/ingest/providers/alpha_vantage.rs
//! Alpha Vantage `FX_DAILY`. Fallback tier for the gold price and the raw
//! material of the dollar-index proxy.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use super::{decode, endpoint, gated_get, require_key, SeriesProvider};
use crate::ingest::error::FetchError;
use crate::ingest::normalize::{parse_number, parse_provider_date, round_price};
use crate::ingest::rate_gate::RateGate;
use crate::ingest::transport::Transport;
use crate::ingest::types::{SeriesFetch, SeriesValue, TimeSeriesPoint};

pub const LABEL: &str = "alphavantage";
pub const ENV_KEY: &str = "ALPHA_VANTAGE_API_KEY";

#[derive(Debug, Deserialize)]
struct FxDailyResponse {
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    // throttling notices come back with HTTP 200
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
    #[serde(rename = "Time Series FX (Daily)")]
    series: Option<BTreeMap<String, FxBar>>,
}

#[derive(Debug, Deserialize)]
struct FxBar {
    #[serde(rename = "4. close")]
    close: Option<String>,
}

/// Daily closes for one currency pair, oldest first.
pub type FxSeries = Vec<(NaiveDate, f64)>;

/// Alpha Vantage connection shared by the gold fallback and the proxy.
#[derive(Clone)]
pub struct AlphaVantageClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    api_key: Option<String>,
}

impl AlphaVantageClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            api_key,
        }
    }

    /// Full daily history for `from/to`, chronological, incomplete rows dropped.
    pub async fn fx_daily(
        &self,
        gate: &mut RateGate,
        from: &str,
        to: &str,
    ) -> Result<FxSeries, FetchError> {
        let key = require_key(&self.api_key, ENV_KEY)?;
        let url = endpoint(&self.base_url, "query");
        let query = [
            ("function", "FX_DAILY".to_string()),
            ("from_symbol", from.to_string()),
            ("to_symbol", to.to_string()),
            ("outputsize", "full".to_string()),
            ("apikey", key.to_string()),
        ];
        let raw = gated_get(gate, self.transport.as_ref(), LABEL, &url, &query).await?;
        parse_fx_daily(decode(LABEL, raw)?)
    }
}

fn parse_fx_daily(resp: FxDailyResponse) -> Result<FxSeries, FetchError> {
    if let Some(msg) = resp.error_message.or(resp.note).or(resp.information) {
        return Err(FetchError::provider(LABEL, msg));
    }
    let raw = resp.series.ok_or_else(|| {
        FetchError::DataShape(format!("{LABEL}: missing `Time Series FX (Daily)`"))
    })?;

    // re-key by parsed date so ordering never depends on map key text
    let by_date: BTreeMap<NaiveDate, f64> = raw
        .iter()
        .filter_map(|(d, bar)| {
            let date = parse_provider_date(d)?;
            let close = bar.close.as_deref().and_then(parse_number)?;
            Some((date, close))
        })
        .collect();
    Ok(by_date.into_iter().collect())
}

/// Gold fallback: XAU/USD as an FX pair. No separate quote field, so the
/// current price is the newest point.
pub struct AlphaVantageGoldProvider {
    client: AlphaVantageClient,
    window: usize,
}

impl AlphaVantageGoldProvider {
    pub fn new(client: AlphaVantageClient, window: usize) -> Self {
        Self { client, window }
    }
}

#[async_trait]
impl SeriesProvider for AlphaVantageGoldProvider {
    fn label(&self) -> &'static str {
        LABEL
    }

    async fn fetch_series(&self, gate: &mut RateGate) -> Result<SeriesFetch, FetchError> {
        let closes = self.client.fx_daily(gate, "XAU", "USD").await?;
        let start = closes.len().saturating_sub(self.window);
        let points: Vec<TimeSeriesPoint> = closes[start..]
            .iter()
            .map(|(d, c)| {
                TimeSeriesPoint::new(*d, SeriesValue::Price {
                    price: round_price(*c),
                })
            })
            .collect();
        let current = points
            .last()
            .map(|p| p.value.clone())
            .ok_or_else(|| FetchError::DataShape(format!("{LABEL}: empty XAU/USD series")))?;
        Ok(SeriesFetch { points, current })
    }
}
