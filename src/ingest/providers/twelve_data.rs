// src/ingest/providers/twelve_data.rs
//! Twelve Data `time_series` client. Primary tier for both the gold price
//! (`XAU/USD`, whole units) and the dollar index (`DXY`, one decimal).
//!
//! The feed returns newest-first; the first bar is the current quote.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{decode, endpoint, gated_get, require_key, SeriesProvider};
use crate::ingest::error::FetchError;
use crate::ingest::normalize::{parse_number, parse_provider_date, round_index, round_price};
use crate::ingest::rate_gate::RateGate;
use crate::ingest::transport::Transport;
use crate::ingest::types::{SeriesFetch, SeriesValue, TimeSeriesPoint};

pub const LABEL: &str = "twelvedata";
pub const ENV_KEY: &str = "TWELVE_DATA_API_KEY";
pub const GOLD_SYMBOL: &str = "XAU/USD";
pub const DOLLAR_INDEX_SYMBOL: &str = "DXY";

/// Raw bars requested per call.
const OUTPUT_SIZE: usize = 365;

#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    status: Option<String>,
    message: Option<String>,
    values: Option<Vec<Bar>>,
}

#[derive(Debug, Deserialize)]
struct Bar {
    datetime: String,
    close: Option<String>,
}

/// How a close is turned into a persisted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    Price,
    Index,
}

impl Quote {
    fn value(self, close: f64) -> SeriesValue {
        match self {
            Quote::Price => SeriesValue::Price {
                price: round_price(close),
            },
            Quote::Index => SeriesValue::Index {
                value: round_index(close),
            },
        }
    }
}

pub struct TwelveDataProvider {
    transport: Arc<dyn Transport>,
    base_url: String,
    api_key: Option<String>,
    symbol: &'static str,
    quote: Quote,
    window: usize,
}

impl TwelveDataProvider {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        symbol: &'static str,
        quote: Quote,
        window: usize,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            api_key,
            symbol,
            quote,
            window,
        }
    }

    pub fn gold(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        window: usize,
    ) -> Self {
        Self::new(transport, base_url, api_key, GOLD_SYMBOL, Quote::Price, window)
    }

    pub fn dollar_index(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        window: usize,
    ) -> Self {
        Self::new(
            transport,
            base_url,
            api_key,
            DOLLAR_INDEX_SYMBOL,
            Quote::Index,
            window,
        )
    }

    fn normalize(&self, resp: TimeSeriesResponse) -> Result<SeriesFetch, FetchError> {
        if resp.status.as_deref() == Some("error") {
            return Err(FetchError::provider(
                LABEL,
                resp.message.unwrap_or_else(|| "unspecified error".into()),
            ));
        }
        let bars = resp
            .values
            .ok_or_else(|| FetchError::DataShape(format!("{LABEL}: missing `values`")))?;

        // newest-first; drop bars whose date or close does not parse
        let newest_first: Vec<TimeSeriesPoint> = bars
            .iter()
            .filter_map(|b| {
                let date = parse_provider_date(&b.datetime)?;
                let close = b.close.as_deref().and_then(parse_number)?;
                Some(TimeSeriesPoint::new(date, self.quote.value(close)))
            })
            .take(self.window)
            .collect();

        let current = newest_first
            .first()
            .map(|p| p.value.clone())
            .ok_or_else(|| FetchError::DataShape(format!("{LABEL}: no usable bars for {}", self.symbol)))?;

        let mut points = newest_first;
        points.reverse();
        Ok(SeriesFetch { points, current })
    }
}

#[async_trait]
impl SeriesProvider for TwelveDataProvider {
    fn label(&self) -> &'static str {
        LABEL
    }

    async fn fetch_series(&self, gate: &mut RateGate) -> Result<SeriesFetch, FetchError> {
        let key = require_key(&self.api_key, ENV_KEY)?;
        let url = endpoint(&self.base_url, "time_series");
        let query = [
            ("symbol", self.symbol.to_string()),
            ("interval", "1day".to_string()),
            ("outputsize", OUTPUT_SIZE.to_string()),
            ("apikey", key.to_string()),
        ];
        let raw = gated_get(gate, self.transport.as_ref(), LABEL, &url, &query).await?;
        self.normalize(decode(LABEL, raw)?)
    }
}
