// src/ingest/providers/fx_proxy.rs
//! Synthetic dollar-index fallback.
//!
//! Four currency pairs are fetched one by one (each through the gate), aligned
//! newest-first by position up to the shortest series, and combined as
//! `BASE + Σ weight_i * close_i`. All four pairs must return data.

use async_trait::async_trait;

use super::alpha_vantage::{AlphaVantageClient, FxSeries};
use super::SeriesProvider;
use crate::ingest::error::FetchError;
use crate::ingest::normalize::round_index;
use crate::ingest::rate_gate::RateGate;
use crate::ingest::types::{SeriesFetch, SeriesValue, TimeSeriesPoint};

pub const LABEL: &str = "fx-proxy";

pub const BASE_OFFSET: f64 = 100.0;

/// `(from, to, weight)`; the first pair supplies the dates.
pub const PAIR_WEIGHTS: [(&str, &str, f64); 4] = [
    ("EUR", "USD", -28.0),
    ("USD", "JPY", 0.15),
    ("GBP", "USD", -6.0),
    ("USD", "CAD", 14.0),
];

pub struct FxProxyProvider {
    client: AlphaVantageClient,
    window: usize,
}

impl FxProxyProvider {
    pub fn new(client: AlphaVantageClient, window: usize) -> Self {
        Self { client, window }
    }
}

/// Combine aligned pair closes into proxy points, chronological.
///
/// `pairs` must be in `PAIR_WEIGHTS` order, each oldest-first.
pub fn combine(pairs: &[FxSeries], window: usize) -> Result<Vec<TimeSeriesPoint>, FetchError> {
    if pairs.len() != PAIR_WEIGHTS.len() || pairs.iter().any(|p| p.is_empty()) {
        return Err(FetchError::DataShape(format!(
            "{LABEL}: incomplete currency-pair set"
        )));
    }
    let len = pairs
        .iter()
        .map(Vec::len)
        .min()
        .unwrap_or(0)
        .min(window);

    // position i counts back from each series' newest observation
    let mut newest_first = Vec::with_capacity(len);
    for i in 0..len {
        let mut acc = BASE_OFFSET;
        for (series, (_, _, weight)) in pairs.iter().zip(PAIR_WEIGHTS.iter()) {
            let (_, close) = series[series.len() - 1 - i];
            acc += weight * close;
        }
        let date = pairs[0][pairs[0].len() - 1 - i].0;
        newest_first.push(TimeSeriesPoint::new(date, SeriesValue::Index {
            value: round_index(acc),
        }));
    }
    newest_first.reverse();
    Ok(newest_first)
}

#[async_trait]
impl SeriesProvider for FxProxyProvider {
    fn label(&self) -> &'static str {
        LABEL
    }

    async fn fetch_series(&self, gate: &mut RateGate) -> Result<SeriesFetch, FetchError> {
        let mut pairs = Vec::with_capacity(PAIR_WEIGHTS.len());
        for (from, to, _) in PAIR_WEIGHTS {
            match self.client.fx_daily(gate, from, to).await {
                Ok(series) if !series.is_empty() => pairs.push(series),
                Ok(_) => {
                    return Err(FetchError::DataShape(format!(
                        "{LABEL}: {from}/{to} returned no data"
                    )))
                }
                // no key means no pair at all; keep that distinguishable
                Err(e @ FetchError::MissingCredential(_)) => return Err(e),
                Err(e) => {
                    tracing::debug!(target: "ingest", pair = %format!("{from}/{to}"), error = %e, "proxy pair failed");
                    return Err(FetchError::DataShape(format!(
                        "{LABEL}: {from}/{to} unavailable ({e})"
                    )));
                }
            }
        }

        let points = combine(&pairs, self.window)?;
        let current = points
            .last()
            .map(|p| p.value.clone())
            .ok_or_else(|| FetchError::DataShape(format!("{LABEL}: no aligned observations")))?;
        Ok(SeriesFetch { points, current })
    }
}
