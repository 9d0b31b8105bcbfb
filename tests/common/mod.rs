// tests/common/mod.rs
// Shared builders for provider payloads and a fully stubbed pipeline.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use gold_ingest::config::{Credentials, Endpoints, PipelineConfig};
use gold_ingest::ingest::rate_gate::ManualClock;
use gold_ingest::ingest::transport::StubTransport;
use gold_ingest::Pipeline;
use serde_json::{json, Map, Value};

pub const TD: &str = "http://twelvedata.test";
pub const AV: &str = "http://alphavantage.test";
pub const FRED: &str = "http://fred.test";
pub const NEWS: &str = "http://newsapi.test";

/// Newest observation date used by every generated series.
pub fn last_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
}

/// Date `i` days before `last_day()`.
pub fn day_back(i: usize) -> NaiveDate {
    last_day() - chrono::Days::new(i as u64)
}

/// Twelve Data `time_series` body, newest-first, `n` bars.
pub fn twelve_data_body(n: usize, close: impl Fn(usize) -> f64) -> Value {
    let values: Vec<Value> = (0..n)
        .map(|i| {
            json!({
                "datetime": day_back(i).format("%Y-%m-%d").to_string(),
                "open": format!("{:.2}", close(i)),
                "close": format!("{:.2}", close(i)),
            })
        })
        .collect();
    json!({"meta": {"interval": "1day"}, "values": values, "status": "ok"})
}

/// Alpha Vantage `FX_DAILY` body with `n` days; `close(i)` counts back from newest.
pub fn fx_daily_body(n: usize, close: impl Fn(usize) -> f64) -> Value {
    let mut series = Map::new();
    for i in 0..n {
        series.insert(
            day_back(i).format("%Y-%m-%d").to_string(),
            json!({
                "1. open": format!("{:.5}", close(i)),
                "4. close": format!("{:.5}", close(i)),
            }),
        );
    }
    json!({
        "Meta Data": {"1. Information": "Forex Daily Prices (open, high, low, close)"},
        "Time Series FX (Daily)": Value::Object(series),
    })
}

/// FRED observations body, newest-first (`sort_order=desc`).
pub fn fred_body(values: &[&str]) -> Value {
    let obs: Vec<Value> = values
        .iter()
        .enumerate()
        .map(|(i, v)| json!({"date": day_back(i).format("%Y-%m-%d").to_string(), "value": v}))
        .collect();
    json!({"count": obs.len(), "observations": obs})
}

pub fn fixture(name: &str) -> Value {
    let path = format!("tests/fixtures/{name}");
    let text = std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing {path}"));
    serde_json::from_str(&text).expect("fixture json")
}

pub fn config() -> PipelineConfig {
    PipelineConfig {
        endpoints: Endpoints {
            twelve_data: TD.into(),
            alpha_vantage: AV.into(),
            fred: FRED.into(),
            news_api: NEWS.into(),
        },
        ..PipelineConfig::default()
    }
}

pub fn all_credentials() -> Credentials {
    Credentials {
        twelve_data: Some("td-key".into()),
        alpha_vantage: Some("av-key".into()),
        fred: Some("fred-key".into()),
        news_api: Some("news-key".into()),
    }
}

pub fn fx_pairs(t: StubTransport, n: usize) -> StubTransport {
    t.route(&[("from_symbol", "EUR")], fx_daily_body(n, |i| 1.08 + i as f64 * 0.001))
        .route(&[("from_symbol", "USD"), ("to_symbol", "JPY")], fx_daily_body(n, |i| 155.0 - i as f64 * 0.05))
        .route(&[("from_symbol", "GBP")], fx_daily_body(n, |i| 1.27 + i as f64 * 0.001))
        .route(&[("from_symbol", "USD"), ("to_symbol", "CAD")], fx_daily_body(n, |i| 1.36 - i as f64 * 0.0005))
}

/// Every provider answers successfully.
pub fn healthy_transport() -> StubTransport {
    let t = StubTransport::new()
        .route(&[("symbol", "XAU/USD")], twelve_data_body(365, |i| 2330.4 - i as f64))
        .route(&[("symbol", "DXY")], twelve_data_body(365, |i| 105.87 - i as f64 * 0.01))
        .route(&[("from_symbol", "XAU")], fx_daily_body(400, |i| 2329.6 - i as f64))
        .route(&[("series_id", "DFF")], fred_body(&["5.33"; 365]))
        .route(&[("series_id", "DFII10")], fred_body(&["2.1"; 365]))
        .route(&[("sortBy", "publishedAt")], fixture("newsapi_everything.json"));
    fx_pairs(t, 200)
}

pub fn pipeline(
    transport: Arc<StubTransport>,
    creds: &Credentials,
) -> (Pipeline, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let p = Pipeline::from_config(&config(), creds, transport, clock.clone());
    (p, clock)
}

pub fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}
