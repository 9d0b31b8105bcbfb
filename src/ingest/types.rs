// src/ingest/types.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, Serializer};

use crate::ingest::error::FetchError;
use crate::ingest::normalize::format_date;

/// Fixed cap on retained history per record set.
pub const WINDOW_SIZE: usize = 180;

/// One of the four independent data categories a run acquires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceKind {
    Price,
    Policy,
    Index,
    Events,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Price,
        SourceKind::Policy,
        SourceKind::Index,
        SourceKind::Events,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SourceKind::Price => "price",
            SourceKind::Policy => "policy",
            SourceKind::Index => "index",
            SourceKind::Events => "events",
        }
    }

    /// File the persistence boundary publishes this source under.
    pub fn file_name(self) -> &'static str {
        match self {
            SourceKind::Price => "gold-price.json",
            SourceKind::Policy => "fed-policy.json",
            SourceKind::Index => "dollar-index.json",
            SourceKind::Events => "geo-events.json",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Normalized value(s) for one date. Serialized flat into a history row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SeriesValue {
    /// Spot price, rounded to a whole unit.
    Price { price: i64 },
    /// Index level, one decimal place.
    Index { value: f64 },
    /// Short-term policy rate and real yield, kept as two-decimal text.
    Policy {
        rate: String,
        #[serde(rename = "realYield")]
        real_yield: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    #[serde(serialize_with = "serialize_day")]
    pub date: NaiveDate,
    #[serde(flatten)]
    pub value: SeriesValue,
}

impl TimeSeriesPoint {
    pub fn new(date: NaiveDate, value: SeriesValue) -> Self {
        Self { date, value }
    }
}

/// What one provider tier hands back on success.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesFetch {
    pub points: Vec<TimeSeriesPoint>,
    pub current: SeriesValue,
}

/// Normalized, windowed output for one source for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecordSet {
    pub last_updated: DateTime<Utc>,
    pub source: String,
    pub current: SeriesValue,
    pub series: Vec<TimeSeriesPoint>,
    pub window_size: usize,
}

impl SourceRecordSet {
    /// Build a record set: dates sorted ascending and unique (last one wins),
    /// history capped to the newest `window_size` points.
    pub fn new(
        last_updated: DateTime<Utc>,
        source: impl Into<String>,
        fetch: SeriesFetch,
        window_size: usize,
    ) -> Self {
        let mut series = fetch.points;
        series.sort_by_key(|p| p.date);
        // keep the later duplicate: reverse, dedup keeps first, reverse back
        series.reverse();
        series.dedup_by_key(|p| p.date);
        series.reverse();
        if series.len() > window_size {
            let excess = series.len() - window_size;
            series.drain(0..excess);
        }
        Self {
            last_updated,
            source: source.into(),
            current: fetch.current,
            series,
            window_size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeoEvent {
    #[serde(serialize_with = "serialize_day")]
    pub date: NaiveDate,
    pub headline: String,
    pub severity: Severity,
    pub impact: Impact,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventSet {
    pub last_updated: DateTime<Utc>,
    pub source: String,
    pub events: Vec<GeoEvent>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourcePayload {
    Series(SourceRecordSet),
    Events(EventSet),
}

impl SourcePayload {
    pub fn provenance(&self) -> &str {
        match self {
            SourcePayload::Series(s) => &s.source,
            SourcePayload::Events(e) => &e.source,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SourcePayload::Series(s) => s.series.len(),
            SourcePayload::Events(e) => e.events.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderFailure {
    pub provider: &'static str,
    pub error: FetchError,
}

/// Every tier of a source's chain failed.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFailure {
    pub attempts: Vec<ProviderFailure>,
}

impl SourceFailure {
    pub fn single(provider: &'static str, error: FetchError) -> Self {
        Self {
            attempts: vec![ProviderFailure { provider, error }],
        }
    }

    /// True only for the optional events gate; a missing required key is a failure.
    pub fn is_not_configured(&self) -> bool {
        !self.attempts.is_empty() && self.attempts.iter().all(|a| a.error.is_not_configured())
    }
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .attempts
            .iter()
            .map(|a| format!("{}: {}", a.provider, a.error))
            .collect();
        if parts.is_empty() {
            f.write_str("no providers")
        } else {
            f.write_str(&parts.join("; "))
        }
    }
}

pub type SourceOutcome = Result<SourcePayload, SourceFailure>;

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub per_source: Vec<(SourceKind, SourceOutcome)>,
}

impl RunOutcome {
    pub fn get(&self, kind: SourceKind) -> Option<&SourceOutcome> {
        self.per_source
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, o)| o)
    }

    pub fn succeeded(&self) -> usize {
        self.per_source.iter().filter(|(_, o)| o.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.per_source.len() - self.succeeded()
    }

    /// False only when every source failed.
    pub fn overall_success(&self) -> bool {
        self.succeeded() > 0
    }

    pub fn exit_code(&self) -> i32 {
        if self.overall_success() {
            0
        } else {
            1
        }
    }

    /// Human-readable per-source lines for the end-of-run report.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .per_source
            .iter()
            .map(|(kind, outcome)| match outcome {
                Ok(p) => format!("  OK      {kind:<7} {} ({} rows)", p.provenance(), p.len()),
                Err(f) if f.is_not_configured() => format!("  SKIPPED {kind:<7} {f}"),
                Err(f) => format!("  FAIL    {kind:<7} {f}"),
            })
            .collect();
        lines.push(format!(
            "{}/{} sources succeeded, {} failed",
            self.succeeded(),
            self.per_source.len(),
            self.failed()
        ));
        lines
    }
}

fn serialize_day<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_date(*date))
}
