// src/ingest/output.rs
//! Persistence boundary: one JSON file per successful source.
//!
//! Files are replaced wholesale via temp file + rename, so readers see either
//! the previous run's file or the new one. Failed sources are not touched.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tokio::fs;

use crate::ingest::types::{
    EventSet, GeoEvent, RunOutcome, SeriesValue, SourceKind, SourcePayload, SourceRecordSet,
    TimeSeriesPoint,
};

#[derive(Serialize)]
#[serde(untagged)]
enum CurrentSnapshot<'a> {
    Price {
        #[serde(rename = "currentPrice")]
        current_price: i64,
    },
    Index {
        #[serde(rename = "currentValue")]
        current_value: f64,
    },
    Policy {
        #[serde(rename = "currentRate")]
        current_rate: &'a str,
        #[serde(rename = "currentRealYield")]
        current_real_yield: &'a str,
    },
}

impl<'a> From<&'a SeriesValue> for CurrentSnapshot<'a> {
    fn from(v: &'a SeriesValue) -> Self {
        match v {
            SeriesValue::Price { price } => CurrentSnapshot::Price {
                current_price: *price,
            },
            SeriesValue::Index { value } => CurrentSnapshot::Index {
                current_value: *value,
            },
            SeriesValue::Policy { rate, real_yield } => CurrentSnapshot::Policy {
                current_rate: rate,
                current_real_yield: real_yield,
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SeriesEnvelope<'a> {
    last_updated: String,
    source: &'a str,
    #[serde(flatten)]
    current: CurrentSnapshot<'a>,
    window_size: usize,
    history: &'a [TimeSeriesPoint],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EventsEnvelope<'a> {
    last_updated: String,
    source: &'a str,
    data: &'a [GeoEvent],
}

/// ISO-8601 UTC with milliseconds, e.g. `2024-01-15T06:00:00.000Z`.
pub fn iso_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn render_series(rs: &SourceRecordSet) -> Result<Vec<u8>> {
    let env = SeriesEnvelope {
        last_updated: iso_timestamp(rs.last_updated),
        source: &rs.source,
        current: CurrentSnapshot::from(&rs.current),
        window_size: rs.window_size,
        history: &rs.series,
    };
    serde_json::to_vec_pretty(&env).context("serializing record set")
}

pub fn render_events(es: &EventSet) -> Result<Vec<u8>> {
    let env = EventsEnvelope {
        last_updated: iso_timestamp(es.last_updated),
        source: &es.source,
        data: &es.events,
    };
    serde_json::to_vec_pretty(&env).context("serializing events")
}

pub fn render(payload: &SourcePayload) -> Result<Vec<u8>> {
    match payload {
        SourcePayload::Series(rs) => render_series(rs),
        SourcePayload::Events(es) => render_events(es),
    }
}

pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, kind: SourceKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    /// Write one payload, replacing the previous file atomically.
    pub async fn write(&self, kind: SourceKind, payload: &SourcePayload) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating output dir {}", self.dir.display()))?;

        let mut bytes = render(payload)?;
        bytes.push(b'\n');

        let target = self.path_for(kind);
        let tmp = tmp_path(&target);
        fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        if let Err(e) = fs::rename(&tmp, &target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e).with_context(|| format!("replacing {}", target.display()));
        }
        Ok(target)
    }

    /// Write every successful source. Stops at nothing: each source is
    /// independent, errors are collected.
    pub async fn write_outcome(&self, outcome: &RunOutcome) -> (Vec<PathBuf>, Vec<anyhow::Error>) {
        let mut written = Vec::new();
        let mut errors = Vec::new();
        for (kind, result) in &outcome.per_source {
            let Ok(payload) = result else {
                continue;
            };
            match self.write(*kind, payload).await {
                Ok(p) => {
                    tracing::info!(target: "ingest", source = %kind, path = %p.display(), "published");
                    written.push(p);
                }
                Err(e) => {
                    tracing::error!(target: "ingest", source = %kind, error = %format!("{e:#}"), "publish failed");
                    errors.push(e);
                }
            }
        }
        (written, errors)
    }
}

fn tmp_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    target.with_file_name(name)
}
