// src/ingest/fallback.rs
use chrono::{DateTime, Utc};
use metrics::counter;

use crate::ingest::providers::SeriesProvider;
use crate::ingest::rate_gate::RateGate;
use crate::ingest::types::{ProviderFailure, SourceFailure, SourceKind, SourceRecordSet};

/// Ordered providers for one source, tried until one succeeds.
pub struct FallbackChain {
    source: SourceKind,
    tiers: Vec<Box<dyn SeriesProvider>>,
}

impl FallbackChain {
    pub fn new(source: SourceKind, tiers: Vec<Box<dyn SeriesProvider>>) -> Self {
        Self { source, tiers }
    }

    /// First tier to succeed labels the record set. Every failure is kept so
    /// the summary can say why each tier was passed over.
    pub async fn resolve(
        &self,
        gate: &mut RateGate,
        run_at: DateTime<Utc>,
        window: usize,
    ) -> Result<SourceRecordSet, SourceFailure> {
        let mut attempts = Vec::new();

        for (tier, provider) in self.tiers.iter().enumerate() {
            let label = provider.label();
            match provider.fetch_series(gate).await {
                Ok(fetch) => {
                    if tier > 0 {
                        tracing::info!(target: "ingest", source = %self.source, provider = label, tier, "fallback provider used");
                    }
                    return Ok(SourceRecordSet::new(run_at, label, fetch, window));
                }
                Err(e) => {
                    tracing::warn!(target: "ingest", source = %self.source, provider = label, error = %e, "provider failed");
                    counter!("ingest_fallback_total", "source" => self.source.name()).increment(1);
                    attempts.push(ProviderFailure { provider: label, error: e });
                }
            }
        }

        Err(SourceFailure { attempts })
    }
}
