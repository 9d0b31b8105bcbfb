// src/ingest/pipeline.rs
//! Run orchestrator. Walks the four acquisition tasks in a fixed order with a
//! rate-gate pause between them; a failed task never skips the next one.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};

use crate::config::{Credentials, PipelineConfig};
use crate::ingest::ensure_metrics_described;
use crate::ingest::error::FetchError;
use crate::ingest::fallback::FallbackChain;
use crate::ingest::providers::alpha_vantage::{AlphaVantageClient, AlphaVantageGoldProvider};
use crate::ingest::providers::fred::FredPolicyProvider;
use crate::ingest::providers::fx_proxy::FxProxyProvider;
use crate::ingest::providers::news_api::{self, NewsApiProvider};
use crate::ingest::providers::twelve_data::TwelveDataProvider;
use crate::ingest::providers::EventProvider;
use crate::ingest::rate_gate::{Clock, RateGate};
use crate::ingest::transport::Transport;
use crate::ingest::types::{
    EventSet, RunOutcome, SourceFailure, SourceKind, SourceOutcome, SourcePayload,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    NotStarted,
    FetchingPrice,
    FetchingPolicy,
    FetchingIndex,
    FetchingEvents,
    Summarizing,
    Done,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStage::NotStarted => "not-started",
            RunStage::FetchingPrice => "fetching-price",
            RunStage::FetchingPolicy => "fetching-policy",
            RunStage::FetchingIndex => "fetching-index",
            RunStage::FetchingEvents => "fetching-events",
            RunStage::Summarizing => "summarizing",
            RunStage::Done => "done",
        };
        f.write_str(s)
    }
}

pub struct Pipeline {
    price: FallbackChain,
    policy: FallbackChain,
    index: FallbackChain,
    events: Option<Box<dyn EventProvider>>,
    gate: RateGate,
    task_interval: Duration,
    window: usize,
    stage: RunStage,
}

impl Pipeline {
    pub fn new(
        price: FallbackChain,
        policy: FallbackChain,
        index: FallbackChain,
        events: Option<Box<dyn EventProvider>>,
        gate: RateGate,
        task_interval: Duration,
        window: usize,
    ) -> Self {
        Self {
            price,
            policy,
            index,
            events,
            gate,
            task_interval,
            window,
            stage: RunStage::NotStarted,
        }
    }

    /// Wire the production provider chains.
    pub fn from_config(
        cfg: &PipelineConfig,
        creds: &Credentials,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ep = &cfg.endpoints;
        let window = cfg.window_size;
        let av = AlphaVantageClient::new(
            transport.clone(),
            ep.alpha_vantage.clone(),
            creds.alpha_vantage.clone(),
        );

        let price = FallbackChain::new(
            SourceKind::Price,
            vec![
                Box::new(TwelveDataProvider::gold(
                    transport.clone(),
                    ep.twelve_data.clone(),
                    creds.twelve_data.clone(),
                    window,
                )),
                Box::new(AlphaVantageGoldProvider::new(av.clone(), window)),
            ],
        );
        let policy = FallbackChain::new(
            SourceKind::Policy,
            vec![Box::new(FredPolicyProvider::new(
                transport.clone(),
                ep.fred.clone(),
                creds.fred.clone(),
                window,
            ))],
        );
        let index = FallbackChain::new(
            SourceKind::Index,
            vec![
                Box::new(TwelveDataProvider::dollar_index(
                    transport.clone(),
                    ep.twelve_data.clone(),
                    creds.twelve_data.clone(),
                    window,
                )),
                Box::new(FxProxyProvider::new(av, window)),
            ],
        );
        // optional feature: no key, no task
        let events: Option<Box<dyn EventProvider>> = creds.news_api.as_ref().map(|key| {
            Box::new(NewsApiProvider::new(
                transport.clone(),
                ep.news_api.clone(),
                Some(key.clone()),
                cfg.headline_max_chars,
            )) as Box<dyn EventProvider>
        });

        Self::new(
            price,
            policy,
            index,
            events,
            RateGate::new(clock, cfg.request_interval()),
            cfg.task_interval(),
            window,
        )
    }

    pub fn stage(&self) -> RunStage {
        self.stage
    }

    fn enter(&mut self, stage: RunStage) {
        tracing::debug!(target: "ingest", from = %self.stage, to = %stage, "stage transition");
        self.stage = stage;
    }

    /// Run every task once. Never fails; see [`RunOutcome::overall_success`].
    pub async fn run(&mut self, run_at: DateTime<Utc>) -> RunOutcome {
        ensure_metrics_described();
        let mut per_source: Vec<(SourceKind, SourceOutcome)> = Vec::with_capacity(4);

        self.enter(RunStage::FetchingPrice);
        let price = self
            .price
            .resolve(&mut self.gate, run_at, self.window)
            .await
            .map(SourcePayload::Series);
        per_source.push((SourceKind::Price, price));

        self.gate.wait(self.task_interval).await;
        self.enter(RunStage::FetchingPolicy);
        let policy = self
            .policy
            .resolve(&mut self.gate, run_at, self.window)
            .await
            .map(SourcePayload::Series);
        per_source.push((SourceKind::Policy, policy));

        self.gate.wait(self.task_interval).await;
        self.enter(RunStage::FetchingIndex);
        let index = self
            .index
            .resolve(&mut self.gate, run_at, self.window)
            .await
            .map(SourcePayload::Series);
        per_source.push((SourceKind::Index, index));

        self.enter(RunStage::FetchingEvents);
        let events = match &self.events {
            Some(provider) => {
                self.gate.wait(self.task_interval).await;
                let label = provider.label();
                match provider.fetch_events(&mut self.gate).await {
                    Ok(events) => Ok(SourcePayload::Events(EventSet {
                        last_updated: run_at,
                        source: label.to_string(),
                        events,
                    })),
                    Err(e) => {
                        tracing::warn!(target: "ingest", source = "events", provider = label, error = %e, "provider failed");
                        Err(SourceFailure::single(label, e))
                    }
                }
            }
            None => Err(SourceFailure::single(
                news_api::LABEL,
                FetchError::NotConfigured(format!("{} is not set", news_api::ENV_KEY)),
            )),
        };
        per_source.push((SourceKind::Events, events));

        self.enter(RunStage::Summarizing);
        let outcome = RunOutcome { per_source };
        report(&outcome, run_at);

        self.enter(RunStage::Done);
        outcome
    }
}

fn report(outcome: &RunOutcome, run_at: DateTime<Utc>) {
    for (kind, result) in &outcome.per_source {
        match result {
            Ok(payload) => {
                counter!("ingest_source_success_total", "source" => kind.name()).increment(1);
                tracing::info!(target: "ingest", source = %kind, provider = payload.provenance(), rows = payload.len(), "source ok");
            }
            Err(f) if f.is_not_configured() => {
                tracing::info!(target: "ingest", source = %kind, reason = %f, "source disabled");
            }
            Err(f) => {
                counter!("ingest_source_failure_total", "source" => kind.name()).increment(1);
                tracing::warn!(target: "ingest", source = %kind, reason = %f, "source failed");
            }
        }
    }

    counter!("ingest_runs_total").increment(1);
    gauge!("ingest_pipeline_last_run_ts").set(run_at.timestamp() as f64);

    if outcome.overall_success() {
        tracing::info!(
            target: "ingest",
            succeeded = outcome.succeeded(),
            failed = outcome.failed(),
            "run finished"
        );
    } else {
        tracing::error!(target: "ingest", "run failed: every source failed");
    }
}
