// tests/pipeline_run.rs
mod common;

use std::sync::Arc;

use chrono::Utc;
use common::*;
use gold_ingest::ingest::error::FetchError;
use gold_ingest::ingest::pipeline::RunStage;
use gold_ingest::ingest::transport::StubTransport;
use gold_ingest::ingest::types::{Impact, Severity, SourceKind, SourcePayload};

fn provenance(outcome: &gold_ingest::RunOutcome, kind: SourceKind) -> Option<String> {
    outcome
        .get(kind)
        .and_then(|o| o.as_ref().ok())
        .map(|p| p.provenance().to_string())
}

#[tokio::test]
async fn healthy_run_uses_every_primary() {
    let t = Arc::new(healthy_transport());
    let (mut p, clock) = pipeline(t.clone(), &all_credentials());

    let outcome = p.run(Utc::now()).await;

    assert_eq!(outcome.succeeded(), 4);
    assert!(outcome.overall_success());
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(provenance(&outcome, SourceKind::Price).as_deref(), Some("twelvedata"));
    assert_eq!(provenance(&outcome, SourceKind::Policy).as_deref(), Some("fred"));
    assert_eq!(provenance(&outcome, SourceKind::Index).as_deref(), Some("twelvedata"));
    assert_eq!(provenance(&outcome, SourceKind::Events).as_deref(), Some("newsapi"));
    assert_eq!(p.stage(), RunStage::Done);

    // price, DFF, DFII10, DXY, news
    assert_eq!(t.call_count(), 5);
    // task pause, FRED inter-request pause, two more task pauses
    assert_eq!(clock.slept(), vec![ms(2000), ms(1000), ms(2000), ms(2000)]);
}

#[tokio::test]
async fn primary_price_failure_is_labelled_with_fallback() {
    let t = StubTransport::new()
        .fail(&[("symbol", "XAU/USD")], FetchError::Transport("connection reset".into()));
    let t = Arc::new(t.route(&[("from_symbol", "XAU")], fx_daily_body(400, |i| 2300.0 - i as f64)));
    let (mut p, _clock) = pipeline(t, &all_credentials());

    let outcome = p.run(Utc::now()).await;

    assert_eq!(provenance(&outcome, SourceKind::Price).as_deref(), Some("alphavantage"));
    match outcome.get(SourceKind::Price) {
        Some(Ok(SourcePayload::Series(rs))) => {
            assert_eq!(rs.series.len(), 180);
            assert_eq!(rs.series.last().map(|p| p.date), Some(last_day()));
        }
        other => panic!("expected price series, got {other:?}"),
    }
}

#[tokio::test]
async fn all_sources_failing_is_overall_failure() {
    let t = Arc::new(StubTransport::new());
    let (mut p, _clock) = pipeline(t, &all_credentials());

    let outcome = p.run(Utc::now()).await;

    assert_eq!(outcome.succeeded(), 0);
    assert!(!outcome.overall_success());
    assert_eq!(outcome.exit_code(), 1);
    // both price tiers were attempted
    let price = outcome.get(SourceKind::Price).unwrap().as_ref().unwrap_err();
    let tried: Vec<_> = price.attempts.iter().map(|a| a.provider).collect();
    assert_eq!(tried, vec!["twelvedata", "alphavantage"]);
}

#[tokio::test]
async fn one_source_is_enough_for_success() {
    let t = Arc::new(
        StubTransport::new()
            .route(&[("series_id", "DFF")], fred_body(&["5.33", "5.33", "5.32"]))
            .route(&[("series_id", "DFII10")], fred_body(&["2.05", "2.10", "2.08"])),
    );
    let (mut p, _clock) = pipeline(t, &all_credentials());

    let outcome = p.run(Utc::now()).await;

    assert_eq!(outcome.succeeded(), 1);
    assert!(outcome.overall_success());
    assert_eq!(outcome.exit_code(), 0);
    assert!(outcome.get(SourceKind::Policy).unwrap().is_ok());
}

#[tokio::test]
async fn missing_news_key_skips_the_event_task() {
    let t = Arc::new(healthy_transport());
    let creds = gold_ingest::Credentials {
        news_api: None,
        ..all_credentials()
    };
    let (mut p, clock) = pipeline(t.clone(), &creds);

    let outcome = p.run(Utc::now()).await;

    let events = outcome.get(SourceKind::Events).unwrap().as_ref().unwrap_err();
    assert!(events.is_not_configured());
    assert_eq!(outcome.succeeded(), 3);
    assert!(t.calls.lock().iter().all(|c| !c.starts_with(NEWS)));
    // no pause before a task that makes no request
    assert_eq!(clock.slept(), vec![ms(2000), ms(1000), ms(2000)]);
    assert!(outcome
        .summary_lines()
        .iter()
        .any(|l| l.contains("SKIPPED") && l.contains("events")));
}

#[tokio::test]
async fn missing_primary_key_goes_straight_to_fallback() {
    let t = Arc::new(healthy_transport());
    let creds = gold_ingest::Credentials {
        twelve_data: None,
        ..all_credentials()
    };
    let (mut p, _clock) = pipeline(t.clone(), &creds);

    let outcome = p.run(Utc::now()).await;

    assert_eq!(provenance(&outcome, SourceKind::Price).as_deref(), Some("alphavantage"));
    assert_eq!(provenance(&outcome, SourceKind::Index).as_deref(), Some("fx-proxy"));
    assert!(t.calls.lock().iter().all(|c| !c.starts_with(TD)));
}

#[tokio::test]
async fn events_are_classified_and_newest_first() {
    let t = Arc::new(healthy_transport());
    let (mut p, _clock) = pipeline(t, &all_credentials());

    let outcome = p.run(Utc::now()).await;

    let Some(Ok(SourcePayload::Events(set))) = outcome.get(SourceKind::Events) else {
        panic!("events missing");
    };
    assert_eq!(set.events.len(), 3);
    assert_eq!(set.events[0].headline, "War breaks out, gold rises");
    assert_eq!(set.events[0].severity, Severity::High);
    assert_eq!(set.events[0].impact, Impact::Positive);
    assert_eq!(set.events[1].severity, Severity::Medium);
    assert_eq!(set.events[1].impact, Impact::Positive);
    assert_eq!(set.events[2].severity, Severity::Low);
    assert_eq!(set.events[2].impact, Impact::Negative);
}

#[tokio::test]
async fn error_payload_on_primary_index_falls_back_to_proxy() {
    let t = fx_pairs(
        StubTransport::new().route(&[("symbol", "DXY")], fixture("twelvedata_error.json")),
        200,
    );
    let (mut p, clock) = pipeline(Arc::new(t), &all_credentials());

    let outcome = p.run(Utc::now()).await;

    assert_eq!(provenance(&outcome, SourceKind::Index).as_deref(), Some("fx-proxy"));
    match outcome.get(SourceKind::Index) {
        Some(Ok(SourcePayload::Series(rs))) => assert_eq!(rs.series.len(), 180),
        other => panic!("expected index series, got {other:?}"),
    }
    // four pair calls after the failed primary, 1s apart
    let pair_pauses = clock.slept().iter().filter(|d| **d == ms(1000)).count();
    assert!(pair_pauses >= 4);
}

#[tokio::test]
async fn missing_required_key_is_a_failure_not_a_skip() {
    let t = Arc::new(healthy_transport());
    let creds = gold_ingest::Credentials {
        fred: None,
        ..all_credentials()
    };
    let (mut p, _clock) = pipeline(t.clone(), &creds);

    let outcome = p.run(Utc::now()).await;

    let policy = outcome.get(SourceKind::Policy).unwrap().as_ref().unwrap_err();
    assert!(!policy.is_not_configured());
    assert!(matches!(policy.attempts[0].error, FetchError::MissingCredential(_)));
    assert!(t.calls.lock().iter().all(|c| !c.starts_with(FRED)));
    let lines = outcome.summary_lines();
    assert!(lines
        .iter()
        .any(|l| l.contains("FAIL") && l.contains("policy") && l.contains("FRED_API_KEY")));
    assert!(!lines.iter().any(|l| l.contains("SKIPPED")));
}
