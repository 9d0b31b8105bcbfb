// tests/output_files.rs
mod common;

use std::fs;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use common::*;
use gold_ingest::ingest::transport::StubTransport;
use gold_ingest::{OutputWriter, SourceKind};
use serde_json::Value;

fn without_timestamp(bytes: &[u8]) -> Value {
    let mut v: Value = serde_json::from_slice(bytes).unwrap();
    v.as_object_mut().unwrap().remove("lastUpdated");
    v
}

#[tokio::test]
async fn identical_upstream_gives_identical_files_except_timestamp() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();

    let t1 = Utc.with_ymd_and_hms(2024, 6, 28, 6, 0, 0).unwrap();
    let t2 = Utc.with_ymd_and_hms(2024, 6, 29, 6, 0, 0).unwrap();

    let (mut p, _) = pipeline(Arc::new(healthy_transport()), &all_credentials());
    let first = p.run(t1).await;
    let (written_a, errs) = OutputWriter::new(dir_a.path()).write_outcome(&first).await;
    assert!(errs.is_empty());
    assert_eq!(written_a.len(), 4);

    let (mut p, _) = pipeline(Arc::new(healthy_transport()), &all_credentials());
    let second = p.run(t2).await;
    OutputWriter::new(dir_b.path()).write_outcome(&second).await;

    for kind in SourceKind::ALL {
        let a = fs::read(dir_a.path().join(kind.file_name())).unwrap();
        let b = fs::read(dir_b.path().join(kind.file_name())).unwrap();
        assert_ne!(a, b, "{kind}: lastUpdated should differ");
        assert_eq!(without_timestamp(&a), without_timestamp(&b), "{kind}");

        // byte-identical once the timestamp line is swapped back
        let a_text = String::from_utf8(a).unwrap();
        let b_text = String::from_utf8(b).unwrap();
        assert_eq!(
            a_text.replace("2024-06-28T06:00:00.000Z", "T"),
            b_text.replace("2024-06-29T06:00:00.000Z", "T"),
        );
    }
}

#[tokio::test]
async fn failed_source_leaves_previous_file_alone() {
    let dir = tempfile::tempdir().unwrap();
    let writer = OutputWriter::new(dir.path());

    let (mut p, _) = pipeline(Arc::new(healthy_transport()), &all_credentials());
    let good = p.run(Utc::now()).await;
    writer.write_outcome(&good).await;
    let before = fs::read(writer.path_for(SourceKind::Policy)).unwrap();

    // next run: FRED is down, everything else healthy
    let t = StubTransport::new()
        .route(&[("series_id", "DFF")], fixture("fred_error.json"))
        .route(&[("symbol", "XAU/USD")], twelve_data_body(365, |i| 2400.0 - i as f64));
    let (mut p, _) = pipeline(Arc::new(t), &all_credentials());
    let partial = p.run(Utc::now()).await;
    assert!(partial.get(SourceKind::Policy).unwrap().is_err());
    let (written, _) = writer.write_outcome(&partial).await;

    assert_eq!(written, vec![writer.path_for(SourceKind::Price)]);
    assert_eq!(fs::read(writer.path_for(SourceKind::Policy)).unwrap(), before);
    // no temp files left behind
    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .flatten()
        .filter(|e| e.path().extension().is_some_and(|x| x == "tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn published_price_file_has_expected_envelope() {
    let dir = tempfile::tempdir().unwrap();
    let (mut p, _) = pipeline(Arc::new(healthy_transport()), &all_credentials());
    let run_at = Utc.with_ymd_and_hms(2024, 6, 28, 6, 0, 0).unwrap();
    let outcome = p.run(run_at).await;
    OutputWriter::new(dir.path()).write_outcome(&outcome).await;

    let v: Value =
        serde_json::from_slice(&fs::read(dir.path().join("gold-price.json")).unwrap()).unwrap();
    assert_eq!(v["lastUpdated"], "2024-06-28T06:00:00.000Z");
    assert_eq!(v["source"], "twelvedata");
    assert_eq!(v["currentPrice"], 2330);
    assert_eq!(v["windowSize"], 180);
    let history = v["history"].as_array().unwrap();
    assert_eq!(history.len(), 180);
    assert_eq!(history[179]["date"], "Jun 28, 2024");
    assert_eq!(history[179]["price"], 2330);

    let idx: Value =
        serde_json::from_slice(&fs::read(dir.path().join("dollar-index.json")).unwrap()).unwrap();
    assert_eq!(idx["currentValue"], 105.9);

    let ev: Value =
        serde_json::from_slice(&fs::read(dir.path().join("geo-events.json")).unwrap()).unwrap();
    assert_eq!(ev["data"][0]["severity"], "high");
    assert_eq!(ev["data"][0]["impact"], "positive");
    assert_eq!(ev["data"][0]["date"], "Jun 28, 2024");
    assert_eq!(ev["data"][0]["link"], "https://example.test/news/war-gold");
}
