// src/ingest/mod.rs
pub mod classify;
pub mod error;
pub mod fallback;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod providers;
pub mod rate_gate;
pub mod transport;
pub mod types;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;

/// One-time metrics registration (so series show up in the export).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_requests_total", "Outbound provider requests.");
        describe_counter!(
            "ingest_provider_errors_total",
            "Provider fetch/parse errors by kind."
        );
        describe_counter!(
            "ingest_fallback_total",
            "Provider tiers that failed and passed the source on."
        );
        describe_counter!(
            "ingest_source_success_total",
            "Sources that produced a record set."
        );
        describe_counter!(
            "ingest_source_failure_total",
            "Sources where every provider failed."
        );
        describe_counter!("ingest_runs_total", "Completed pipeline runs.");
        describe_histogram!("ingest_fetch_ms", "Provider round-trip time in milliseconds.");
        describe_gauge!(
            "ingest_pipeline_last_run_ts",
            "Unix ts when ingest pipeline last ran."
        );
    });
}

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("static regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Normalize article text: decode entities, strip tags, fold quotes and
/// whitespace. Punctuation is stored as published.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    out = RE_TAGS.replace_all(&out, "").to_string();

    // 3) Normalize curly and angle quotes to ASCII
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    out = RE_WS.replace_all(&out, " ").trim().to_string();

    out
}
