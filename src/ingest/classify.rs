//! Deterministic keyword classification of news text into severity/impact.
//!
//! High-severity words are checked before medium ones; everything else is low.
//! Impact looks for a direction word within a short span of "gold". With no
//! direction word, medium/high severity defaults to positive (safe-haven
//! assumption, not a measured signal).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ingest::types::{Impact, Severity};

static HIGH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:war(?:s|fare|ships?|planes?|time|zones?)?\b|crisis|attack|collapse|crash)")
        .expect("static regex")
});

static MEDIUM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:tension|concern|risk|warning|threat)").expect("static regex")
});

// Direction word after or before the asset name, within one clause.
static UP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\bgold\b[^.;]{0,40}?\b(?:rises|rally|rallies|surge|gains|higher)|\b(?:rises|rally|surge|gains|higher)\w*[^.;]{0,40}?\bgold\b",
    )
    .expect("static regex")
});

static DOWN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\bgold\b[^.;]{0,40}?\b(?:falls|decline|drop|lower)|\b(?:falls|decline|drop|lower)\w*[^.;]{0,40}?\bgold\b",
    )
    .expect("static regex")
});

pub fn severity(text: &str) -> Severity {
    let t = text.to_lowercase();
    if HIGH.is_match(&t) {
        Severity::High
    } else if MEDIUM.is_match(&t) {
        Severity::Medium
    } else {
        Severity::Low
    }
}

pub fn impact(text: &str, severity: Severity) -> Impact {
    let t = text.to_lowercase();
    if UP.is_match(&t) {
        Impact::Positive
    } else if DOWN.is_match(&t) {
        Impact::Negative
    } else if severity != Severity::Low {
        Impact::Positive
    } else {
        Impact::Neutral
    }
}

/// Classify headline + summary as one text.
pub fn classify(headline: &str, summary: &str) -> (Severity, Impact) {
    let text = format!("{headline} {summary}");
    let sev = severity(&text);
    (sev, impact(&text, sev))
}
