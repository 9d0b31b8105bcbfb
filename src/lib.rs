// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod ingest;
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::config::{Credentials, PipelineConfig};
pub use crate::ingest::output::OutputWriter;
pub use crate::ingest::pipeline::Pipeline;
pub use crate::ingest::types::{RunOutcome, SourceKind};
