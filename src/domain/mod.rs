//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the indicator mapping table (`Indicator`, `INDICATORS`)
//! - long and wide panel records (`LongRecord`, `Observation`, `ModelRow`)
//! - model/evaluation outputs (`ModelKind`, `SplitSignature`, `Metrics`)
//! - the resolved run configuration (`PipelineConfig`)

pub mod types;

pub use types::*;
