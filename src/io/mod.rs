//! Input/output helpers.
//!
//! - raw panel + cleaned file ingest (`ingest`)
//! - CSV exports with atomic publish (`export`)
//! - model artifact JSON read/write (`artifact`)

pub mod artifact;
pub mod export;
pub mod ingest;

pub use artifact::*;
pub use export::*;
pub use ingest::*;
