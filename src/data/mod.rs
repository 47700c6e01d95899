//! Panel data transformations.
//!
//! - raw wide → long → tidy country-year table (`reshape`)
//! - target-range trimming (`filter`)
//! - complete-case selection and the stratified split (`dataset`)

pub mod dataset;
pub mod filter;
pub mod reshape;

pub use dataset::*;
pub use filter::*;
pub use reshape::*;
