//! Model fitting.
//!
//! Responsibilities:
//!
//! - OLS with coefficient inference (`linear`)
//! - bagged regression trees with cross-validated `mtry` (`forest`)
//! - fitting every variant independently on the training partition (`suite`)

pub mod forest;
pub mod linear;
pub mod suite;

pub use forest::*;
pub use linear::*;
pub use suite::*;
