//! `edu-growth` library crate.
//!
//! The binary (`edugrowth`) is a thin wrapper around this library so that:
//!
//! - every stage is testable without spawning processes
//! - the cleaning and fitting code can be reused outside the CLI

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
