//! Fitted model representation shared by the fit and evaluate stages.

pub mod model;

pub use model::*;
