//! Application error type.
//!
//! Every variant maps to a process exit code so the binary can report failures
//! the same way regardless of which stage produced them:
//!
//! - `2`: configuration, I/O or input schema problems
//! - `3`: no usable data left after cleaning/filtering
//! - `4`: one or more models failed to fit
//! - `5`: the test partition does not match the one a model was trained against

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::ModelKind;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Model artifact error in '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("{0}")]
    Data(String),

    #[error("{0}")]
    Config(String),

    #[error("Model fitting failed: {}", format_failures(.0))]
    Fit(Vec<FitFailure>),

    #[error("Split misalignment for {model}: {reason}")]
    Misalignment { model: ModelKind, reason: String },
}

impl AppError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        AppError::Csv {
            path: path.into(),
            source,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Io { .. }
            | AppError::Csv { .. }
            | AppError::Json { .. }
            | AppError::Schema(_)
            | AppError::Config(_) => 2,
            AppError::Data(_) => 3,
            AppError::Fit(_) => 4,
            AppError::Misalignment { .. } => 5,
        }
    }
}

/// A single model that could not be fit, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct FitFailure {
    pub model: ModelKind,
    pub reason: String,
}

impl FitFailure {
    pub fn new(model: ModelKind, reason: impl Into<String>) -> Self {
        Self {
            model,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for FitFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.model, self.reason)
    }
}

fn format_failures(failures: &[FitFailure]) -> String {
    let parts: Vec<String> = failures.iter().map(ToString::to_string).collect();
    parts.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_taxonomy() {
        assert_eq!(AppError::Schema("x".into()).exit_code(), 2);
        assert_eq!(AppError::Data("x".into()).exit_code(), 3);
        let fit = AppError::Fit(vec![FitFailure::new(ModelKind::Baseline, "too few rows")]);
        assert_eq!(fit.exit_code(), 4);
        assert!(fit.to_string().contains("[baseline] too few rows"));
        let mis = AppError::Misalignment {
            model: ModelKind::Forest,
            reason: "seed differs".into(),
        };
        assert_eq!(mis.exit_code(), 5);
    }
}
