//! Read/write model artifact JSON files.
//!
//! An artifact is the persisted form of a fitted model:
//! - model kind + parameters (coefficients or trees)
//! - the split signature of the partition it was trained against
//! - creation metadata
//!
//! The schema is defined by `ModelArtifact`; only this crate reads it back.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ModelKind, SplitSignature};
use crate::error::AppError;
use crate::io::export::write_atomic;
use crate::models::FittedModel;

pub const TOOL_NAME: &str = "edugrowth";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub tool: String,
    pub created_at: DateTime<Utc>,
    pub kind: ModelKind,
    pub split: SplitSignature,
    pub model: FittedModel,
}

impl ModelArtifact {
    pub fn new(model: FittedModel, split: SplitSignature) -> Self {
        Self {
            tool: TOOL_NAME.to_string(),
            created_at: Utc::now(),
            kind: model.kind(),
            split,
            model,
        }
    }
}

/// Write a model artifact (atomically replacing any previous one).
pub fn write_artifact(path: &Path, artifact: &ModelArtifact) -> Result<(), AppError> {
    let bytes = serde_json::to_vec_pretty(artifact).map_err(|e| AppError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;
    write_atomic(path, &bytes)
}

/// Read a model artifact.
pub fn read_artifact(path: &Path) -> Result<ModelArtifact, AppError> {
    let file = File::open(path).map_err(|e| AppError::io(path, e))?;
    let artifact: ModelArtifact = serde_json::from_reader(std::io::BufReader::new(file)).map_err(|e| {
        AppError::Json {
            path: path.to_path_buf(),
            source: e,
        }
    })?;

    if artifact.kind != artifact.model.kind() {
        return Err(AppError::Config(format!(
            "Artifact '{}' declares kind {} but holds a {} model",
            path.display(),
            artifact.kind,
            artifact.model.kind()
        )));
    }
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ModelRow;
    use crate::fit::fit_linear;

    #[test]
    fn artifact_round_trip_preserves_predictions() {
        let rows: Vec<ModelRow> = (0..6)
            .map(|i| {
                let x = i as f64;
                ModelRow {
                    country_code: format!("C{i}"),
                    year: 2000 + i,
                    features: [x, (x * 1.7).sin(), (x * 0.3).cos(), x * x],
                    target: 1.0 + 0.5 * x,
                }
            })
            .collect();
        let fit = fit_linear(ModelKind::Baseline, &rows).unwrap();
        let split = SplitSignature {
            seed: 1,
            train_fraction_ppm: 700_000,
            strata: 5,
            n_total: 8,
            n_train: 6,
            n_test: 2,
            test_fingerprint: 42,
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_baseline.json");
        write_artifact(&path, &ModelArtifact::new(FittedModel::Linear(fit), split.clone())).unwrap();

        let back = read_artifact(&path).unwrap();
        assert_eq!(back.kind, ModelKind::Baseline);
        assert_eq!(back.split, split);
        let y = back.model.predict(&[10.0, 0.0, 0.0, 0.0]);
        assert!((y - 6.0).abs() < 1e-9);
    }
}
