//! The fitted-model sum type.
//!
//! The evaluator only needs two primitive operations from any model:
//! - which kind it is (to name outputs and locate artifacts)
//! - predict the target from a feature vector in `FEATURES` layout

use serde::{Deserialize, Serialize};

use crate::domain::ModelKind;
use crate::fit::{LinearFit, RandomForest};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum FittedModel {
    Linear(LinearFit),
    Forest(RandomForest),
}

impl FittedModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            FittedModel::Linear(fit) => fit.kind,
            FittedModel::Forest(_) => ModelKind::Forest,
        }
    }

    pub fn predict(&self, x: &[f64; 4]) -> f64 {
        match self {
            FittedModel::Linear(fit) => fit.predict(x),
            FittedModel::Forest(forest) => forest.predict(x),
        }
    }

    pub fn as_linear(&self) -> Option<&LinearFit> {
        match self {
            FittedModel::Linear(fit) => Some(fit),
            FittedModel::Forest(_) => None,
        }
    }
}
