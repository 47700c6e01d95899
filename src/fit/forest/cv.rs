//! k-fold cross-validation of `mtry`.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{STREAM_CV, STREAM_FOLDS, derive_seed, grow_forest};
use crate::domain::{ForestParams, ModelRow};

/// Cross-validated score for one grid value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvScore {
    pub mtry: usize,
    pub rmse: f64,
}

/// Pooled held-out RMSE for every grid value.
pub(super) fn cross_validate(rows: &[ModelRow], params: &ForestParams, grid: &[usize]) -> Vec<CvScore> {
    let folds = assign_folds(rows.len(), params.folds, derive_seed(params.seed, STREAM_FOLDS, 0));

    let jobs: Vec<(usize, usize)> = grid
        .iter()
        .flat_map(|&m| (0..params.folds).map(move |f| (m, f)))
        .collect();

    let sse: Vec<(usize, f64, usize)> = jobs
        .par_iter()
        .enumerate()
        .map(|(job, &(mtry, fold))| {
            let train: Vec<usize> = (0..rows.len()).filter(|&i| folds[i] != fold).collect();
            let seed = derive_seed(params.seed, STREAM_CV, job as u64);
            let (trees, _) = grow_forest(rows, &train, mtry, params, seed);

            let mut sse = 0.0;
            let mut count = 0;
            for (row, _) in rows.iter().zip(&folds).filter(|(_, f)| **f == fold) {
                let pred = trees.iter().map(|t| t.predict(&row.features)).sum::<f64>() / trees.len() as f64;
                sse += (pred - row.target).powi(2);
                count += 1;
            }
            (mtry, sse, count)
        })
        .collect();

    grid.iter()
        .map(|&mtry| {
            let (total, count) = sse
                .iter()
                .filter(|(m, _, _)| *m == mtry)
                .fold((0.0, 0usize), |(s, c), (_, e, k)| (s + e, c + k));
            CvScore {
                mtry,
                rmse: if count > 0 { (total / count as f64).sqrt() } else { f64::NAN },
            }
        })
        .collect()
}

/// Balanced random fold labels.
fn assign_folds(n: usize, folds: usize, seed: u64) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));
    let mut labels = vec![0; n];
    for (pos, idx) in order.into_iter().enumerate() {
        labels[idx] = pos % folds;
    }
    labels
}
