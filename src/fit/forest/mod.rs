//! Random forest regression (bagged CART trees).
//!
//! Each tree is grown on a bootstrap sample of the training rows. At every
//! node `mtry` of the four features are sampled and the split with the largest
//! reduction in squared error is taken. Nodes with fewer than `min_node_size`
//! rows (or a constant target) become leaves predicting their mean.
//!
//! `mtry` is chosen by k-fold cross-validation over `ForestParams::mtry_grid`
//! (pooled held-out RMSE, smallest `mtry` wins ties), then the final forest is
//! grown on all training rows.
//!
//! Every tree and every CV fit derives its own RNG stream from
//! `(seed, stream, index)`, so results do not depend on rayon scheduling.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use log::debug;

use crate::domain::{FEATURES, ForestParams, ModelKind, ModelRow};
use crate::error::FitFailure;
use crate::math::is_constant;

mod cv;
mod tree;

pub use cv::CvScore;
pub use tree::{Node, RegressionTree};

use cv::cross_validate;
use tree::grow_tree;

const N_FEATURES: usize = FEATURES.len();

const STREAM_TREES: u64 = 1;
const STREAM_FOLDS: u64 = 2;
const STREAM_CV: u64 = 3;

/// A fitted forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub mtry: usize,
    pub min_node_size: usize,
    pub trees: Vec<RegressionTree>,
    /// Mean decrease in node impurity (squared error) per tree, in `FEATURES` order.
    pub importance: [f64; N_FEATURES],
    pub cv_scores: Vec<CvScore>,
    pub n_train: usize,
}

impl RandomForest {
    pub fn predict(&self, x: &[f64; N_FEATURES]) -> f64 {
        if self.trees.is_empty() {
            return f64::NAN;
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict(x)).sum();
        sum / self.trees.len() as f64
    }
}

/// Fit a random forest with cross-validated `mtry`.
pub fn fit_forest(rows: &[ModelRow], params: &ForestParams) -> Result<RandomForest, FitFailure> {
    let fail = |reason: String| FitFailure::new(ModelKind::Forest, reason);

    let n = rows.len();
    if n < N_FEATURES + 1 {
        return Err(fail(format!(
            "insufficient training rows: n={n} < features+1={}",
            N_FEATURES + 1
        )));
    }
    for (j, feature) in FEATURES.iter().enumerate() {
        let values: Vec<f64> = rows.iter().map(|r| r.features[j]).collect();
        if is_constant(&values) {
            return Err(fail(format!("feature `{feature}` has zero variance")));
        }
    }
    if params.n_trees == 0 {
        return Err(fail("number of trees must be > 0".to_string()));
    }
    let mut grid: Vec<usize> = params
        .mtry_grid
        .iter()
        .copied()
        .filter(|m| (1..=N_FEATURES).contains(m))
        .collect();
    grid.sort_unstable();
    grid.dedup();
    if grid.is_empty() {
        return Err(fail(format!("mtry grid has no value in 1..={N_FEATURES}")));
    }
    if params.folds < 2 || params.folds > n {
        return Err(fail(format!(
            "cross-validation needs 2 <= folds <= n (folds={}, n={n})",
            params.folds
        )));
    }

    let cv_scores = cross_validate(rows, params, &grid);
    let best = cv_scores
        .iter()
        .fold(None::<&CvScore>, |best, s| match best {
            Some(b) if b.rmse <= s.rmse || s.rmse.is_nan() => Some(b),
            _ => Some(s),
        })
        .ok_or_else(|| fail("cross-validation produced no scores".to_string()))?;
    let mtry = best.mtry;
    debug!("forest CV scores: {cv_scores:?}; chose mtry={mtry}");

    let all: Vec<usize> = (0..n).collect();
    let (trees, importance) = grow_forest(rows, &all, mtry, params, derive_seed(params.seed, STREAM_TREES, 0));

    Ok(RandomForest {
        mtry,
        min_node_size: params.min_node_size,
        trees,
        importance,
        cv_scores,
        n_train: n,
    })
}

/// Grow `params.n_trees` bootstrap trees on `subset` and average their importance.
fn grow_forest(
    rows: &[ModelRow],
    subset: &[usize],
    mtry: usize,
    params: &ForestParams,
    seed: u64,
) -> (Vec<RegressionTree>, [f64; N_FEATURES]) {
    let grown: Vec<(RegressionTree, [f64; N_FEATURES])> = (0..params.n_trees)
        .into_par_iter()
        .map(|t| {
            let mut rng = StdRng::seed_from_u64(derive_seed(seed, STREAM_TREES, t as u64));
            let sample: Vec<usize> = (0..subset.len())
                .map(|_| subset[rng.gen_range(0..subset.len())])
                .collect();
            grow_tree(rows, sample, mtry, params.min_node_size.max(2), rng)
        })
        .collect();

    let mut importance = [0.0; N_FEATURES];
    let mut trees = Vec::with_capacity(grown.len());
    for (tree, imp) in grown {
        for (acc, v) in importance.iter_mut().zip(imp) {
            *acc += v;
        }
        trees.push(tree);
    }
    let n_trees = trees.len().max(1) as f64;
    for v in &mut importance {
        *v /= n_trees;
    }
    (trees, importance)
}

/// SplitMix64 mix of `(seed, stream, index)` into an independent RNG seed.
fn derive_seed(seed: u64, stream: u64, index: u64) -> u64 {
    let mut z = seed
        .wrapping_add(stream.wrapping_mul(0x9e37_79b9_7f4a_7c15))
        .wrapping_add(index.wrapping_mul(0xbf58_476d_1ce4_e5b9));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> Vec<ModelRow> {
        (0..n)
            .map(|i| {
                let e = (i % 10) as f64;
                let u = ((i * 3) % 7) as f64;
                let inf = ((i * 5) % 11) as f64;
                let pop = ((i * 7) % 4) as f64;
                let target = if e < 5.0 { -3.0 } else { 4.0 } + 0.2 * u;
                ModelRow {
                    country_code: format!("C{i}"),
                    year: 2000 + i as i32,
                    features: [e, u, inf, pop],
                    target,
                }
            })
            .collect()
    }

    fn params(n_trees: usize) -> ForestParams {
        ForestParams {
            n_trees,
            min_node_size: 5,
            mtry_grid: vec![2, 3, 4],
            folds: 5,
            seed: 11,
        }
    }

    #[test]
    fn forest_learns_a_step_function() {
        let data = rows(120);
        let forest = fit_forest(&data, &params(40)).unwrap();
        assert_eq!(forest.trees.len(), 40);
        assert!([2, 3, 4].contains(&forest.mtry));
        assert_eq!(forest.cv_scores.len(), 3);

        let low = forest.predict(&[1.0, 3.0, 5.0, 1.0]);
        let high = forest.predict(&[8.0, 3.0, 5.0, 1.0]);
        assert!(low < -1.0, "low={low}");
        assert!(high > 2.0, "high={high}");

        // The step lives in education spending, so it dominates importance.
        let top = forest
            .importance
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(top, Some(0));
    }

    #[test]
    fn forest_is_deterministic_for_a_seed() {
        let data = rows(60);
        let a = fit_forest(&data, &params(15)).unwrap();
        let b = fit_forest(&data, &params(15)).unwrap();
        assert_eq!(a, b);

        let mut other = params(15);
        other.seed = 12;
        let c = fit_forest(&data, &other).unwrap();
        assert_ne!(a.trees, c.trees);
    }

    #[test]
    fn degenerate_training_sets_fail() {
        let err = fit_forest(&rows(4), &params(5)).unwrap_err();
        assert_eq!(err.model, ModelKind::Forest);

        let flat: Vec<ModelRow> = rows(30)
            .into_iter()
            .map(|mut r| {
                r.features[3] = 1.0;
                r
            })
            .collect();
        let err = fit_forest(&flat, &params(5)).unwrap_err();
        assert!(err.reason.contains("population_growth"));
    }

    #[test]
    fn leaves_respect_min_node_size() {
        let data = rows(50);
        let mut p = params(1);
        p.min_node_size = 1000;
        let forest = fit_forest(&data, &p).unwrap();
        assert_eq!(forest.trees[0].nodes.len(), 1);
        assert_eq!(forest.trees[0].depth(), 0);
    }

    #[test]
    fn forest_does_not_depend_on_thread_count() {
        let data = rows(60);
        let fit_with = |threads: usize| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap()
                .install(|| fit_forest(&data, &params(12)).unwrap())
        };
        let single = fit_with(1);
        assert_eq!(single, fit_with(4));
        assert_eq!(single, fit_with(7));
    }

    #[test]
    fn near_constant_feature_is_rejected() {
        let data: Vec<ModelRow> = rows(30)
            .into_iter()
            .enumerate()
            .map(|(i, mut r)| {
                r.features[2] = 2.0 + i as f64 * 1e-10;
                r
            })
            .collect();
        let err = fit_forest(&data, &params(5)).unwrap_err();
        assert!(err.reason.contains("inflation"), "{}", err.reason);
    }
}
