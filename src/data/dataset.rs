//! Model-ready dataset and the stratified train/test split.
//!
//! Split algorithm (deterministic given seed + input order):
//!
//! 1. rank rows by target (ties broken by input position)
//! 2. cut the ranking into `min(strata, n)` equal-count quantile strata
//! 3. allocate `round(train_fraction * n)` train rows across strata by largest remainder
//! 4. shuffle each stratum with one seeded `StdRng` and send its first `k` rows to train
//!
//! Both partitions keep the input order of the model-ready rows.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::domain::{FEATURES, ModelRow, Observation, SplitSignature, TARGET};
use crate::error::AppError;

/// A train/test partition plus the signature that identifies it.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: Vec<ModelRow>,
    pub test: Vec<ModelRow>,
    pub signature: SplitSignature,
}

/// Split parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitSpec {
    pub seed: u64,
    pub train_fraction: f64,
    pub strata: usize,
}

/// Complete-case rows: all five indicators must be present.
pub fn model_ready(observations: &[Observation]) -> Vec<ModelRow> {
    observations
        .iter()
        .filter_map(|obs| {
            let target = obs.get(TARGET)?;
            let mut features = [0.0; 4];
            for (slot, indicator) in features.iter_mut().zip(FEATURES) {
                *slot = obs.get(indicator)?;
            }
            Some(ModelRow {
                country_code: obs.country_code.clone(),
                year: obs.year,
                features,
                target,
            })
        })
        .collect()
}

/// Partition model-ready rows into train and test.
pub fn stratified_split(rows: &[ModelRow], spec: SplitSpec) -> Result<Split, AppError> {
    if !(spec.train_fraction.is_finite() && spec.train_fraction > 0.0 && spec.train_fraction < 1.0) {
        return Err(AppError::Config(format!(
            "Train fraction must be in (0, 1), got {}",
            spec.train_fraction
        )));
    }
    if spec.strata == 0 {
        return Err(AppError::Config("Number of strata must be > 0.".to_string()));
    }
    let n = rows.len();
    if n == 0 {
        return Err(AppError::Data("Model-ready dataset is empty; nothing to split.".to_string()));
    }

    let strata = assign_strata(rows, spec.strata);
    let n_strata = strata.len();
    let n_train = (spec.train_fraction * n as f64).round() as usize;
    let quotas = allocate(&strata.iter().map(Vec::len).collect::<Vec<_>>(), n_train, n);

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let mut in_train = vec![false; n];
    for (members, quota) in strata.into_iter().zip(quotas) {
        let mut members = members;
        members.shuffle(&mut rng);
        for &idx in members.iter().take(quota) {
            in_train[idx] = true;
        }
    }

    let mut train = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n - n_train);
    for (row, is_train) in rows.iter().zip(&in_train) {
        if *is_train {
            train.push(row.clone());
        } else {
            test.push(row.clone());
        }
    }

    let signature = SplitSignature {
        seed: spec.seed,
        train_fraction_ppm: (spec.train_fraction * 1_000_000.0).round() as u32,
        strata: n_strata,
        n_total: n,
        n_train: train.len(),
        n_test: test.len(),
        test_fingerprint: fingerprint(&test),
    };

    Ok(Split { train, test, signature })
}

/// Group row indices into equal-count quantile strata of the target.
fn assign_strata(rows: &[ModelRow], strata: usize) -> Vec<Vec<usize>> {
    let n = rows.len();
    let k = strata.min(n).max(1);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| rows[a].target.total_cmp(&rows[b].target).then(a.cmp(&b)));

    let mut out = vec![Vec::new(); k];
    for (rank, idx) in order.into_iter().enumerate() {
        out[rank * k / n].push(idx);
    }
    // Sample within each stratum in input order so shuffles depend only on the seed.
    for members in &mut out {
        members.sort_unstable();
    }
    out
}

/// Largest-remainder allocation of `total` train rows across strata.
fn allocate(sizes: &[usize], total: usize, n: usize) -> Vec<usize> {
    let fraction = total as f64 / n as f64;
    let mut quotas: Vec<usize> = sizes
        .iter()
        .map(|&s| ((s as f64 * fraction).floor() as usize).min(s))
        .collect();

    let mut remainders: Vec<(usize, f64)> = sizes
        .iter()
        .enumerate()
        .map(|(i, &s)| (i, s as f64 * fraction - quotas[i] as f64))
        .collect();
    remainders.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut missing = total.saturating_sub(quotas.iter().sum());
    for (i, _) in remainders.iter().cycle().take(sizes.len() * 2) {
        if missing == 0 {
            break;
        }
        if quotas[*i] < sizes[*i] {
            quotas[*i] += 1;
            missing -= 1;
        }
    }
    quotas
}

/// FNV-1a over the `(country_code, year)` keys, in row order.
pub fn fingerprint(rows: &[ModelRow]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;

    let mut hash = OFFSET;
    let mut feed = |bytes: &[u8]| {
        for b in bytes {
            hash ^= u64::from(*b);
            hash = hash.wrapping_mul(PRIME);
        }
    };
    for row in rows {
        let (code, year) = row.key();
        feed(code.as_bytes());
        feed(&[0x1f]);
        feed(&year.to_le_bytes());
        feed(&[0x1e]);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Indicator;
    use std::collections::HashSet;

    fn rows(n: usize) -> Vec<ModelRow> {
        (0..n)
            .map(|i| ModelRow {
                country_code: format!("C{:02}", i % 17),
                year: 1990 + i as i32,
                features: [i as f64, 1.0, 2.0, 3.0],
                target: ((i * 37) % 23) as f64 - 11.0,
            })
            .collect()
    }

    fn spec(seed: u64) -> SplitSpec {
        SplitSpec {
            seed,
            train_fraction: 0.7,
            strata: 5,
        }
    }

    fn keys(rows: &[ModelRow]) -> HashSet<(String, i32)> {
        rows.iter().map(|r| (r.country_code.clone(), r.year)).collect()
    }

    #[test]
    fn row_missing_unemployment_is_not_model_ready() {
        let complete = Observation::new("A", "AAA", 2000)
            .set(Indicator::EducationSpending, 4.0)
            .set(Indicator::GdpGrowth, 2.0)
            .set(Indicator::Unemployment, 6.0)
            .set(Indicator::Inflation, 3.0)
            .set(Indicator::PopulationGrowth, 1.0);
        let mut gap = complete.clone();
        gap.country_code = "BBB".to_string();
        gap.unemployment = None;

        let ready = model_ready(&[complete, gap]);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].country_code, "AAA");
        assert_eq!(ready[0].features, [4.0, 6.0, 3.0, 1.0]);
        assert_eq!(ready[0].target, 2.0);
    }

    #[test]
    fn split_partitions_the_dataset() {
        for n in [1, 2, 3, 7, 10, 33, 101] {
            let data = rows(n);
            let split = stratified_split(&data, spec(123)).unwrap();

            let train = keys(&split.train);
            let test = keys(&split.test);
            assert!(train.is_disjoint(&test));
            let union: HashSet<_> = train.union(&test).cloned().collect();
            assert_eq!(union, keys(&data));

            let expected = 0.3 * n as f64;
            assert!(
                (split.test.len() as f64 - expected).abs() <= 1.0,
                "n={n}: |test|={} expected≈{expected}",
                split.test.len()
            );
            assert_eq!(split.signature.n_test, split.test.len());
        }
    }

    #[test]
    fn split_is_reproducible_for_a_seed() {
        let data = rows(60);
        let a = stratified_split(&data, spec(7)).unwrap();
        let b = stratified_split(&data, spec(7)).unwrap();
        assert_eq!(a, b);

        let c = stratified_split(&data, spec(8)).unwrap();
        assert_ne!(a.signature.test_fingerprint, c.signature.test_fingerprint);
    }

    #[test]
    fn split_preserves_target_distribution() {
        let data = rows(100);
        let split = stratified_split(&data, spec(99)).unwrap();
        let strata = assign_strata(&data, 5);
        let test = keys(&split.test);
        for members in strata {
            let in_test = members
                .iter()
                .filter(|&&i| test.contains(&(data[i].country_code.clone(), data[i].year)))
                .count();
            // 20 rows per stratum, 30 test rows overall → 6 per stratum.
            assert_eq!(in_test, 6);
        }
    }

    #[test]
    fn invalid_split_settings_are_rejected() {
        let data = rows(10);
        let mut bad = spec(1);
        bad.train_fraction = 1.0;
        assert!(matches!(stratified_split(&data, bad), Err(AppError::Config(_))));
        bad = spec(1);
        bad.strata = 0;
        assert!(stratified_split(&data, bad).is_err());
        assert!(matches!(stratified_split(&[], spec(1)), Err(AppError::Data(_))));
    }

    #[test]
    fn allocation_hits_total_exactly() {
        assert_eq!(allocate(&[3, 3, 3], 6, 9), vec![2, 2, 2]);
        let q = allocate(&[2, 2, 3], 5, 7);
        assert_eq!(q.iter().sum::<usize>(), 5);
        assert!(q.iter().zip([2, 2, 3]).all(|(q, s)| *q <= s));
    }
}
