//! Target-range trimming.
//!
//! Observations with GDP growth outside `[GDP_GROWTH_MIN, GDP_GROWTH_MAX]` are
//! crisis or rebound years that would dominate a linear trend. Every stage
//! that needs the trimmed view derives it from the cleaned artifact through
//! `load_trimmed`, so the stages cannot drift apart.

use std::path::Path;

use log::info;

use crate::domain::Observation;
use crate::error::AppError;
use crate::io::ingest::load_cleaned;

pub const GDP_GROWTH_MIN: f64 = -20.0;
pub const GDP_GROWTH_MAX: f64 = 20.0;

/// Whether an observation lies inside the trimming bounds (inclusive).
pub fn within_bounds(obs: &Observation) -> bool {
    obs.gdp_growth
        .is_some_and(|g| (GDP_GROWTH_MIN..=GDP_GROWTH_MAX).contains(&g))
}

/// Pure filter: the trimmed subset, in input order.
pub fn trim(observations: &[Observation]) -> Vec<Observation> {
    observations.iter().filter(|o| within_bounds(o)).cloned().collect()
}

/// Derive the trimmed view from the cleaned artifact on disk.
pub fn load_trimmed(cleaned_path: &Path) -> Result<Vec<Observation>, AppError> {
    let cleaned = load_cleaned(cleaned_path)?;
    let trimmed = trim(&cleaned);
    info!(
        "Trimmed view of '{}': {} of {} observations within [{GDP_GROWTH_MIN}, {GDP_GROWTH_MAX}]",
        cleaned_path.display(),
        trimmed.len(),
        cleaned.len()
    );
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Indicator;

    fn obs(code: &str, growth: f64) -> Observation {
        Observation::new(code, code, 2000)
            .set(Indicator::EducationSpending, 4.0)
            .set(Indicator::GdpGrowth, growth)
    }

    #[test]
    fn trimmed_rows_are_within_bounds() {
        let rows = vec![
            obs("A", -25.0),
            obs("B", -20.0),
            obs("C", 0.0),
            obs("D", 20.0),
            obs("E", 25.0),
        ];
        let trimmed = trim(&rows);
        let codes: Vec<&str> = trimmed.iter().map(|o| o.country_code.as_str()).collect();
        assert_eq!(codes, vec!["B", "C", "D"]);
        assert!(
            trimmed
                .iter()
                .all(|o| o.gdp_growth.is_some_and(|g| (-20.0..=20.0).contains(&g)))
        );
    }

    #[test]
    fn trim_is_idempotent() {
        let rows = vec![obs("A", 3.0), obs("B", 30.0)];
        let once = trim(&rows);
        assert_eq!(trim(&once), once);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn load_trimmed_matches_in_memory_trim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cleaned.csv");
        let rows = vec![obs("A", 1.5), obs("B", 25.0), obs("C", -19.5)];
        crate::io::export::write_cleaned_csv(&path, &rows).unwrap();

        let loaded = load_trimmed(&path).unwrap();
        assert_eq!(loaded, trim(&rows));
        assert!(loaded.iter().all(|o| o.country_code != "B"));
    }
}
