//! Raw wide panel → tidy country-year table.
//!
//! The stage runs in four steps:
//!
//! 1. keep rows whose series code is in `INDICATORS` (others are counted and dropped)
//! 2. melt year cells into `LongRecord`s, coercing values to numbers
//! 3. pivot indicators into `Observation` columns keyed by (country_code, year)
//! 4. drop observations missing education spending or GDP growth
//!
//! Duplicate (country, indicator, year) values are resolved keep-first: the
//! first value in input order wins and later ones are counted and discarded.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use log::{debug, warn};

use crate::domain::{Indicator, LongRecord, Observation};
use crate::error::AppError;
use crate::io::ingest::{RawPanel, parse_value};

/// Counters describing what the clean stage did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub rows_read: usize,
    pub rows_unreadable: usize,
    pub rows_unknown_indicator: usize,
    pub year_columns: usize,
    pub long_records: usize,
    pub duplicates_discarded: usize,
    pub name_conflicts: usize,
    pub country_years: usize,
    pub rows_retained: usize,
}

/// Output of the clean stage.
#[derive(Debug, Clone)]
pub struct CleanOutput {
    pub observations: Vec<Observation>,
    pub report: CleanReport,
}

/// Output of the pivot step.
#[derive(Debug, Clone, Default)]
pub struct Pivoted {
    pub observations: Vec<Observation>,
    pub duplicates_discarded: usize,
    /// Long records whose country name differed from the first one seen for the code.
    pub name_conflicts: usize,
}

/// Run the whole reshape/clean stage.
pub fn clean_panel(panel: &RawPanel) -> Result<CleanOutput, AppError> {
    let (long, rows_unknown_indicator) = melt(panel);
    let long_records = long.len();
    let pivoted = pivot(long);
    let country_years = pivoted.observations.len();
    let observations = drop_incomplete_keys(pivoted.observations);

    if pivoted.duplicates_discarded > 0 {
        warn!(
            "Discarded {} duplicate (country, indicator, year) values (keep-first)",
            pivoted.duplicates_discarded
        );
    }
    if pivoted.name_conflicts > 0 {
        warn!(
            "{} values were filed under a second name for an existing country code; kept the first name",
            pivoted.name_conflicts
        );
    }

    let report = CleanReport {
        rows_read: panel.rows.len() + panel.row_errors.len(),
        rows_unreadable: panel.row_errors.len(),
        rows_unknown_indicator,
        year_columns: panel.years.len(),
        long_records,
        duplicates_discarded: pivoted.duplicates_discarded,
        name_conflicts: pivoted.name_conflicts,
        country_years,
        rows_retained: observations.len(),
    };

    if observations.is_empty() {
        return Err(AppError::Data(
            "No country-years with both education spending and GDP growth remain after cleaning.".to_string(),
        ));
    }

    Ok(CleanOutput { observations, report })
}

/// Melt recognised rows into long records. Returns the records and the number
/// of rows dropped for carrying an unknown indicator code.
pub fn melt(panel: &RawPanel) -> (Vec<LongRecord>, usize) {
    let mut out = Vec::with_capacity(panel.rows.len() * panel.years.len());
    let mut unknown = 0usize;

    for row in &panel.rows {
        let Some(indicator) = Indicator::from_code(&row.series_code) else {
            debug!("line {}: skipping unrecognised series '{}'", row.line, row.series_code);
            unknown += 1;
            continue;
        };

        for (year, raw) in panel.years.iter().zip(&row.cells) {
            out.push(LongRecord {
                country_name: row.country_name.clone(),
                country_code: row.country_code.clone(),
                year: *year,
                indicator,
                value: parse_value(raw),
            });
        }
    }

    (out, unknown)
}

/// Pivot long records into one observation per (country_code, year).
///
/// The first country name seen for a key is kept; records filed under another
/// spelling of the same code merge into that observation and go through the
/// same keep-first rule. Output is sorted by key.
pub fn pivot(records: Vec<LongRecord>) -> Pivoted {
    let mut table: BTreeMap<(String, i32), (Observation, [bool; 5])> = BTreeMap::new();
    let mut duplicates = 0usize;
    let mut name_conflicts = 0usize;

    for rec in records {
        let slot = indicator_slot(rec.indicator);
        let key = (rec.country_code, rec.year);
        let (obs, seen) = match table.entry(key) {
            Entry::Occupied(e) => {
                let entry = e.into_mut();
                if entry.0.country_name != rec.country_name {
                    debug!(
                        "{} {}: name '{}' differs from '{}'; merging under the first",
                        entry.0.country_code, entry.0.year, rec.country_name, entry.0.country_name
                    );
                    name_conflicts += 1;
                }
                entry
            }
            Entry::Vacant(e) => {
                let (code, year) = e.key().clone();
                e.insert((Observation::new(rec.country_name, code, year), [false; 5]))
            }
        };

        if seen[slot] {
            duplicates += 1;
            continue;
        }
        seen[slot] = true;
        *obs.slot_mut(rec.indicator) = rec.value;
    }

    Pivoted {
        observations: table.into_values().map(|(obs, _)| obs).collect(),
        duplicates_discarded: duplicates,
        name_conflicts,
    }
}

/// Keep observations that carry both education spending and GDP growth.
pub fn drop_incomplete_keys(observations: Vec<Observation>) -> Vec<Observation> {
    observations
        .into_iter()
        .filter(|o| o.education_spending.is_some() && o.gdp_growth.is_some())
        .collect()
}

fn indicator_slot(indicator: Indicator) -> usize {
    Indicator::ALL
        .iter()
        .position(|i| *i == indicator)
        .unwrap_or_default()
}
