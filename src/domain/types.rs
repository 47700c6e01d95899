//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory while reshaping and fitting
//! - exported to CSV/JSON
//! - reloaded later by the evaluation stage

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One of the five tracked macroeconomic series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    EducationSpending,
    GdpGrowth,
    Unemployment,
    Inflation,
    PopulationGrowth,
}

/// Indicator code → canonical field, in output column order.
///
/// Codes are World Development Indicators series codes.
pub const INDICATORS: [(&str, Indicator); 5] = [
    ("SE.XPD.TOTL.GD.ZS", Indicator::EducationSpending),
    ("NY.GDP.MKTP.KD.ZG", Indicator::GdpGrowth),
    ("SL.UEM.TOTL.ZS", Indicator::Unemployment),
    ("FP.CPI.TOTL.ZG", Indicator::Inflation),
    ("SP.POP.GROW", Indicator::PopulationGrowth),
];

/// Predictors in design-matrix order. Every feature vector uses this layout.
pub const FEATURES: [Indicator; 4] = [
    Indicator::EducationSpending,
    Indicator::Unemployment,
    Indicator::Inflation,
    Indicator::PopulationGrowth,
];

/// The modelling target.
pub const TARGET: Indicator = Indicator::GdpGrowth;

impl Indicator {
    pub const ALL: [Indicator; 5] = [
        Indicator::EducationSpending,
        Indicator::GdpGrowth,
        Indicator::Unemployment,
        Indicator::Inflation,
        Indicator::PopulationGrowth,
    ];

    /// Look up a series code in the mapping table (exact match after trimming).
    pub fn from_code(code: &str) -> Option<Indicator> {
        let code = code.trim();
        INDICATORS
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, indicator)| *indicator)
    }

    pub fn code(self) -> &'static str {
        INDICATORS
            .iter()
            .find(|(_, i)| *i == self)
            .map(|(c, _)| *c)
            .unwrap_or_default()
    }

    /// Column name used in the cleaned file and in reports.
    pub fn field_name(self) -> &'static str {
        match self {
            Indicator::EducationSpending => "education_spending",
            Indicator::GdpGrowth => "gdp_growth",
            Indicator::Unemployment => "unemployment",
            Indicator::Inflation => "inflation",
            Indicator::PopulationGrowth => "population_growth",
        }
    }

    /// Position within `FEATURES`, if this indicator is a predictor.
    pub fn feature_index(self) -> Option<usize> {
        FEATURES.iter().position(|f| *f == self)
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// One melted value: a single indicator for one country-year.
#[derive(Debug, Clone, PartialEq)]
pub struct LongRecord {
    pub country_name: String,
    pub country_code: String,
    pub year: i32,
    pub indicator: Indicator,
    pub value: Option<f64>,
}

/// A tidy country-year row. Missing indicator values are `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Observation {
    pub country_name: String,
    pub country_code: String,
    pub year: i32,
    pub education_spending: Option<f64>,
    pub gdp_growth: Option<f64>,
    pub unemployment: Option<f64>,
    pub inflation: Option<f64>,
    pub population_growth: Option<f64>,
}

impl Observation {
    pub fn new(country_name: impl Into<String>, country_code: impl Into<String>, year: i32) -> Self {
        Self {
            country_name: country_name.into(),
            country_code: country_code.into(),
            year,
            ..Self::default()
        }
    }

    pub fn get(&self, indicator: Indicator) -> Option<f64> {
        match indicator {
            Indicator::EducationSpending => self.education_spending,
            Indicator::GdpGrowth => self.gdp_growth,
            Indicator::Unemployment => self.unemployment,
            Indicator::Inflation => self.inflation,
            Indicator::PopulationGrowth => self.population_growth,
        }
    }

    pub fn slot_mut(&mut self, indicator: Indicator) -> &mut Option<f64> {
        match indicator {
            Indicator::EducationSpending => &mut self.education_spending,
            Indicator::GdpGrowth => &mut self.gdp_growth,
            Indicator::Unemployment => &mut self.unemployment,
            Indicator::Inflation => &mut self.inflation,
            Indicator::PopulationGrowth => &mut self.population_growth,
        }
    }

    pub fn set(mut self, indicator: Indicator, value: f64) -> Self {
        *self.slot_mut(indicator) = Some(value);
        self
    }
}

/// A complete-case row ready for modelling.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRow {
    pub country_code: String,
    pub year: i32,
    /// Predictors in `FEATURES` order.
    pub features: [f64; 4],
    pub target: f64,
}

impl ModelRow {
    pub fn key(&self) -> (&str, i32) {
        (&self.country_code, self.year)
    }
}

/// Concrete fitted model kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Baseline,
    Extended,
    Forest,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::Baseline, ModelKind::Extended, ModelKind::Forest];

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Baseline => "Baseline OLS",
            ModelKind::Extended => "Extended OLS",
            ModelKind::Forest => "Random forest",
        }
    }

    /// Short name used in file names and CSV headers.
    pub fn slug(self) -> &'static str {
        match self {
            ModelKind::Baseline => "baseline",
            ModelKind::Extended => "extended",
            ModelKind::Forest => "forest",
        }
    }

    /// Predictors the model consumes.
    pub fn features(self) -> &'static [Indicator] {
        match self {
            ModelKind::Baseline => &FEATURES[..1],
            ModelKind::Extended | ModelKind::Forest => &FEATURES,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Identifies a train/test partition so evaluation can prove it sees the same
/// test rows the model was trained against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSignature {
    pub seed: u64,
    /// Train fraction in parts per million (keeps the signature `Eq`).
    pub train_fraction_ppm: u32,
    pub strata: usize,
    pub n_total: usize,
    pub n_train: usize,
    pub n_test: usize,
    /// FNV-1a fingerprint over the `(country_code, year)` keys of the test rows.
    pub test_fingerprint: u64,
}

/// Held-out accuracy for one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub rmse: f64,
    pub r_squared: f64,
    pub mae: f64,
    pub n: usize,
}

/// Random-forest hyperparameters and the cross-validation grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    /// Nodes with fewer rows than this become leaves.
    pub min_node_size: usize,
    /// Candidate per-split feature counts evaluated by cross-validation.
    pub mtry_grid: Vec<usize>,
    pub folds: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: DEFAULT_TREES,
            min_node_size: 5,
            mtry_grid: vec![2, 3, 4],
            folds: DEFAULT_FOLDS,
            seed: DEFAULT_SEED,
        }
    }
}

pub const DEFAULT_SEED: u64 = 123;
pub const DEFAULT_TRAIN_FRACTION: f64 = 0.7;
pub const DEFAULT_STRATA: usize = 5;
pub const DEFAULT_TREES: usize = 500;
pub const DEFAULT_FOLDS: usize = 5;

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input_path: PathBuf,
    pub out_dir: PathBuf,
    pub seed: u64,
    pub train_fraction: f64,
    pub strata: usize,
    pub forest: ForestParams,
}

impl PipelineConfig {
    pub fn cleaned_path(&self) -> PathBuf {
        self.out_dir.join("cleaned.csv")
    }

    pub fn summary_path(&self) -> PathBuf {
        self.out_dir.join("summary.csv")
    }

    pub fn regression_path(&self) -> PathBuf {
        self.out_dir.join("regression_results.csv")
    }

    pub fn artifact_path(&self, kind: ModelKind) -> PathBuf {
        self.out_dir.join(format!("model_{}.json", kind.slug()))
    }

    pub fn metrics_path(&self, kind: ModelKind) -> PathBuf {
        self.out_dir.join(format!("metrics_{}.csv", kind.slug()))
    }

    pub fn predictions_path(&self, kind: ModelKind) -> PathBuf {
        self.out_dir.join(format!("predictions_{}.csv", kind.slug()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_table_round_trips_codes() {
        for (code, indicator) in INDICATORS {
            assert_eq!(Indicator::from_code(code), Some(indicator));
            assert_eq!(indicator.code(), code);
        }
        assert_eq!(Indicator::from_code(" SP.POP.GROW "), Some(Indicator::PopulationGrowth));
        assert_eq!(Indicator::from_code("SP.POP.TOTL"), None);
    }

    #[test]
    fn target_is_not_a_feature() {
        assert_eq!(TARGET.feature_index(), None);
        assert_eq!(Indicator::Inflation.feature_index(), Some(2));
        assert_eq!(ModelKind::Baseline.features(), &[Indicator::EducationSpending]);
    }
}
