//! Terminal tables for each stage.
//!
//! Stage functions return data; everything printed by `app` is rendered here.

use crate::data::CleanReport;
use crate::domain::{Metrics, ModelKind};
use crate::fit::{Coefficient, FitSuite, LinearFit, RandomForest};
use crate::models::FittedModel;
use crate::report::IndicatorSummary;

/// `estimate (se) stars`, e.g. `0.512 (0.041) ***`.
pub fn format_coefficient(c: &Coefficient) -> String {
    let cell = format!("{:.3} ({:.3})", c.estimate, c.std_error);
    match c.stars() {
        "" => cell,
        stars => format!("{cell} {stars}"),
    }
}

/// Summary of the clean stage.
pub fn format_clean_report(report: &CleanReport) -> String {
    let mut out = String::new();
    out.push_str("=== edugrowth - clean ===\n");
    out.push_str(&format!(
        "Raw rows: {} (unreadable {}, unknown indicator {})\n",
        report.rows_read, report.rows_unreadable, report.rows_unknown_indicator
    ));
    out.push_str(&format!(
        "Year columns: {} | long records: {} | duplicates discarded: {} | name conflicts: {}\n",
        report.year_columns, report.long_records, report.duplicates_discarded, report.name_conflicts
    ));
    out.push_str(&format!(
        "Country-years: {} | retained (education + GDP growth present): {}\n",
        report.country_years, report.rows_retained
    ));
    out
}

/// Per-model fit diagnostics.
pub fn format_fit_summary(suite: &FitSuite) -> String {
    let mut out = String::new();
    out.push_str("=== edugrowth - fit ===\n");

    for model in &suite.fits {
        match model {
            FittedModel::Linear(fit) => out.push_str(&format_linear(fit)),
            FittedModel::Forest(forest) => out.push_str(&format_forest(forest)),
        }
        out.push('\n');
    }
    for failure in &suite.failures {
        out.push_str(&format!("  (failed {}) {}\n", failure.model.display_name(), failure.reason));
    }
    out
}

fn format_linear(fit: &LinearFit) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} (n={}, df={}, R2={:.3}, adj R2={:.3}, sigma={:.3}, F={:.2} p={:.3e})\n",
        fit.kind.display_name(),
        fit.stats.n,
        fit.stats.df_residual,
        fit.stats.r_squared,
        fit.stats.adj_r_squared,
        fit.stats.sigma,
        fit.stats.f_statistic,
        fit.stats.f_p_value,
    ));
    out.push_str(
        format!(
            "  {:<20} {:>10} {:>10} {:>8} {:>10}\n",
            "term", "estimate", "std.err", "t", "p"
        )
        .trim_end(),
    );
    out.push('\n');
    for c in &fit.coefficients {
        out.push_str(
            format!(
                "  {:<20} {:>10.4} {:>10.4} {:>8.3} {:>10.3e} {}\n",
                c.term,
                c.estimate,
                c.std_error,
                c.t_stat,
                c.p_value,
                c.stars()
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

fn format_forest(forest: &RandomForest) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} (trees={}, mtry={}, min node size={}, n={})\n",
        ModelKind::Forest.display_name(),
        forest.trees.len(),
        forest.mtry,
        forest.min_node_size,
        forest.n_train
    ));
    for score in &forest.cv_scores {
        let chosen = if score.mtry == forest.mtry { "*" } else { " " };
        out.push_str(&format!("  {chosen} mtry={} CV RMSE={:.4}\n", score.mtry, score.rmse));
    }
    out.push_str("  importance (node purity increase):\n");
    for (feature, value) in crate::domain::FEATURES.iter().zip(forest.importance) {
        out.push_str(&format!("    {:<20} {:>12.3}\n", feature.field_name(), value));
    }
    out
}

/// Held-out metrics for every evaluated model.
pub fn format_metrics(results: &[(ModelKind, Metrics)]) -> String {
    let mut out = String::new();
    out.push_str("=== edugrowth - evaluate ===\n");
    out.push_str(format!("{:<16} {:>8} {:>10} {:>10} {:>10}\n", "model", "n_test", "RMSE", "R2", "MAE").trim_end());
    out.push('\n');
    for (kind, m) in results {
        out.push_str(
            format!(
                "{:<16} {:>8} {:>10.4} {:>10.4} {:>10.4}\n",
                kind.display_name(),
                m.n,
                m.rmse,
                m.r_squared,
                m.mae
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Descriptive statistics table.
pub fn format_summary(summaries: &[IndicatorSummary]) -> String {
    let mut out = String::new();
    out.push_str("=== edugrowth - describe (trimmed data) ===\n");
    out.push_str(
        format!(
            "{:<20} {:>6} {:>7} {:>9} {:>9} {:>9} {:>9} {:>9} {:>8}\n",
            "indicator", "n", "missing", "mean", "sd", "min", "median", "max", "cor(gdp)"
        )
        .trim_end(),
    );
    out.push('\n');
    for s in summaries {
        out.push_str(
            format!(
                "{:<20} {:>6} {:>7} {:>9} {:>9} {:>9} {:>9} {:>9} {:>8}\n",
                s.indicator.field_name(),
                s.n,
                s.missing,
                fmt_opt(s.mean, 3),
                fmt_opt(s.sd, 3),
                fmt_opt(s.min, 3),
                fmt_opt(s.median, 3),
                fmt_opt(s.max, 3),
                fmt_opt(s.cor_target, 3),
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(x) => format!("{x:.decimals$}"),
        None => "NA".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coef(estimate: f64, std_error: f64, p_value: f64) -> Coefficient {
        Coefficient {
            term: "education_spending".to_string(),
            estimate,
            std_error,
            t_stat: estimate / std_error,
            p_value,
        }
    }

    #[test]
    fn coefficient_cells_carry_stars() {
        assert_eq!(format_coefficient(&coef(0.5123, 0.0412, 1e-6)), "0.512 (0.041) ***");
        assert_eq!(format_coefficient(&coef(-0.2, 0.1, 0.04)), "-0.200 (0.100) *");
        assert_eq!(format_coefficient(&coef(0.01, 0.5, 0.9)), "0.010 (0.500)");
    }

    #[test]
    fn metrics_table_lists_each_model() {
        let m = Metrics {
            rmse: 2.0,
            r_squared: 0.1,
            mae: 1.5,
            n: 30,
        };
        let text = format_metrics(&[(ModelKind::Forest, m)]);
        assert!(text.contains("Random forest"));
        assert!(text.contains("2.0000"));
    }
}
