//! Command-line parsing for the education spending vs. GDP growth pipeline.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the data and modeling code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{DEFAULT_FOLDS, DEFAULT_SEED, DEFAULT_STRATA, DEFAULT_TRAIN_FRACTION, DEFAULT_TREES};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "edugrowth",
    version,
    about = "Education spending vs. GDP growth: clean, fit and evaluate a country-year panel"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Reshape the raw wide indicator panel into `cleaned.csv`.
    Clean(PipelineArgs),
    /// Print and write descriptive statistics of the trimmed data.
    Describe(PipelineArgs),
    /// Fit the baseline, extended and random forest models on the training split.
    Fit(PipelineArgs),
    /// Score saved models on the held-out test split.
    Evaluate(PipelineArgs),
    /// Run clean, describe, fit and evaluate in order.
    Run(PipelineArgs),
    /// Run a single stage by number (1 clean, 2 describe, 3 fit, 4 evaluate).
    Stage {
        #[arg(value_parser = clap::value_parser!(u8).range(1..=4))]
        n: u8,

        #[command(flatten)]
        args: PipelineArgs,
    },
}

/// Options shared by every stage.
#[derive(Debug, Args, Clone)]
pub struct PipelineArgs {
    /// Raw wide-format indicator CSV.
    #[arg(long, default_value = "data/raw.csv")]
    pub input: PathBuf,

    /// Directory for every stage output.
    #[arg(long, default_value = "output")]
    pub out_dir: PathBuf,

    /// Seed for the train/test split and the random forest.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Fraction of model-ready rows assigned to training.
    #[arg(long, default_value_t = DEFAULT_TRAIN_FRACTION)]
    pub train_fraction: f64,

    /// Number of target quantile strata for the split.
    #[arg(long, default_value_t = DEFAULT_STRATA)]
    pub strata: usize,

    /// Trees grown in the random forest.
    #[arg(long, default_value_t = DEFAULT_TREES)]
    pub trees: usize,

    /// Cross-validation folds for tuning `mtry`.
    #[arg(long, default_value_t = DEFAULT_FOLDS)]
    pub folds: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_protocol() {
        let cli = Cli::parse_from(["edugrowth", "fit"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.input, PathBuf::from("data/raw.csv"));
        assert_eq!(args.out_dir, PathBuf::from("output"));
        assert_eq!(args.seed, 123);
        assert_eq!(args.train_fraction, 0.7);
        assert_eq!(args.trees, 500);
        assert_eq!(args.folds, 5);
    }

    #[test]
    fn stage_number_is_range_checked() {
        let cli = Cli::parse_from(["edugrowth", "stage", "3", "--seed", "7"]);
        match cli.command {
            Command::Stage { n, args } => {
                assert_eq!(n, 3);
                assert_eq!(args.seed, 7);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(Cli::try_parse_from(["edugrowth", "stage", "5"]).is_err());
    }
}
