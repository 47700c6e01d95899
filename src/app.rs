//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - resolves them into a `PipelineConfig`
//! - dispatches to the stage functions in `pipeline`
//! - prints the terminal reports

use clap::Parser;
use log::info;

use crate::cli::{Command, PipelineArgs};
use crate::domain::{ForestParams, PipelineConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `edugrowth` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Clean(args) => handle_clean(&config_from_args(&args)?),
        Command::Describe(args) => handle_describe(&config_from_args(&args)?),
        Command::Fit(args) => handle_fit(&config_from_args(&args)?),
        Command::Evaluate(args) => handle_evaluate(&config_from_args(&args)?),
        Command::Run(args) => handle_run(&config_from_args(&args)?),
        Command::Stage { n, args } => {
            let config = config_from_args(&args)?;
            match n {
                1 => handle_clean(&config),
                2 => handle_describe(&config),
                3 => handle_fit(&config),
                4 => handle_evaluate(&config),
                other => Err(AppError::Config(format!("Unknown stage {other}; expected 1-4."))),
            }
        }
    }
}

fn handle_clean(config: &PipelineConfig) -> Result<(), AppError> {
    let output = pipeline::run_clean(config)?;
    println!("{}", crate::report::format_clean_report(&output.report));
    Ok(())
}

fn handle_describe(config: &PipelineConfig) -> Result<(), AppError> {
    let summaries = pipeline::run_describe(config)?;
    println!("{}", crate::report::format_summary(&summaries));
    Ok(())
}

fn handle_fit(config: &PipelineConfig) -> Result<(), AppError> {
    let run = pipeline::run_fit(config)?;
    println!("{}", crate::report::format_fit_summary(&run.suite));

    if !run.suite.failures.is_empty() {
        return Err(AppError::Fit(run.suite.failures));
    }
    Ok(())
}

fn handle_evaluate(config: &PipelineConfig) -> Result<(), AppError> {
    let results = pipeline::run_evaluate(config)?;
    println!("{}", crate::report::format_metrics(&results));
    Ok(())
}

/// All stages. Models that fit are still evaluated when another model
/// failed; the run then exits with the fit failure.
fn handle_run(config: &PipelineConfig) -> Result<(), AppError> {
    let run = pipeline::run_all(config)?;
    println!("{}", crate::report::format_clean_report(&run.clean.report));
    println!("{}", crate::report::format_summary(&run.summaries));
    println!("{}", crate::report::format_fit_summary(&run.fit.suite));
    println!("{}", crate::report::format_metrics(&run.evaluation));

    if !run.fit.suite.failures.is_empty() {
        return Err(AppError::Fit(run.fit.suite.failures));
    }
    info!("All stages complete; outputs in '{}'", config.out_dir.display());
    Ok(())
}

/// Validate CLI arguments and resolve them into a run configuration.
pub fn config_from_args(args: &PipelineArgs) -> Result<PipelineConfig, AppError> {
    if !(args.train_fraction > 0.0 && args.train_fraction < 1.0) {
        return Err(AppError::Config(format!(
            "--train-fraction must be strictly between 0 and 1 (got {}).",
            args.train_fraction
        )));
    }
    if args.strata == 0 {
        return Err(AppError::Config("--strata must be at least 1.".to_string()));
    }
    if args.trees == 0 {
        return Err(AppError::Config("--trees must be at least 1.".to_string()));
    }
    if args.folds < 2 {
        return Err(AppError::Config("--folds must be at least 2.".to_string()));
    }

    Ok(PipelineConfig {
        input_path: args.input.clone(),
        out_dir: args.out_dir.clone(),
        seed: args.seed,
        train_fraction: args.train_fraction,
        strata: args.strata,
        forest: ForestParams {
            n_trees: args.trees,
            folds: args.folds,
            seed: args.seed,
            ..ForestParams::default()
        },
    })
}
