//! CLI runner: load a scenario, run it day by day, write the CSV report.

use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;

use crate::error::EpisimError;
use crate::log::{info, set_log_level, LevelFilter};
use crate::report::DailyReport;
use crate::scenario::Scenario;

/// Command line arguments for the simulation runner.
#[derive(Parser, Debug)]
#[command(name = "episim", about = "Agent-based epidemic micro-simulation")]
pub struct BaseArgs {
    /// Scenario file (JSON)
    pub scenario: PathBuf,

    /// Random seed, overriding the scenario value
    #[arg(short, long)]
    pub random_seed: Option<u64>,

    /// Number of days to simulate, overriding the scenario value
    #[arg(short, long)]
    pub days: Option<u32>,

    /// Path for the per-day CSV report
    #[arg(short, long = "output")]
    pub output_path: Option<PathBuf>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

fn configure_logging(args: &BaseArgs) -> Result<(), EpisimError> {
    let level = match &args.log_level {
        Some(level) => LevelFilter::from_str(level)
            .map_err(|_| EpisimError::from(format!("invalid log level: {level}")))?,
        None => match args.verbose {
            0 => LevelFilter::Error,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        },
    };
    set_log_level(level);
    Ok(())
}

/// Parses the command line and runs the scenario to completion.
///
/// # Errors
/// Returns an error if the scenario cannot be loaded or the simulation
/// enters the failed state.
pub fn run_with_args() -> Result<(), Box<dyn std::error::Error>> {
    let args = BaseArgs::parse();
    run(args)
}

/// Runs a scenario with already-parsed arguments.
///
/// # Errors
/// Returns an error if the scenario cannot be loaded or the simulation
/// enters the failed state.
pub fn run(args: BaseArgs) -> Result<(), Box<dyn std::error::Error>> {
    configure_logging(&args)?;

    let mut scenario = Scenario::from_json_file(&args.scenario)?;
    if let Some(seed) = args.random_seed {
        scenario.random_seed = seed;
    }
    let days = args.days.unwrap_or(scenario.simulation_days);

    let mut context = scenario.build()?;
    let mut report = match &args.output_path {
        Some(path) => Some(DailyReport::create(path)?),
        None => None,
    };

    info!(
        "simulating {days} days over {} people (seed {})",
        context.population().len(),
        scenario.random_seed
    );

    for _ in 0..days {
        let state = context.generate_state();
        if let Some(report) = report.as_mut() {
            report.write_day(&state)?;
        }
        context.iterate()?;
    }

    let state = context.generate_state();
    if let Some(report) = report.as_mut() {
        report.write_day(&state)?;
    }
    println!(
        "{}: {} infected to date, {} currently infected, {} dead, {} recovered, r {:.2}",
        context.date(),
        state.total_all_infected(),
        state.total_infected(),
        state.total_dead(),
        state.total_recovered(),
        state.r,
    );
    Ok(())
}
