//! `leoppp-core`: scenario-driven CLI front-end for the LEO GNSS PPP
//! pre-processor. Parses the scenario configuration, walks the
//! configured day range, and drives `leoppp-engine`'s preprocessor and
//! correction engine per epoch, writing PREPRO/CORR output files.

mod config;
mod error;
mod io;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use crate::config::Config;
use crate::error::AppError;

/// LEO GNSS PPP pre-processor: produces corrected pseudorange and
/// carrier-phase residuals from raw dual-frequency observations.
#[derive(Parser, Debug)]
#[command(name = "leoppp-core", version, about)]
struct Cli {
    /// Scenario root path: expects `CFG/`, `INP/{OBS,SP3,ATT,ATX,CLK,BIA}/`
    /// subdirectories and writes `OUT/{PPVE,CORR}/`.
    scenario_path: PathBuf,

    /// Logging verbosity; overridden by `RUST_LOG` if set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level)).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("fatal: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), AppError> {
    let cfg_path = cli.scenario_path.join("CFG").join("scenario.cfg");
    let config = Config::load(&cfg_path)?;

    log::info!(
        "scenario {:?}: {} to {}, NAV_SOLUTION={}",
        cli.scenario_path,
        config.ini_date,
        config.end_date,
        config.nav_solution
    );

    run::run_scenario(&cli.scenario_path, &config)
}
