//! Blood donation centre CLI

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use donor_centre::report::write_sweep_csv;
use donor_centre::{CentreConfig, Error, run, sweep_chairs};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "donor_centre")]
#[command(about = "Discrete event simulation of a walk-in blood donation centre")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate one day and print the report
    Run {
        /// TOML file overriding the default configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Minutes to simulate
        #[arg(long)]
        horizon: Option<usize>,

        /// Number of donation chairs
        #[arg(long)]
        chairs: Option<usize>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Also write the JSON report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Simulate one day per chair count, in parallel
    Sweep {
        /// TOML file overriding the default configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long, default_value = "1")]
        chairs_from: usize,

        #[arg(long, default_value = "8")]
        chairs_to: usize,

        /// Worker threads (defaults to one per core)
        #[arg(long)]
        threads: Option<usize>,

        /// Also write one CSV row per chair count to this file
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Print the default configuration as TOML
    Defaults,
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(path: Option<&Path>) -> Result<CentreConfig, Error> {
    match path {
        Some(path) => CentreConfig::load(path),
        None => Ok(CentreConfig::default()),
    }
}

fn execute(command: Commands) -> Result<(), Error> {
    match command {
        Commands::Run {
            config,
            seed,
            horizon,
            chairs,
            json,
            output,
        } => {
            init_tracing("info");

            let mut config = load(config.as_deref())?;
            if let Some(seed) = seed {
                config.seed = seed;
            }
            if let Some(horizon) = horizon {
                config.horizon = horizon;
            }
            if let Some(chairs) = chairs {
                config.chairs = chairs;
            }

            let report = run(config)?;
            if let Some(path) = output {
                report.write_json(path)?;
            }
            if json {
                println!("{}", report.to_json()?);
            } else {
                print!("{}", report);
                println!("{:=^80}", " Blood donation centre is closed for the day ");
            }
        }

        Commands::Sweep {
            config,
            chairs_from,
            chairs_to,
            threads,
            csv,
        } => {
            init_tracing("warn");

            let config = load(config.as_deref())?;
            let results = sweep_chairs(&config, chairs_from..=chairs_to, threads)?;
            if let Some(path) = csv {
                write_sweep_csv(path, &results)?;
            }

            println!("{:>6} {:>8} {:>10} {:>15}", "chairs", "donors", "blood mL", "chair mean wait");
            for (chairs, result) in results {
                match result {
                    Ok(report) => {
                        let mean_wait = report
                            .pool("chair")
                            .and_then(|pool| pool.mean_wait)
                            .map(|minutes| format!("{:.1}", minutes))
                            .unwrap_or_else(|| "-".to_string());
                        println!(
                            "{:>6} {:>8} {:>10} {:>15}",
                            chairs, report.total_donors, report.total_blood_ml, mean_wait
                        );
                    }
                    Err(message) => println!("{:>6} failed: {}", chairs, message),
                }
            }
        }

        Commands::Defaults => {
            print!("{}", CentreConfig::default().to_toml_string()?);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
