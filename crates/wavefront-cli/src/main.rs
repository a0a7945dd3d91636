//! Wavefront command-line interface.
//!
//! Run propagation jobs from TOML configuration files:
//! ```sh
//! wavefront run job.toml
//! wavefront validate job.toml
//! wavefront methods
//! ```

mod config;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use wavefront_core::types::{InterpolationMode, PropagationMethod};

#[derive(Parser)]
#[command(name = "wavefront")]
#[command(about = "Wavefront: planar optical field propagation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a propagation job from a TOML configuration file.
    Run {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file without propagating.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
    },
    /// List the available propagation methods and interpolation modes.
    Methods,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            println!("Wavefront Propagation");
            println!("=====================");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());

            let reading = runner::run_job(&job)?;

            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));
            runner::write_reading_csv(&reading, &out_dir.join("detector.csv"), &job)?;
            if job.output.save_json {
                runner::write_reading_json(&reading, &out_dir.join("detector.json"))?;
            }

            println!("Propagation complete.");
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            runner::validate_job(&job)?;
            println!("Configuration is valid: {}", config.display());
            Ok(())
        }
        Commands::Methods => {
            println!("Propagation methods:");
            for method in PropagationMethod::ALL {
                let kind = if method.is_paraxial() { "paraxial" } else { "exact" };
                let default = if method == PropagationMethod::default() { " (default)" } else { "" };
                println!("  {:<18} {}{}", method.name(), kind, default);
            }
            println!();
            println!("Interpolation modes:");
            for mode in InterpolationMode::ALL {
                let default = if mode == InterpolationMode::default() { " (default)" } else { "" };
                println!("  {}{}", mode.name(), default);
            }
            Ok(())
        }
    }
}
