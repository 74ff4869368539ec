mod config;
mod executors;
mod params;

use clap::Parser;
use config::SubmitterConfig;
use executors::Executors;
use params::ParamReader;
use std::{
    path::{Path, PathBuf},
    process::exit,
};
use tracing::{debug, error};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_CONFIG_PATH: &str = "qbatch.yml";

#[derive(Parser)]
#[command(
    name = "qbatch",
    version,
    about = "Submit a batch of scheduler jobs from a parameter file"
)]
struct CliArgs {
    /// Submitter config file (defaults to qbatch.yml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Parameter file with one WEEK,SOURCE,DATA record per line (overrides the config)
    #[arg(short, long)]
    params: Option<PathBuf>,

    /// Print submission commands instead of running them
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

fn load_config(args: &CliArgs) -> SubmitterConfig {
    let path = match &args.config {
        Some(path) => path.as_path(),
        None => {
            let fallback = Path::new(DEFAULT_CONFIG_PATH);
            if !fallback.is_file() {
                // the tool stays usable without a config file, --params alone is enough
                debug!("No {DEFAULT_CONFIG_PATH} found, using built-in defaults");
                return SubmitterConfig::default();
            }

            fallback
        }
    };

    match SubmitterConfig::load(path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config from {}: {e}", path.display());
            exit(1)
        }
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(filter).init();

    let args = CliArgs::parse();
    let mut config = load_config(&args);

    if let Some(params) = args.params {
        config.parameters.path = params;
    }
    if args.dry_run {
        config.executor.name = "dry-run".to_owned();
    }

    if config.preflight_checks() {
        error!("Aborting, the config did not pass the preflight checks");
        exit(1)
    }

    let executor = match Executors::load(&config) {
        Ok(executor) => executor,
        Err(e) => {
            error!("Failed to load executor: {e}");
            exit(1)
        }
    };

    let records = match ParamReader::open(&config.parameters.path) {
        Ok(records) => records,
        Err(e) => {
            error!(
                "Failed to open parameter file {}: {e}",
                config.parameters.path.display()
            );
            exit(1)
        }
    };

    match executor.execute(records) {
        Ok(_) => println!("Done submitting jobs!"),
        Err(e) => {
            error!("Submission run aborted: {e}");
            exit(1)
        }
    }
}
