//! MediBook command-line entry point.
//!
//! # Responsibility
//! - Resolve configuration from `MEDIBOOK_*` variables and bootstrap the
//!   core context (logging, migrations, admin seed).
//! - Print a deterministic status summary for local sanity checks.

use log::{error, info};
use medibook_core::{core_version, AppConfig, AppContext, AppError};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_start module=cli status=error error={}", err);
            eprintln!("medibook: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let context = AppContext::bootstrap(config)?;
    let config = context.config();

    println!("medibook_core version={}", core_version());
    println!("db_path={}", config.db_path.display());
    println!("schema_version={}", context.schema_version()?);
    println!(
        "admin_seed={}",
        config
            .admin
            .as_ref()
            .map_or("none", |seed| seed.username.as_str())
    );

    info!("event=cli_start module=cli status=ok");
    Ok(())
}
