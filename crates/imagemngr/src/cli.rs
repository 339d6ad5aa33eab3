//! Command line interface for checking image manager configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{ConfigLoader, ConfigValidator, ServiceConfig, DEFAULT_ENV_PREFIX};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use types::utils::sanitize_for_logging;
use types::ImageManagerError;

#[derive(Parser, Debug)]
#[command(name = "imagemngr", version, about = "Image manager configuration tool")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load and validate a configuration file, then print the effective config
    Check {
        /// Configuration file (.json, .yaml or .yml)
        #[arg(short, long, env = "CONFIG_PATH", default_value = "imagemanager.json")]
        config: PathBuf,

        /// Prefix of environment variables that override file values
        #[arg(long, default_value = DEFAULT_ENV_PREFIX)]
        env_prefix: String,

        /// Fail when advisory warnings are found
        #[arg(long)]
        strict: bool,
    },

    /// Print the configuration JSON Schema
    Schema,

    /// Write an example configuration file
    Example {
        /// Output path; the extension selects JSON or YAML
        #[arg(short, long, default_value = "imagemanager.json")]
        output: PathBuf,
    },
}

pub fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Check {
            config,
            env_prefix,
            strict,
        } => {
            let loaded = check(&config, &env_prefix, strict)?;
            let rendered = serde_json::to_string_pretty(&loaded)
                .context("Failed to render configuration")?;
            println!("{}", rendered);
        }
        Commands::Schema => {
            let rendered = serde_json::to_string_pretty(&config::json_schema())
                .context("Failed to render schema")?;
            println!("{}", rendered);
        }
        Commands::Example { output } => {
            ConfigLoader::create_example(&output).with_context(|| {
                format!("Failed to write example configuration to {}", output.display())
            })?;
            info!("Example configuration written to {}", output.display());
        }
    }
    Ok(())
}

/// Load a configuration file and run the advisory checks over it
pub fn check(path: &Path, env_prefix: &str, strict: bool) -> Result<ServiceConfig> {
    let loaded = ConfigLoader::new()
        .with_env_prefix(env_prefix)
        .load_file(path)
        .map_err(ImageManagerError::from)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

    info!("Worker threads: {}", loaded.worker_threads());
    info!(
        "Default image: {} ({})",
        sanitize_for_logging(loaded.default_image_remote()),
        loaded.default_image_format()
    );
    info!(
        "Pull update time: {}s, expiration timeout: {}",
        loaded.pull_update_time(),
        loaded.image_expiration_timeout()
    );

    let report = ConfigValidator::validate(&loaded);
    for issue in &report.warnings {
        warn!(field = %issue.field, "{}", issue.message);
    }
    info!("{}", report.summary());

    if strict && report.has_warnings() {
        return Err(ImageManagerError::StrictValidation {
            warnings: report.warnings.len(),
        }
        .into());
    }

    Ok(loaded)
}
