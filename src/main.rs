use anyhow::{Result, bail};
use clap::Parser;
use log::{debug, info};

use docweave::cli::{Cli, Command};
use docweave::config::{CONFIG_FILENAME, Config};
use docweave::generator::Generator;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else if cli.config.as_path() == std::path::Path::new(CONFIG_FILENAME) {
        // No config file present: run with built-in defaults.
        Config::default()
    } else {
        bail!("config file {} not found", cli.config.display());
    };

    let level = if cli.verbose {
        "debug"
    } else {
        &config.logging.level
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    debug!("using config {}", cli.config.display());

    config.dry_run = config.dry_run || cli.dry_run;

    match cli.command {
        Command::Generate => {
            let summary = Generator::new(config)?.run()?;
            info!(
                "generated {} file(s) from {} spec(s) across {} document(s)",
                summary.files_written.len(),
                summary.specs,
                summary.documents_parsed
            );
        }
        Command::Validate => {
            config.dry_run = true;
            let summary = Generator::new(config)?.run()?;
            info!(
                "validation ok: {} document(s), {} spec(s)",
                summary.documents_parsed, summary.specs
            );
        }
    }

    Ok(())
}
