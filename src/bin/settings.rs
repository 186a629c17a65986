//! Pipeline Schema Settings CLI
//!
//! Shows, scaffolds and checks the settings used by `pipeline-schema`.

use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand};
use pipeline_schemas::settings::SETTINGS_FILES;
use pipeline_schemas::Settings;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-settings")]
#[command(about = "Inspect and scaffold pipeline-schema settings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective settings as TOML
    Show {
        /// Settings file to layer over the defaults
        #[arg(short, long)]
        file: Option<String>,
    },

    /// Write a settings file with default values
    Init {
        /// Where to write
        #[arg(default_value = SETTINGS_FILES[0])]
        path: PathBuf,
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// Check that a settings file loads
    Validate {
        /// Settings file to check
        file: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Show { file } => {
            let settings = Settings::load_from(file.as_deref())?;
            print!("{}", toml::to_string_pretty(&settings)?);
            Ok(())
        }

        Commands::Init { path, force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to replace it)", path.display());
            }
            Settings::default().save(&path)?;
            println!("✅ Wrote default settings to {}", path.display());
            Ok(())
        }

        Commands::Validate { file } => {
            let settings = Settings::load_from(Some(&file))?;
            println!("✅ {} is valid", file);
            println!("   apply_defaults = {}", settings.parse.apply_defaults);
            println!("   auto_upgrade   = {}", settings.upgrade.auto_upgrade);
            println!("   reject_stale   = {}", settings.upgrade.reject_stale);
            println!("   format         = {:?}", settings.output.format);
            Ok(())
        }
    }
}
