//! Pipeline Schema CLI
//!
//! Probes, validates and upgrades pipeline config documents.
//!
//! Usage:
//!   pipeline-schema validate pipeline.yaml
//!   pipeline-schema fix pipeline.yaml --diff
//!   cat pipeline.yaml | pipeline-schema probe -

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use pipeline_schemas::settings::OutputFormat;
use pipeline_schemas::{
    probe_api_version, read_configuration, SchemaRegistry, Settings, VersionedConfig,
};
use similar::{ChangeTag, TextDiff};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pipeline-schema")]
#[command(about = "Validate and upgrade versioned pipeline configs")]
struct Cli {
    /// Settings file (overrides pipeline-schemas.toml)
    #[arg(short, long)]
    settings: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the api version a document declares
    Probe {
        /// Config file, or - for stdin
        file: PathBuf,
    },

    /// Parse and validate a document
    Validate {
        /// Config file, or - for stdin
        file: PathBuf,
        /// Fail when the document is not the latest version
        #[arg(long)]
        reject_stale: bool,
    },

    /// Check that a document is the latest version
    Check {
        /// Config file, or - for stdin
        file: PathBuf,
    },

    /// Upgrade a document to the latest version
    Fix {
        /// Config file, or - for stdin
        file: PathBuf,
        /// Write the upgraded document back to the file
        #[arg(long, conflicts_with = "diff")]
        overwrite: bool,
        /// Print a line diff instead of the upgraded document
        #[arg(long)]
        diff: bool,
    },

    /// List registered schema versions
    Versions,
}

fn main() {
    let cli = Cli::parse();

    let settings = match Settings::load_from(cli.settings.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: loading settings: {}", e);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli.command, &settings) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands, settings: &Settings) -> anyhow::Result<()> {
    let registry = SchemaRegistry::builtin();

    match command {
        Commands::Probe { file } => {
            let bytes = read_configuration(&file)?;
            println!("{}", probe_api_version(&bytes)?);
            Ok(())
        }

        Commands::Validate { file, reject_stale } => {
            let bytes = read_configuration(&file)?;
            let cfg = registry
                .parse_config(&bytes, settings.parse.apply_defaults)
                .with_context(|| format!("validating {}", file.display()))?;

            if reject_stale || settings.upgrade.reject_stale {
                registry.check_version_is_latest(cfg.version())?;
            }

            let version = cfg.version();
            if settings.upgrade.auto_upgrade && version != registry.latest() {
                let upgraded = registry
                    .upgrade_to_latest(cfg)
                    .with_context(|| format!("upgrading {}", file.display()))?;
                println!(
                    "✅ {} - valid {} (upgrades cleanly to {})",
                    file.display(),
                    version,
                    upgraded.version()
                );
            } else {
                println!("✅ {} - valid {}", file.display(), version);
            }
            Ok(())
        }

        Commands::Check { file } => {
            let bytes = read_configuration(&file)?;
            let version = probe_api_version(&bytes)?;
            registry.check_version_is_latest(&version)?;
            println!("✅ {} - {} is the latest version", file.display(), version);
            Ok(())
        }

        Commands::Fix {
            file,
            overwrite,
            diff,
        } => fix(registry, settings, &file, overwrite, diff),

        Commands::Versions => {
            for entry in registry.entries() {
                if entry.api_version == registry.latest() {
                    println!("{} (latest)", entry.api_version);
                } else {
                    println!("{}", entry.api_version);
                }
            }
            Ok(())
        }
    }
}

/// Upgrade without applying defaults, so only what the author wrote is carried
fn fix(
    registry: &SchemaRegistry,
    settings: &Settings,
    file: &Path,
    overwrite: bool,
    diff: bool,
) -> anyhow::Result<()> {
    let bytes = read_configuration(file)?;
    let cfg = registry
        .parse_config(&bytes, false)
        .with_context(|| format!("parsing {}", file.display()))?;

    let from = cfg.version();
    if from == registry.latest() {
        eprintln!("{} is already version {}", file.display(), from);
        return Ok(());
    }

    let upgraded = registry
        .upgrade_to_latest(cfg)
        .with_context(|| format!("upgrading {}", file.display()))?;
    let rendered = render(upgraded.as_ref(), settings.output.format)?;

    if diff {
        let original = String::from_utf8_lossy(&bytes);
        print_diff(&original, &rendered);
    } else if overwrite {
        if file == Path::new(pipeline_schemas::source::STDIN) {
            bail!("cannot overwrite stdin");
        }
        fs::write(file, &rendered).with_context(|| format!("writing {}", file.display()))?;
        debug!(path = %file.display(), "wrote upgraded config");
        eprintln!("✅ {} upgraded from {} to {}", file.display(), from, upgraded.version());
    } else {
        print!("{}", rendered);
    }
    Ok(())
}

fn render(cfg: &dyn VersionedConfig, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Yaml => cfg.to_yaml()?,
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(&cfg.to_value()?)?;
            json.push('\n');
            json
        }
    })
}

fn print_diff(old: &str, new: &str) {
    let diff = TextDiff::from_lines(old, new);
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => " ",
        };
        print!("{}{}", sign, change.value());
        if change.missing_newline() {
            println!();
        }
    }
}
