//! # vk-cereal
//!
//! CLI tool for generating the gfxstream Vulkan serialization layers.
//!
//! ## Usage
//!
//! ```bash
//! # Generate every module from a schema
//! vk-cereal generate --schema vk.json
//!
//! # Generate to a specific output directory
//! vk-cereal generate --schema vk.json --output ./cereal
//!
//! # Regenerate a single module
//! vk-cereal generate --schema vk.json --suppress VkEncoder
//!
//! # Dry run to preview changes
//! vk-cereal generate --schema vk.json --dry-run
//!
//! # Initialize configuration
//! vk-cereal init
//!
//! # Validate that the artifacts on disk are up-to-date
//! vk-cereal validate --schema vk.json
//! ```

use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use vk_cereal_cli::{
    config::{CliArgs, ConfigManager, EnvOverrides},
    error::CliError,
    loader::load_schema,
    report, runner,
};

#[derive(Parser)]
#[command(name = "vk-cereal")]
#[command(author, version, about = "Generate the gfxstream Vulkan serialization layers", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate every module from a schema
    Generate {
        /// Schema JSON file
        #[arg(short, long)]
        schema: PathBuf,

        /// Output directory for host and common modules
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output directory for guest encoder modules
        #[arg(long)]
        guest_encoder_dir: Option<PathBuf>,

        /// Output directory for host decoder modules
        #[arg(long)]
        host_decoder_dir: Option<PathBuf>,

        /// Regenerate only this module
        #[arg(long)]
        suppress: Option<String>,

        /// Generate this feature in addition to the built-in allow-list
        #[arg(long = "feature")]
        features: Vec<String>,

        /// Preview changes without writing files
        #[arg(long)]
        dry_run: bool,

        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Initialize a new vk-cereal configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "vk-cereal.toml")]
        output: PathBuf,

        /// Overwrite existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Validate that generated artifacts are up-to-date
    Validate {
        /// Schema JSON file
        #[arg(short, long)]
        schema: PathBuf,

        /// Output directory for host and common modules
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Install the fmt subscriber; `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "vk_cereal=debug,vk_cereal_cli=debug",
        _ => "vk_cereal=trace,vk_cereal_cli=trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Generate {
            schema,
            output,
            guest_encoder_dir,
            host_decoder_dir,
            suppress,
            features,
            dry_run,
            config,
        } => {
            let args = CliArgs {
                output,
                guest_encoder_dir,
                host_decoder_dir,
                dry_run: dry_run.then_some(true),
                suppress,
                extra_features: features,
            };
            cmd_generate(&schema, config.as_deref(), &args)
        }

        Commands::Init { output, force } => cmd_init(output, force),

        Commands::Validate {
            schema,
            output,
            config,
        } => {
            let args = CliArgs {
                output,
                ..Default::default()
            };
            cmd_validate(&schema, config.as_deref(), &args)
        }
    }
}

/// Generate command implementation.
fn cmd_generate(schema_path: &Path, config_path: Option<&Path>, args: &CliArgs) -> Result<(), CliError> {
    let config = ConfigManager::resolve(config_path, &EnvOverrides::from_env(), args)?;

    println!("{}", "Loading schema...".cyan());
    let schema = load_schema(schema_path)?;
    println!(
        "  Found {} feature(s)",
        schema.features.len().to_string().green()
    );

    if let Some(module) = &config.generation.suppress {
        println!("{} only {} is regenerated", "Suppression:".yellow(), module.bold());
    }

    println!("{}", "Generating modules...".cyan());
    let command_line = runner::regeneration_command(schema_path, &std::env::current_dir()?);
    let report = runner::generate(&config, &schema, &command_line)?;
    println!("{}", report::render_generation(&report));

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::PartialWrite {
            failed: report.failed().len() + report.fragment_failures().len(),
        })
    }
}

/// Init command implementation.
fn cmd_init(output: PathBuf, force: bool) -> Result<(), CliError> {
    if output.exists() && !force {
        println!(
            "{} Configuration file already exists: {}",
            "Error:".red(),
            output.display()
        );
        println!("  Use --force to overwrite");
        return Err(CliError::Validation(
            "Configuration file already exists".to_string(),
        ));
    }

    let content = ConfigManager::default_config_content();
    std::fs::write(&output, content)?;

    println!(
        "{} Created configuration file: {}",
        "✓".green(),
        output.display()
    );

    Ok(())
}

/// Validate command implementation.
fn cmd_validate(schema_path: &Path, config_path: Option<&Path>, args: &CliArgs) -> Result<(), CliError> {
    println!("{}", "Validating artifacts...".cyan());

    let config = ConfigManager::resolve(config_path, &EnvOverrides::from_env(), args)?;
    let schema = load_schema(schema_path)?;

    let command_line = runner::regeneration_command(schema_path, &std::env::current_dir()?);
    let validation = runner::validate(&config, &schema, &command_line)?;
    println!("{}", report::render_validation(&validation));

    if validation.is_up_to_date() {
        Ok(())
    } else {
        Err(CliError::Validation(format!(
            "{} artifact(s) are out of date",
            validation.stale.len() + validation.missing.len()
        )))
    }
}

/// Print an error with formatting.
fn print_error(error: &CliError) {
    eprintln!("{} {}", "Error:".red().bold(), error);
}
