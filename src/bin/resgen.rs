//! Resource Compiler CLI
//!
//! Usage:
//!   resgen resgen.toml generate
//!   resgen resgen.toml check
//!   resgen resgen.toml inspect messages.toml --mode values

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use resgen::{Compiler, GeneratorMode, Manifest};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "resgen")]
#[command(about = "Compile versioned resource definitions into Rust modules")]
struct Cli {
    /// Path to the run manifest
    manifest: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile every listed definition and write the generated files
    Generate,

    /// Report generated files that are missing, stale or edited by hand
    Check,

    /// Print the emission model of one definition as JSON
    Inspect {
        /// Definition file, relative to the manifest
        definition: PathBuf,

        #[arg(short, long, value_enum, default_value = "values")]
        mode: Mode,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Constants,
    Values,
}

impl From<Mode> for GeneratorMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Constants => GeneratorMode::Constants,
            Mode::Values => GeneratorMode::Values,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("resgen=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("resgen=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether the command succeeded
fn run(cli: Cli) -> anyhow::Result<bool> {
    let manifest = Manifest::load(&cli.manifest)?;
    let compiler = Compiler::from_manifest(&manifest);

    match cli.command {
        Commands::Generate => {
            let report = compiler.generate(&manifest);
            for path in &report.written {
                println!("wrote {}", path.display());
            }
            for failure in &report.failures {
                eprintln!(
                    "failed {} ({}): {}",
                    failure.definition.display(),
                    failure.mode,
                    failure.error
                );
            }
            println!(
                "{} written, {} unchanged, {} failed",
                report.written.len(),
                report.unchanged.len(),
                report.failures.len()
            );
            Ok(report.is_success())
        }
        Commands::Check => {
            let report = compiler.check(&manifest);
            for drift in &report.drift {
                println!(
                    "{:?}: {} (+{} -{})",
                    drift.kind,
                    drift.output.display(),
                    drift.insertions,
                    drift.deletions
                );
                if cli.verbose {
                    println!("{}", drift.diff);
                }
            }
            for failure in &report.failures {
                eprintln!(
                    "failed {} ({}): {}",
                    failure.definition.display(),
                    failure.mode,
                    failure.error
                );
            }
            if report.is_clean() {
                println!("{} files up to date", report.up_to_date.len());
            }
            Ok(report.is_clean())
        }
        Commands::Inspect { definition, mode } => {
            let model = compiler.compile_definition(&definition, mode.into())?;
            println!("{}", serde_json::to_string_pretty(&model)?);
            Ok(true)
        }
    }
}
