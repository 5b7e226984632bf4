mod commands;
mod files;
mod progress;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use meteofinder_core::scoring::SensitivityLevel;
use tracing_subscriber::EnvFilter;

fn levels_help() -> String {
    let mut help = String::from("Sensitivity levels:");
    for level in SensitivityLevel::all() {
        help.push_str(&format!("\n  {}  {}", level.value(), level.description()));
    }
    help
}

#[derive(Parser)]
#[command(name = "meteofinder", about = "Find meteors in night-sky photographs")]
#[command(version, after_help = levels_help())]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a folder and copy meteor images into Found/ (or Candidates/)
    Scan(commands::scan::ScanArgs),
    /// Verify staged candidates and copy confirmed meteors into Found/
    Verify(commands::verify::VerifyArgs),
    /// Run the local pre-filter at every sensitivity level
    Sweep(commands::sweep::SweepArgs),
    /// Show per-segment measurements and rejection reasons
    Diagnose(commands::diagnose::DiagnoseArgs),
    /// Print or save the default configuration
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Scan(args) => commands::scan::run(args),
        Commands::Verify(args) => commands::verify::run(args),
        Commands::Sweep(args) => commands::sweep::run(args),
        Commands::Diagnose(args) => commands::diagnose::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
