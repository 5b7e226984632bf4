use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Args;
use meteofinder_core::pipeline::diagnose_image;
use meteofinder_core::scoring::SensitivityLevel;

use crate::summary::print_diagnosis;

use super::load_config;

#[derive(Args)]
pub struct DiagnoseArgs {
    /// Images to inspect
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// Sensitivity level used for the level-dependent checks
    #[arg(short, long)]
    pub sensitivity: Option<u8>,

    /// TOML config file for the detector settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the measurements as JSON
    #[arg(long)]
    pub json: bool,
}

/// Show what the pre-filter measured on each segment and why it was rejected.
pub fn run(args: &DiagnoseArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(level) = args.sensitivity {
        config.level = SensitivityLevel::try_from(level)?;
    }
    config.validate()?;

    for path in &args.images {
        let diagnosis = diagnose_image(path, &config.detector, config.level)
            .map_err(|f| anyhow!("{}: {} failed: {}", path.display(), f.stage, f.cause))?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&diagnosis)?);
        } else {
            print_diagnosis(path, config.level, &diagnosis);
        }
    }
    println!();
    Ok(())
}
