use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use meteofinder_core::pipeline::{sweep_levels, CancelToken, ProgressReporter};

use crate::files::find_images;
use crate::progress::BarReporter;
use crate::summary::print_sweep;

use super::load_config;

#[derive(Args)]
pub struct SweepArgs {
    /// Folder with the night-sky images
    pub folder: PathBuf,

    /// TOML config file for the detector settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the sweep as JSON
    #[arg(long)]
    pub json: bool,
}

/// Count local detections at every sensitivity level. Never calls the
/// verification service.
pub fn run(args: &SweepArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    config.validate()?;
    let images = find_images(&args.folder)?;

    let reporter: Arc<dyn ProgressReporter> = Arc::new(BarReporter::new());
    let report = sweep_levels(&images, &config.detector, reporter, &CancelToken::new());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_sweep(&report);
    }
    Ok(())
}
