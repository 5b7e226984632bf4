use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use meteofinder_core::decision::{resolve_mode, Mode, ModeSelection};
use meteofinder_core::pipeline::{CancelToken, MeteorPipeline, ProgressReporter};
use meteofinder_core::scoring::SensitivityLevel;

use crate::files::{copy_into, find_images, images_to_copy, CopyTarget};
use crate::progress::BarReporter;
use crate::summary::{print_run_report, print_scan_header};

use super::{anthropic_classifier, api_key, load_config, API_KEY_VAR};

#[derive(Args)]
pub struct ScanArgs {
    /// Folder with the night-sky images
    pub folder: PathBuf,

    /// Sensitivity level, 1 (strict) to 5 (permissive)
    #[arg(short, long)]
    pub sensitivity: Option<u8>,

    /// Skip remote verification and accept local candidates
    #[arg(long)]
    pub local: bool,

    /// Only list local candidates, copy nothing
    #[arg(long)]
    pub prefilter_only: bool,

    /// Run the local pre-filter only and stage candidates in Candidates/
    /// for `meteofinder verify`
    #[arg(long, conflicts_with = "prefilter_only")]
    pub candidates_only: bool,

    /// TOML config file (see `meteofinder config`)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Maximum remote verifications for this run
    #[arg(long)]
    pub max_escalations: Option<usize>,

    /// Remote verifications in flight at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Upload only a crop around the detected streak
    #[arg(long)]
    pub crop: bool,

    /// Print the full report as JSON instead of the summary
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &ScanArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(level) = args.sensitivity {
        config.level = SensitivityLevel::try_from(level)?;
    }
    if let Some(max) = args.max_escalations {
        config.remote.limits.max_escalations = Some(max);
    }
    if let Some(n) = args.concurrency {
        config.remote.max_concurrency = n;
    }
    if args.crop {
        config.remote.anthropic.upload.crop_to_candidate = true;
    }

    let selection = ModeSelection {
        local: args.local || args.candidates_only || config.mode == Mode::LocalOnly,
        prefilter_only: args.prefilter_only || config.mode == Mode::PrefilterOnly,
    };
    let classifier = if selection.local || selection.prefilter_only {
        None
    } else {
        match api_key() {
            Some(key) => Some(anthropic_classifier(key, &config.remote.anthropic)?),
            None => {
                eprintln!("No valid API key found. Running in local-only mode (set {API_KEY_VAR} to verify candidates).");
                None
            }
        }
    };
    config.mode = resolve_mode(selection, classifier.is_some())?;

    let images = find_images(&args.folder)?;
    if !args.json {
        print_scan_header(&args.folder, images.len(), config.mode, config.level);
        if images.is_empty() {
            println!("  No images found.");
            return Ok(());
        }
    }

    let pipeline = MeteorPipeline::new(config, classifier)?;
    let reporter: Arc<dyn ProgressReporter> = Arc::new(BarReporter::new());
    let report = pipeline.run(&images, reporter, &CancelToken::new())?;

    let copied = match CopyTarget::for_scan(report.mode, args.candidates_only) {
        Some(target) => {
            let images = images_to_copy(&report, target, false);
            Some((copy_into(&args.folder, target, &images)?, target))
        }
        None => None,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_run_report(&report, copied);
    }
    Ok(())
}
