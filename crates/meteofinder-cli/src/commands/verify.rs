use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use clap::Args;
use meteofinder_core::decision::Mode;
use meteofinder_core::pipeline::{CancelToken, MeteorPipeline, ProgressReporter};
use meteofinder_core::scoring::SensitivityLevel;

use crate::files::{copy_into, find_candidates, images_to_copy, CopyTarget, CANDIDATES_FOLDER};
use crate::progress::BarReporter;
use crate::summary::{print_run_report, print_scan_header, print_verify_plan};

use super::{anthropic_classifier, api_key, load_config, API_KEY_VAR};

#[derive(Args)]
pub struct VerifyArgs {
    /// Folder whose Candidates/ sub-folder holds the staged images
    pub folder: PathBuf,

    /// Sensitivity used to re-locate the streak in each candidate. Defaults
    /// to 5, which keeps every candidate staged at any level.
    #[arg(short, long)]
    pub sensitivity: Option<u8>,

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

    /// List what would be verified and the estimated cost, call nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Print the full report as JSON instead of the summary
    #[arg(long)]
    pub json: bool,
}

/// Verify staged candidates remotely and copy the confirmed ones to Found/.
pub fn run(args: &VerifyArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    config.level = SensitivityLevel::try_from(args.sensitivity.unwrap_or(SensitivityLevel::MAX))?;
    config.mode = Mode::Hybrid;
    if let Some(max) = args.max_escalations {
        config.remote.limits.max_escalations = Some(max);
    }
    if let Some(n) = args.concurrency {
        config.remote.max_concurrency = n;
    }
    if args.crop {
        config.remote.anthropic.upload.crop_to_candidate = true;
    }
    config.validate()?;

    let candidates = find_candidates(&args.folder)?;
    if candidates.is_empty() {
        bail!(
            "{CANDIDATES_FOLDER}/ in {} holds no images. Run `meteofinder scan --candidates-only` first.",
            args.folder.display()
        );
    }

    if args.dry_run {
        print_verify_plan(&candidates, config.remote.limits.cost_per_call_usd);
        return Ok(());
    }

    let key = api_key()
        .ok_or_else(|| anyhow!("No valid API key found. Set {API_KEY_VAR} to verify candidates."))?;
    let classifier = anthropic_classifier(key, &config.remote.anthropic)?;

    if !args.json {
        print_scan_header(&args.folder, candidates.len(), config.mode, config.level);
    }
    let pipeline = MeteorPipeline::new(config, Some(classifier))?;
    let reporter: Arc<dyn ProgressReporter> = Arc::new(BarReporter::new());
    let report = pipeline.run(&candidates, reporter, &CancelToken::new())?;

    // Only remote confirmations leave the staging folder.
    let confirmed = images_to_copy(&report, CopyTarget::Found, true);
    let copied = copy_into(&args.folder, CopyTarget::Found, &confirmed)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_run_report(&report, Some((copied, CopyTarget::Found)));
    }
    Ok(())
}
