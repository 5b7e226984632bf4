use meteofinder_core::decision::Mode;
use meteofinder_core::error::MeteorError;
use meteofinder_core::pipeline::{MeteorPipeline, PipelineStage, RunConfig};
use meteofinder_core::scoring::SensitivityLevel;

fn assert_invalid(config: &RunConfig, needle: &str) {
    match config.validate() {
        Err(MeteorError::Configuration(msg)) => {
            assert!(msg.contains(needle), "{msg:?} does not mention {needle:?}")
        }
        other => panic!("expected a configuration error, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Defaults and TOML
// ---------------------------------------------------------------------------

#[test]
fn test_default_config_is_valid() {
    let config = RunConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.mode, Mode::Hybrid);
    assert_eq!(config.level, SensitivityLevel::default());
    assert_eq!(config.remote.limits.max_escalations, None);
}

#[test]
fn test_toml_round_trip() {
    let mut config = RunConfig::default();
    config.level = SensitivityLevel::try_from(5).unwrap();
    config.mode = Mode::LocalOnly;
    config.remote.limits.max_escalations = Some(25);
    config.detector.scorer.reject_dotted = false;

    let text = toml::to_string_pretty(&config).unwrap();
    let parsed: RunConfig = toml::from_str(&text).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_empty_toml_gives_defaults() {
    let parsed: RunConfig = toml::from_str("").unwrap();
    assert_eq!(parsed, RunConfig::default());
}

#[test]
fn test_partial_toml_keeps_other_defaults() {
    let parsed: RunConfig = toml::from_str(
        r#"
        level = 4
        mode = "prefilter-only"

        [remote]
        max_concurrency = 6

        [remote.limits]
        max_escalations = 10
        "#,
    )
    .unwrap();

    assert_eq!(parsed.level.value(), 4);
    assert_eq!(parsed.mode, Mode::PrefilterOnly);
    assert_eq!(parsed.remote.max_concurrency, 6);
    assert_eq!(parsed.remote.limits.max_escalations, Some(10));
    let defaults = RunConfig::default();
    assert_eq!(parsed.remote.limits.fallback_after, defaults.remote.limits.fallback_after);
    assert_eq!(parsed.detector, defaults.detector);
}

#[test]
fn test_mode_names_are_kebab_case() {
    for (name, mode) in [
        ("hybrid", Mode::Hybrid),
        ("local-only", Mode::LocalOnly),
        ("prefilter-only", Mode::PrefilterOnly),
    ] {
        let parsed: RunConfig = toml::from_str(&format!("mode = \"{name}\"")).unwrap();
        assert_eq!(parsed.mode, mode);
        assert_eq!(mode.to_string(), name);
    }
    assert!(toml::from_str::<RunConfig>("mode = \"LocalOnly\"").is_err());
}

#[test]
fn test_out_of_range_level_fails_to_parse() {
    assert!(toml::from_str::<RunConfig>("level = 0").is_err());
    assert!(toml::from_str::<RunConfig>("level = 6").is_err());
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn test_zero_concurrency_is_invalid() {
    let mut config = RunConfig::default();
    config.remote.max_concurrency = 0;
    assert_invalid(&config, "max_concurrency");
}

#[test]
fn test_zero_edge_threshold_is_invalid() {
    let mut config = RunConfig::default();
    config.detector.edges.threshold = 0.0;
    assert_invalid(&config, "edges.threshold");
}

#[test]
fn test_nan_blur_is_invalid() {
    let mut config = RunConfig::default();
    config.detector.edges.blur_sigma = f32::NAN;
    assert_invalid(&config, "blur_sigma");
}

#[test]
fn test_zero_votes_is_invalid() {
    let mut config = RunConfig::default();
    config.detector.lines.min_votes = 0;
    assert_invalid(&config, "min_votes");
}

#[test]
fn test_axis_exclusion_range() {
    let mut config = RunConfig::default();
    config.detector.scorer.axis_exclusion_deg = 45.0;
    assert_invalid(&config, "axis_exclusion_deg");
    config.detector.scorer.axis_exclusion_deg = 3.0;
    assert!(config.validate().is_ok());
}

#[test]
fn test_star_trail_family_needs_two_lines() {
    let mut config = RunConfig::default();
    config.detector.scorer.star_trail_family = 1;
    assert_invalid(&config, "star_trail_family");
}

#[test]
fn test_zero_fallback_is_invalid() {
    let mut config = RunConfig::default();
    config.remote.limits.fallback_after = 0;
    assert_invalid(&config, "fallback_after");
}

#[test]
fn test_negative_cost_is_invalid() {
    let mut config = RunConfig::default();
    config.remote.limits.cost_per_call_usd = -0.5;
    assert_invalid(&config, "cost_per_call_usd");
}

#[test]
fn test_zero_upload_size_is_invalid() {
    let mut config = RunConfig::default();
    config.remote.anthropic.upload.max_bytes = 0;
    assert_invalid(&config, "upload");
}

#[test]
fn test_pipeline_refuses_invalid_config() {
    let mut config = RunConfig::default();
    config.remote.anthropic.timeout_secs = 0;
    assert!(MeteorPipeline::new(config, None).is_err());
}

#[test]
fn test_zero_escalation_cap_is_allowed() {
    let mut config = RunConfig::default();
    config.remote.limits.max_escalations = Some(0);
    assert!(config.validate().is_ok());
}

// ---------------------------------------------------------------------------
// PipelineStage Display
// ---------------------------------------------------------------------------

#[test]
fn test_pipeline_stage_display() {
    assert_eq!(PipelineStage::Loading.to_string(), "Loading images");
    assert_eq!(PipelineStage::EdgeExtraction.to_string(), "Extracting edges");
    assert_eq!(PipelineStage::LineDetection.to_string(), "Detecting lines");
    assert_eq!(PipelineStage::Scoring.to_string(), "Scoring candidates");
    assert_eq!(PipelineStage::Verifying.to_string(), "Verifying candidates");
    assert_eq!(PipelineStage::Aggregating.to_string(), "Collecting results");
}
