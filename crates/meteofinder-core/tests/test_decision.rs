use std::path::PathBuf;

use meteofinder_core::decision::{decide, resolve_mode, ImageState, Mode, ModeSelection, Verdict};
use meteofinder_core::error::{MeteorError, RemoteError};
use meteofinder_core::lines::LineSegment;
use meteofinder_core::scoring::{Candidate, SegmentFeatures, SensitivityLevel};
use meteofinder_core::verify::{Classification, Confidence};

fn candidate(score: f32, level: u8) -> Candidate {
    Candidate {
        path: PathBuf::from("sky.jpg"),
        segment: LineSegment::new(0.0, 0.0, 120.0, 50.0, 100),
        score,
        level: SensitivityLevel::new(level).unwrap(),
        features: SegmentFeatures {
            length: 130.0,
            brightness: 0.8,
            background: 0.1,
            contrast: 0.7,
            curvature: 0.2,
            modulation_runs: 1,
            dropout: 0.0,
            red_hits: 0,
        },
    }
}

fn classification(is_meteor: bool) -> Classification {
    Classification {
        is_meteor,
        confidence: Confidence::High,
        description: "streak".into(),
    }
}

// ---------------------------------------------------------------------------
// Mode resolution
// ---------------------------------------------------------------------------

#[test]
fn test_default_selection_with_remote_is_hybrid() {
    let mode = resolve_mode(ModeSelection::default(), true).unwrap();
    assert_eq!(mode, Mode::Hybrid);
}

#[test]
fn test_hybrid_without_remote_runs_local_only() {
    let mode = resolve_mode(ModeSelection::default(), false).unwrap();
    assert_eq!(mode, Mode::LocalOnly);
}

#[test]
fn test_explicit_modes_ignore_remote_availability() {
    let local = ModeSelection {
        local: true,
        prefilter_only: false,
    };
    let prefilter = ModeSelection {
        local: false,
        prefilter_only: true,
    };
    assert_eq!(resolve_mode(local, true).unwrap(), Mode::LocalOnly);
    assert_eq!(resolve_mode(prefilter, true).unwrap(), Mode::PrefilterOnly);
    assert_eq!(resolve_mode(prefilter, false).unwrap(), Mode::PrefilterOnly);
}

#[test]
fn test_conflicting_mode_flags_are_rejected() {
    let both = ModeSelection {
        local: true,
        prefilter_only: true,
    };
    assert!(matches!(
        resolve_mode(both, true),
        Err(MeteorError::Configuration(_))
    ));
}

#[test]
fn test_mode_display_and_remote_use() {
    assert_eq!(Mode::Hybrid.to_string(), "hybrid");
    assert_eq!(Mode::LocalOnly.to_string(), "local-only");
    assert_eq!(Mode::PrefilterOnly.to_string(), "prefilter-only");
    assert!(Mode::Hybrid.uses_remote());
    assert!(!Mode::LocalOnly.uses_remote());
}

// ---------------------------------------------------------------------------
// Local decision
// ---------------------------------------------------------------------------

#[test]
fn test_no_candidate_is_rejected_in_every_mode() {
    for mode in [Mode::Hybrid, Mode::LocalOnly, Mode::PrefilterOnly] {
        assert_eq!(decide(None, mode), ImageState::Rejected);
    }
}

#[test]
fn test_hybrid_candidate_waits_for_the_verifier() {
    let c = candidate(0.8, 3);
    assert_eq!(decide(Some(&c), Mode::Hybrid), ImageState::Pending);
    assert_eq!(decide(Some(&c), Mode::LocalOnly), ImageState::AcceptedLocal);
    assert_eq!(decide(Some(&c), Mode::PrefilterOnly), ImageState::AcceptedLocal);
}

#[test]
fn test_remote_permit_decides_escalation() {
    let pending = decide(Some(&candidate(0.8, 3)), Mode::Hybrid);
    assert_eq!(pending.with_remote_permit(true), ImageState::Escalated);
    assert_eq!(pending.with_remote_permit(false), ImageState::AcceptedLocal);
}

#[test]
fn test_candidate_below_level_score_is_rejected() {
    // Level 1 needs 0.70.
    let c = candidate(0.65, 1);
    assert_eq!(decide(Some(&c), Mode::LocalOnly), ImageState::Rejected);
}

// ---------------------------------------------------------------------------
// After verification
// ---------------------------------------------------------------------------

#[test]
fn test_verification_outcomes_are_terminal() {
    let escalated = ImageState::Escalated;
    assert_eq!(
        escalated.after_verification(&Ok(classification(true))),
        ImageState::AcceptedRemote
    );
    assert_eq!(
        escalated.after_verification(&Ok(classification(false))),
        ImageState::Rejected
    );
    assert_eq!(
        escalated.after_verification(&Err(RemoteError::Timeout(60))),
        ImageState::EscalationFailed
    );
}

#[test]
fn test_escalated_only_resolves_to_remote_outcomes() {
    let outcomes = [
        Ok(classification(true)),
        Ok(classification(false)),
        Err(RemoteError::Unauthorized("401".into())),
        Err(RemoteError::RateLimited("429".into())),
        Err(RemoteError::Timeout(60)),
        Err(RemoteError::Transient("reset".into())),
        Err(RemoteError::Unknown("bad".into())),
    ];
    for outcome in &outcomes {
        let next = ImageState::Escalated.after_verification(outcome);
        assert!(
            matches!(
                next,
                ImageState::AcceptedRemote | ImageState::Rejected | ImageState::EscalationFailed
            ),
            "{outcome:?} led to {next:?}"
        );
        assert!(next.is_terminal());
    }
}

#[test]
fn test_verdicts_of_terminal_states() {
    assert_eq!(ImageState::Pending.verdict(), None);
    assert_eq!(ImageState::Rejected.verdict(), Some(Verdict::Rejected));
    assert_eq!(
        ImageState::EscalationFailed.verdict(),
        Some(Verdict::EscalationFailed)
    );
    assert!(Verdict::AcceptedLocal.is_accepted());
    assert!(Verdict::AcceptedRemote.is_accepted());
    assert!(!Verdict::EscalationFailed.is_accepted());
    assert!(!Verdict::Rejected.is_accepted());
}
