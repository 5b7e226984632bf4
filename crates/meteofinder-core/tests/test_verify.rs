mod common;

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use approx::assert_relative_eq;

use meteofinder_core::error::RemoteError;
use meteofinder_core::lines::LineSegment;
use meteofinder_core::verify::{
    prepare_upload, Classification, Confidence, MeteorClassifier, RemoteVerifier, UploadSettings,
    VerificationRequest, VerifierSettings,
};

/// Replies from a script, then `Ok(meteor)` once the script runs out.
struct ScriptedClassifier {
    script: Mutex<VecDeque<Result<Classification, RemoteError>>>,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    fn new(script: Vec<Result<Classification, RemoteError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MeteorClassifier for ScriptedClassifier {
    fn name(&self) -> &str {
        "scripted"
    }

    fn classify(&self, _request: &VerificationRequest) -> Result<Classification, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(meteor(true)))
    }
}

fn meteor(is_meteor: bool) -> Classification {
    Classification {
        is_meteor,
        confidence: Confidence::Medium,
        description: "test".into(),
    }
}

fn request() -> VerificationRequest {
    VerificationRequest {
        path: PathBuf::from("sky.jpg"),
        segment: None,
        analysis_scale: 1.0,
        local_score: 0.8,
    }
}

fn fast_settings() -> VerifierSettings {
    VerifierSettings {
        min_interval_ms: 0,
        ..Default::default()
    }
}

fn verifier(
    classifier: &Arc<ScriptedClassifier>,
    settings: VerifierSettings,
) -> RemoteVerifier {
    RemoteVerifier::new(Arc::clone(classifier) as Arc<dyn MeteorClassifier>, settings)
}

// ---------------------------------------------------------------------------
// Outcomes and accounting
// ---------------------------------------------------------------------------

#[test]
fn test_confirmed_and_refuted_are_counted() {
    let classifier = ScriptedClassifier::new(vec![Ok(meteor(true)), Ok(meteor(false))]);
    let v = verifier(&classifier, fast_settings());

    assert_eq!(v.verify(&request()), Some(Ok(meteor(true))));
    assert_eq!(v.verify(&request()), Some(Ok(meteor(false))));

    let budget = v.budget();
    assert_eq!(budget.escalations, 2);
    assert_eq!(budget.attempts, 2);
    assert_eq!(budget.confirmed, 1);
    assert_eq!(budget.refuted, 1);
    assert_eq!(budget.failed, 0);
    assert_eq!(v.classifier_name(), "scripted");
}

#[test]
fn test_escalation_is_counted_even_when_the_call_fails() {
    let classifier = ScriptedClassifier::new(vec![Err(RemoteError::Unknown("boom".into()))]);
    let v = verifier(&classifier, fast_settings());

    assert!(matches!(v.verify(&request()), Some(Err(RemoteError::Unknown(_)))));
    let budget = v.budget();
    assert_eq!(budget.escalations, 1);
    assert_eq!(budget.failed, 1);
}

#[test]
fn test_try_begin_counts_without_calling() {
    let classifier = ScriptedClassifier::new(vec![]);
    let v = verifier(&classifier, fast_settings());
    assert!(v.try_begin());
    assert_eq!(v.budget().escalations, 1);
    assert_eq!(classifier.calls(), 0);
}

#[test]
fn test_claimed_call_is_counted_once() {
    let classifier = ScriptedClassifier::new(vec![Ok(meteor(false))]);
    let v = verifier(&classifier, fast_settings());
    assert!(v.try_begin());
    assert_eq!(v.call(&request()), Ok(meteor(false)));

    let budget = v.budget();
    assert_eq!(budget.escalations, 1);
    assert_eq!(budget.refuted, 1);
    assert_eq!(classifier.calls(), 1);
}

#[test]
fn test_cost_estimate_follows_attempts() {
    let classifier = ScriptedClassifier::new(vec![Err(RemoteError::Transient("reset".into()))]);
    let settings = VerifierSettings {
        cost_per_call_usd: 0.01,
        ..fast_settings()
    };
    let v = verifier(&classifier, settings);
    v.verify(&request());
    let budget = v.budget();
    assert_eq!(budget.attempts, 2);
    assert_relative_eq!(budget.estimated_cost(), 0.02);
}

// ---------------------------------------------------------------------------
// Retries
// ---------------------------------------------------------------------------

#[test]
fn test_transient_failure_is_retried_once() {
    let classifier = ScriptedClassifier::new(vec![
        Err(RemoteError::Transient("reset".into())),
        Ok(meteor(true)),
    ]);
    let v = verifier(&classifier, fast_settings());

    assert_eq!(v.verify(&request()), Some(Ok(meteor(true))));
    assert_eq!(classifier.calls(), 2);
    assert_eq!(v.budget().escalations, 1);
}

#[test]
fn test_retry_limit_is_respected() {
    let classifier = ScriptedClassifier::new(vec![
        Err(RemoteError::Transient("reset".into())),
        Err(RemoteError::Transient("reset again".into())),
        Ok(meteor(true)),
    ]);
    let v = verifier(&classifier, fast_settings());

    assert!(matches!(v.verify(&request()), Some(Err(RemoteError::Transient(_)))));
    assert_eq!(classifier.calls(), 2);
}

#[test]
fn test_other_failures_are_not_retried() {
    for error in [
        RemoteError::Unauthorized("401".into()),
        RemoteError::RateLimited("429".into()),
        RemoteError::Timeout(60),
        RemoteError::Unknown("400".into()),
    ] {
        let classifier = ScriptedClassifier::new(vec![Err(error.clone())]);
        let v = verifier(&classifier, fast_settings());
        assert_eq!(v.verify(&request()), Some(Err(error)));
        assert_eq!(classifier.calls(), 1);
    }
}

// ---------------------------------------------------------------------------
// Degradation and caps
// ---------------------------------------------------------------------------

#[test]
fn test_repeated_auth_failures_degrade_to_local_only() {
    let script = (0..5)
        .map(|_| Err(RemoteError::Unauthorized("bad key".into())))
        .collect();
    let classifier = ScriptedClassifier::new(script);
    let v = verifier(&classifier, fast_settings());

    for _ in 0..3 {
        assert!(matches!(v.verify(&request()), Some(Err(_))));
    }
    assert!(v.is_degraded());
    assert_eq!(v.verify(&request()), None);
    assert_eq!(classifier.calls(), 3);
    assert_eq!(v.budget().escalations, 3);
}

#[test]
fn test_success_resets_the_failure_streak() {
    let unknown = || Err(RemoteError::Unknown("500-ish".into()));
    let classifier = ScriptedClassifier::new(vec![
        unknown(),
        unknown(),
        Ok(meteor(true)),
        unknown(),
        unknown(),
    ]);
    let v = verifier(&classifier, fast_settings());
    for _ in 0..5 {
        v.verify(&request());
    }
    assert!(!v.is_degraded());
    assert!(v.verify(&request()).is_some());
}

#[test]
fn test_escalation_cap_refuses_further_calls() {
    let classifier = ScriptedClassifier::new(vec![]);
    let settings = VerifierSettings {
        max_escalations: Some(2),
        ..fast_settings()
    };
    let v = verifier(&classifier, settings);

    assert!(v.verify(&request()).is_some());
    assert!(v.verify(&request()).is_some());
    assert_eq!(v.verify(&request()), None);
    assert_eq!(classifier.calls(), 2);
    assert!(v.budget().is_exhausted());
}

#[test]
fn test_cap_holds_across_threads() {
    let classifier = ScriptedClassifier::new(vec![]);
    let settings = VerifierSettings {
        max_escalations: Some(5),
        ..fast_settings()
    };
    let v = verifier(&classifier, settings);

    let granted = AtomicUsize::new(0);
    std::thread::scope(|scope| {
        for _ in 0..12 {
            scope.spawn(|| {
                if v.verify(&request()).is_some() {
                    granted.fetch_add(1, Ordering::SeqCst);
                }
            });
        }
    });
    assert_eq!(granted.load(Ordering::SeqCst), 5);
    assert_eq!(classifier.calls(), 5);
}

#[test]
fn test_calls_are_spaced_by_min_interval() {
    let classifier = ScriptedClassifier::new(vec![]);
    let settings = VerifierSettings {
        min_interval_ms: 40,
        ..Default::default()
    };
    let v = verifier(&classifier, settings);

    let start = Instant::now();
    for _ in 0..3 {
        v.verify(&request());
    }
    assert!(start.elapsed() >= Duration::from_millis(80));
}

// ---------------------------------------------------------------------------
// Upload preparation
// ---------------------------------------------------------------------------

#[test]
fn test_small_file_is_sent_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_sky(dir.path(), "sky.png", &common::meteor_sky());
    let raw = std::fs::read(&path).unwrap();

    let upload = prepare_upload(&path, None, 1.0, &UploadSettings::default()).unwrap();
    assert_eq!(upload.media_type, "image/png");
    assert_eq!(upload.bytes, raw);
}

#[test]
fn test_small_bitmap_is_reencoded_as_jpeg() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["sky.bmp", "sky.tif"] {
        let path = dir.path().join(name);
        common::meteor_sky().save_rgb(&path);

        let upload = prepare_upload(&path, None, 1.0, &UploadSettings::default()).unwrap();
        assert_eq!(upload.media_type, "image/jpeg", "{name}");
        assert_eq!(&upload.bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&upload.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (400, 300));
    }
}

#[test]
fn test_oversized_file_is_reencoded_as_jpeg() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_sky(dir.path(), "sky.png", &common::meteor_sky());
    let settings = UploadSettings {
        max_bytes: 64,
        ..Default::default()
    };

    let upload = prepare_upload(&path, None, 1.0, &settings).unwrap();
    assert_eq!(upload.media_type, "image/jpeg");
    // JPEG magic; the tiny limit cannot be met so the smallest attempt is sent.
    assert_eq!(&upload.bytes[..2], &[0xFF, 0xD8]);
}

#[test]
fn test_crop_around_candidate_shrinks_the_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_sky(dir.path(), "sky.png", &common::faint_short_sky());
    let settings = UploadSettings {
        crop_to_candidate: true,
        ..Default::default()
    };
    let segment = LineSegment::new(70.0, 60.0, 100.0, 80.0, 30);

    let upload = prepare_upload(&path, Some(&segment), 1.0, &settings).unwrap();
    assert_eq!(upload.media_type, "image/jpeg");
    let decoded = image::load_from_memory(&upload.bytes).unwrap();
    assert!(decoded.width() < 200 && decoded.height() < 150);
}

#[test]
fn test_base64_encoding() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_sky(dir.path(), "sky.png", &common::empty_sky());
    let upload = prepare_upload(&path, None, 1.0, &UploadSettings::default()).unwrap();
    let encoded = upload.to_base64();
    assert_eq!(encoded.len() % 4, 0);
    assert!(encoded.len() >= upload.bytes.len() * 4 / 3);
}
