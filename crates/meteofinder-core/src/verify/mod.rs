pub mod anthropic;
pub mod budget;
pub mod upload;
pub mod verifier;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::RemoteError;
use crate::lines::LineSegment;

pub use anthropic::{api_key_looks_valid, AnthropicClassifier, AnthropicSettings};
pub use budget::{RateLimiter, RunBudget};
pub use upload::{prepare_upload, UploadImage, UploadSettings};
pub use verifier::{RemoteVerifier, VerifierSettings};

/// What the verification boundary is asked about one image.
#[derive(Clone, Debug, PartialEq)]
pub struct VerificationRequest {
    pub path: PathBuf,
    /// Best local segment, in analysis-raster coordinates.
    pub segment: Option<LineSegment>,
    /// Analysis size divided by original size.
    pub analysis_scale: f32,
    pub local_score: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    #[default]
    Low,
}

impl Confidence {
    /// Lenient parse; anything unrecognized is `Low`.
    pub fn parse(text: &str) -> Confidence {
        match text.trim().to_ascii_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            _ => Self::Low,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// The verification boundary's answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub is_meteor: bool,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default)]
    pub description: String,
}

/// Something that can tell whether an image shows a meteor.
///
/// Calls may block for network latency. Implementations must be usable from
/// several escalation threads at once.
pub trait MeteorClassifier: Send + Sync {
    fn name(&self) -> &str;

    fn classify(&self, request: &VerificationRequest) -> Result<Classification, RemoteError>;
}
