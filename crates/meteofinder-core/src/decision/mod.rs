use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{MeteorError, RemoteError, Result};
use crate::scoring::Candidate;
use crate::verify::Classification;

/// How a run decides on candidates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Local pre-filter, then remote verification of candidates.
    #[default]
    Hybrid,
    /// Local pre-filter only; candidates are accepted as they are.
    LocalOnly,
    /// Local pre-filter only; the caller lists instead of copying.
    PrefilterOnly,
}

impl Mode {
    pub fn uses_remote(self) -> bool {
        matches!(self, Self::Hybrid)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hybrid => write!(f, "hybrid"),
            Self::LocalOnly => write!(f, "local-only"),
            Self::PrefilterOnly => write!(f, "prefilter-only"),
        }
    }
}

/// Mode flags as given by the user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModeSelection {
    pub local: bool,
    pub prefilter_only: bool,
}

/// Turn the user's flags into a [`Mode`].
///
/// Asking for both local-only and prefilter-only is a configuration error.
/// Hybrid without a remote classifier degrades to local-only.
pub fn resolve_mode(selection: ModeSelection, remote_available: bool) -> Result<Mode> {
    match (selection.local, selection.prefilter_only) {
        (true, true) => Err(MeteorError::Configuration(
            "--local and --prefilter-only cannot be combined".into(),
        )),
        (true, false) => Ok(Mode::LocalOnly),
        (false, true) => Ok(Mode::PrefilterOnly),
        (false, false) if remote_available => Ok(Mode::Hybrid),
        (false, false) => {
            info!("No verification service available, running local-only");
            Ok(Mode::LocalOnly)
        }
    }
}

/// Per-image decision state. Everything except `Pending` and `Escalated` is
/// terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageState {
    Pending,
    Rejected,
    AcceptedLocal,
    Escalated,
    AcceptedRemote,
    EscalationFailed,
}

impl ImageState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Escalated)
    }

    /// The verdict of a terminal state.
    pub fn verdict(self) -> Option<Verdict> {
        match self {
            Self::Rejected => Some(Verdict::Rejected),
            Self::AcceptedLocal => Some(Verdict::AcceptedLocal),
            Self::AcceptedRemote => Some(Verdict::AcceptedRemote),
            Self::EscalationFailed => Some(Verdict::EscalationFailed),
            Self::Pending | Self::Escalated => None,
        }
    }

    /// A hybrid `Pending` image moves on once the verifier has answered
    /// whether it takes another call: `Escalated` when it does,
    /// `AcceptedLocal` when the budget is spent or the run has degraded.
    pub fn with_remote_permit(self, permitted: bool) -> ImageState {
        debug_assert_eq!(self, Self::Pending);
        if permitted {
            Self::Escalated
        } else {
            Self::AcceptedLocal
        }
    }

    /// `Escalated` resolved by the verification boundary. The only exits are
    /// `AcceptedRemote`, `Rejected` and `EscalationFailed`.
    pub fn after_verification(
        self,
        outcome: &std::result::Result<Classification, RemoteError>,
    ) -> ImageState {
        debug_assert_eq!(self, Self::Escalated);
        match outcome {
            Ok(c) if c.is_meteor => Self::AcceptedRemote,
            Ok(_) => Self::Rejected,
            Err(_) => Self::EscalationFailed,
        }
    }
}

/// Final verdict on one image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Rejected,
    AcceptedLocal,
    AcceptedRemote,
    EscalationFailed,
}

impl Verdict {
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::AcceptedLocal | Self::AcceptedRemote)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected => write!(f, "rejected"),
            Self::AcceptedLocal => write!(f, "accepted (local)"),
            Self::AcceptedRemote => write!(f, "accepted (verified)"),
            Self::EscalationFailed => write!(f, "verification failed"),
        }
    }
}

/// Move a `Pending` image forward on local evidence alone.
///
/// The score bound comes from the candidate's own sensitivity level, the same
/// thresholds the scorer applied. A hybrid candidate stays `Pending` until
/// [`ImageState::with_remote_permit`] knows whether the verifier takes it.
pub fn decide(candidate: Option<&Candidate>, mode: Mode) -> ImageState {
    let Some(candidate) = candidate else {
        return ImageState::Rejected;
    };
    if candidate.score < candidate.level.thresholds().min_score {
        return ImageState::Rejected;
    }
    match mode {
        Mode::Hybrid => ImageState::Pending,
        Mode::LocalOnly | Mode::PrefilterOnly => ImageState::AcceptedLocal,
    }
}
