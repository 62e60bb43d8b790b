/// Stage definitions for a single-domain scan
///
/// A scan moves strictly forward through these stages. The only branch is
/// after the home page fetch: either the frontier is built from the home page,
/// or the home page failed and the scan either falls back to conventional paths
/// or ends in `Error`.
use serde::Serialize;
use std::fmt;

/// Represents the current stage of a domain scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStage {
    // ===== Active States =====
    /// Scan created, nothing attempted yet
    #[default]
    Init,

    /// Probing candidate origins
    Resolve,

    /// Fetching the home page under the full tier policy
    FetchHome,

    /// Building the list of additional pages
    Frontier,

    /// Fetching additional pages
    FetchAdditional,

    /// Merging per-page partial signals
    Aggregate,

    /// Every tier failed for the home page
    FetchHomeFailed,

    // ===== Terminal States =====
    /// Scan completed
    Done,

    /// Nothing could be fetched
    Error,
}

impl ScanStage {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    /// Returns true if `next` is a legal successor of this stage
    pub fn can_transition_to(&self, next: ScanStage) -> bool {
        use ScanStage::*;

        if self.is_terminal() {
            return false;
        }
        if next == Error {
            return true;
        }

        matches!(
            (self, next),
            (Init, Resolve)
                | (Resolve, FetchHome)
                | (FetchHome, Frontier)
                | (FetchHome, FetchHomeFailed)
                | (FetchHomeFailed, Frontier)
                | (Frontier, FetchAdditional)
                | (FetchAdditional, Aggregate)
                | (Aggregate, Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Resolve => "resolve",
            Self::FetchHome => "fetch_home",
            Self::Frontier => "frontier",
            Self::FetchAdditional => "fetch_additional",
            Self::Aggregate => "aggregate",
            Self::FetchHomeFailed => "fetch_home_failed",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    /// Returns all stages in pipeline order
    pub fn all_stages() -> Vec<Self> {
        vec![
            Self::Init,
            Self::Resolve,
            Self::FetchHome,
            Self::Frontier,
            Self::FetchAdditional,
            Self::Aggregate,
            Self::FetchHomeFailed,
            Self::Done,
            Self::Error,
        ]
    }
}

impl fmt::Display for ScanStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
