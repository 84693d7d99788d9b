use std::path::PathBuf;

use thiserror::Error;

/// Conditions any Form Surface call may raise.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    /// Transient: element not yet interactable, stale reference, timing race.
    #[error("not ready: {0}")]
    NotReady(String),

    /// Structural: the thing being looked for does not exist on the surface.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Raised by the value resolver when its precondition cannot be met.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("option set is empty")]
    EmptyOptions,
}

/// Classifies an operation failure for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FailureKind {
    /// Timing or staleness; worth another attempt.
    Retriable,
    /// The operation's precondition can never be satisfied.
    Terminal,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Retriable => write!(f, "retriable"),
            FailureKind::Terminal => write!(f, "terminal"),
        }
    }
}

/// Failure of one unit operation handed to the retry executor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl OperationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            OperationError::Surface(SurfaceError::NotReady(_)) => FailureKind::Retriable,
            OperationError::Surface(SurfaceError::NotFound(_)) => FailureKind::Terminal,
            OperationError::Resolve(ResolveError::EmptyOptions) => FailureKind::Terminal,
        }
    }
}

/// An operation gave up, either on a terminal failure or after exhausting its attempts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed after {attempts} attempt(s) ({kind}): {cause}")]
pub struct StageFailure {
    pub operation: String,
    pub attempts: u32,
    pub kind: FailureKind,
    pub cause: OperationError,
}

/// Setup failures detected before any stage touches the surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("stage '{stage}' field '{field}' needs attribute '{attribute}', which the work-item does not carry")]
    MissingAttribute {
        stage: String,
        field: String,
        attribute: String,
    },

    #[error("work-item {0} has no media bundle")]
    MissingMedia(String),

    #[error("work-item {item} is invalid for {target}: {problems}")]
    Invalid {
        item: String,
        target: String,
        problems: String,
    },

    #[error("media lookup failed: {0}")]
    Media(String),

    #[error("target {0} declares no stages")]
    NoStages(String),
}

/// Persistence failures of the completion ledger. Never swallowed.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed to read ledger {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse ledger {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write ledger {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to lock ledger {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode ledger: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("archival of {item_key} failed: {source}")]
    Archive {
        item_key: String,
        #[source]
        source: MediaError,
    },
}

/// Media bundle lookup and relocation failures.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media folder not found: {0}")]
    FolderMissing(PathBuf),

    #[error("no media files in {0}")]
    Empty(PathBuf),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write archive metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}
