/// Domain-specific error types for the analytics engine.
/// The core never propagates these out of a computation. It returns a
/// `Computed::Sentinel` tagged with the error's kind instead. Only the
/// shell (config, provider, server) returns `Err`.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("degenerate computation: {0}")]
    Degenerate(String),

    #[error("data unavailable: {0}")]
    Unavailable(String),

    /// The source answered, and it has nothing for this key.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl AnalyticsError {
    /// Map onto the three-way taxonomy exposed with sentinels.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) | Self::Parse(_) | Self::Config(_) => ErrorKind::InvalidInput,
            Self::Degenerate(_) => ErrorKind::ComputationDegenerate,
            Self::Unavailable(_) | Self::NotFound(_) | Self::Io(_) => ErrorKind::Unavailable,
        }
    }

    /// Whether retrying the same request could succeed. `NotFound` is
    /// reported as unavailable data but never retried.
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Io(_))
    }
}

impl From<serde_json::Error> for AnalyticsError {
    fn from(e: serde_json::Error) -> Self {
        AnalyticsError::Parse(e.to_string())
    }
}

impl From<std::io::Error> for AnalyticsError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            AnalyticsError::NotFound(e.to_string())
        } else {
            AnalyticsError::Io(e.to_string())
        }
    }
}

pub type EngineResult<T> = Result<T, AnalyticsError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    ComputationDegenerate,
    Unavailable,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput => write!(f, "invalid_input"),
            Self::ComputationDegenerate => write!(f, "computation_degenerate"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Outcome of a fail-safe computation.
///
/// `Sentinel` still carries a usable value (the documented all-zero or
/// neutral record) so downstream stages keep running, but callers can tell
/// it apart from a genuine result.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Computed<T> {
    Value { value: T },
    Sentinel { value: T, kind: ErrorKind, detail: String },
}

impl<T> Computed<T> {
    #[inline]
    pub fn ok(value: T) -> Self {
        Self::Value { value }
    }

    /// Build a sentinel from an error, logging the fallback once here.
    pub fn fallback(value: T, err: AnalyticsError) -> Self {
        tracing::warn!(kind = %err.kind(), error = %err, "falling back to sentinel");
        Self::Sentinel {
            value,
            kind: err.kind(),
            detail: err.to_string(),
        }
    }

    #[inline]
    pub fn value(&self) -> &T {
        match self {
            Self::Value { value } | Self::Sentinel { value, .. } => value,
        }
    }

    #[inline]
    pub fn into_value(self) -> T {
        match self {
            Self::Value { value } | Self::Sentinel { value, .. } => value,
        }
    }

    #[inline]
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::Sentinel { .. })
    }

    #[inline]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Value { .. } => None,
            Self::Sentinel { kind, .. } => Some(*kind),
        }
    }
}
