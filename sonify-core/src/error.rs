use thiserror::Error;

/// Failures that can cross the scheduler's collaborator boundary.
///
/// Degenerate inputs (all values equal, zero timestamp span, empty playlist)
/// are absent: the tick loop resolves them with fixed fallbacks.
#[derive(Debug, Clone, PartialEq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SonifyError {
    /// An upstream data source could not deliver points
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    /// The audio backend could not produce a voice
    #[error("voice creation failed: {0}")]
    VoiceCreationFailure(String),

    #[error("unknown scale '{0}'")]
    UnknownScale(String),

    #[error("unknown tonic '{0}'")]
    UnknownTonic(String),

    /// Speed factors must be finite and strictly positive
    #[error("invalid speed factor {0}")]
    InvalidSpeed(f64),
}
