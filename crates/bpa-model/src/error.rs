//! Error types for the model vocabulary

/// Errors raised while parsing model identifiers from strings
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Unknown wizard mode
    #[error("unknown wizard mode: {0}")]
    UnknownMode(String),

    /// Unknown record kind
    #[error("unknown record kind: {0}")]
    UnknownRecordKind(String),

    /// Step index outside the wizard
    #[error("step index {0} is outside the wizard (0..=8)")]
    StepOutOfRange(usize),
}
