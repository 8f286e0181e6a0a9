/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by the core data model.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A wire line was not a valid JSON frame.
    #[error("invalid frame: {0}")]
    Frame(#[from] serde_json::Error),

    /// A wire line was valid JSON but carried no known frame type.
    #[error("unknown frame type: \"{0}\"")]
    UnknownFrameType(String),

    /// A history sink could not record an entry.
    #[error("history append failed: {0}")]
    History(String),
}
