//! Registration and callback errors

/// Errors surfaced synchronously by the registration API
#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("hotkey '{combination}' is already registered")]
    DuplicateRegistration { combination: String },
}

impl HotkeyError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

/// Failure raised from inside a user callback
///
/// Never propagated past the dispatch boundary; it is logged and reported
/// as an event.
#[derive(Debug, thiserror::Error)]
pub enum CallbackFailure {
    #[error("callback returned an error: {0:#}")]
    Failed(anyhow::Error),

    #[error("callback panicked: {0}")]
    Panicked(String),
}
