use crate::state_management::SimulatorError;
use crate::utils::CCStr;

/// Errors surfaced to the caller of a loader
///
/// These are programming errors: a loader key that was never registered.
/// Fetch failures never show up here, see [`FetchError`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoaderError {
    #[error("Context Loader with key {key} not found")]
    NotFound { key: CCStr },
}

/// Failure of a fetch function
///
/// Swallowed by the [`ContextLoader`](super::ContextLoader) and only reported
/// through the `on_error` callback.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Simulator(#[from] SimulatorError),
    #[error("{0}")]
    Message(String),
}

impl From<String> for FetchError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
impl From<&str> for FetchError {
    fn from(value: &str) -> Self {
        Self::Message(value.to_owned())
    }
}
