use std::any::Any;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Errors raised at the explicit unwrap points of [`Try`](super::Try)
#[derive(Error, Debug)]
pub enum TryError {
    /// An accessor was called on the wrong variant
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A precondition on an argument did not hold
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A callable panicked while being attempted
    #[error("Callable panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text
        message: String,
    },

    /// A failure surfaced through `or_else_throw_unwrapped`
    #[error("Unwrapped failure: {source}")]
    Unwrapped {
        /// The failure being unwrapped
        #[source]
        source: TryFailure,
    },
}

impl TryError {
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        TryError::Panicked { message }
    }
}

/// The error held by a failed [`Try`](super::Try).
///
/// Wraps the original cause in an `Arc` so failures can be cloned and
/// handed to callbacks without losing the error chain. Equality is
/// identity: two failures are equal only when they share the same cause.
#[derive(Clone)]
pub struct TryFailure {
    cause: Arc<anyhow::Error>,
}

impl TryFailure {
    /// Wrap any error as a failure cause
    pub fn new(error: impl Into<anyhow::Error>) -> Self {
        Self {
            cause: Arc::new(error.into()),
        }
    }

    /// Borrow the original cause
    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }

    /// Downcast the cause to its concrete type
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.cause.downcast_ref::<E>()
    }

    /// Whether the cause is of type `E`
    pub fn is<E>(&self) -> bool
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.cause.is::<E>()
    }

    /// Whether the failure came from a panic rather than a returned error
    pub fn is_panic(&self) -> bool {
        matches!(self.downcast_ref::<TryError>(), Some(TryError::Panicked { .. }))
    }
}

impl fmt::Debug for TryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TryFailure")
            .field("cause", &self.cause.to_string())
            .finish()
    }
}

impl fmt::Display for TryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.cause, f)
    }
}

impl std::error::Error for TryFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.source()
    }
}

impl PartialEq for TryFailure {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cause, &other.cause)
    }
}
