//! The `Try` outcome type and its combinators.
//!
//! A `Try` is decided the moment it is built: [`Try::attempt`] runs the
//! callable immediately and catches both returned errors and panics. Every
//! combinator consumes the value and returns a new one, so a chain reads
//! top to bottom and only the first failure survives.

use std::panic::{self, AssertUnwindSafe};

use super::failure::{TryError, TryFailure};

/// Outcome of a single fallible computation
#[derive(Debug, Clone, PartialEq)]
#[must_use = "a Try may hold a failure that should be handled"]
pub enum Try<T> {
    /// The computation produced a value
    Success(T),
    /// The computation returned an error or panicked
    Failure(TryFailure),
}

/// Run `f` now and capture its outcome. Shorthand for [`Try::attempt`].
pub fn attempt<T, E, F>(f: F) -> Try<T>
where
    F: FnOnce() -> std::result::Result<T, E>,
    E: Into<anyhow::Error>,
{
    Try::attempt(f)
}

/// Runs `f`, turning a panic into a `Panicked` failure
fn catching<R>(f: impl FnOnce() -> R) -> std::result::Result<R, TryFailure> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .map_err(|payload| TryFailure::new(TryError::from_panic(payload)))
}

impl<T> Try<T> {
    /// Evaluate `f` immediately. An `Err` or a panic becomes `Failure`;
    /// this never unwinds.
    pub fn attempt<E, F>(f: F) -> Self
    where
        F: FnOnce() -> std::result::Result<T, E>,
        E: Into<anyhow::Error>,
    {
        match catching(f) {
            Ok(Ok(value)) => Try::Success(value),
            Ok(Err(error)) => Try::Failure(TryFailure::new(error)),
            Err(failure) => Try::Failure(failure),
        }
    }

    /// A successful outcome
    pub fn success(value: T) -> Self {
        Try::Success(value)
    }

    /// A failed outcome
    pub fn failure(error: impl Into<anyhow::Error>) -> Self {
        Try::Failure(TryFailure::new(error))
    }

    /// Convert a `Result`, keeping its error as the failure cause
    pub fn from_result<E>(result: std::result::Result<T, E>) -> Self
    where
        E: Into<anyhow::Error>,
    {
        match result {
            Ok(value) => Try::Success(value),
            Err(error) => Try::Failure(TryFailure::new(error)),
        }
    }

    /// `true` for `Success`
    pub fn is_success(&self) -> bool {
        matches!(self, Try::Success(_))
    }

    /// `true` for `Failure`
    pub fn is_failure(&self) -> bool {
        matches!(self, Try::Failure(_))
    }

    /// Borrow the value.
    ///
    /// Returns `TryError::InvalidState` on a `Failure`.
    pub fn get(&self) -> std::result::Result<&T, TryError> {
        match self {
            Try::Success(value) => Ok(value),
            Try::Failure(failure) => Err(TryError::InvalidState(format!(
                "get() called on a failure: {failure}"
            ))),
        }
    }

    /// Borrow the failure.
    ///
    /// Returns `TryError::InvalidState` on a `Success`.
    pub fn get_exception(&self) -> std::result::Result<&TryFailure, TryError> {
        match self {
            Try::Success(_) => Err(TryError::InvalidState(
                "get_exception() called on a success".to_string(),
            )),
            Try::Failure(failure) => Ok(failure),
        }
    }

    /// Borrowing view of this outcome
    pub fn as_ref(&self) -> Try<&T> {
        match self {
            Try::Success(value) => Try::Success(value),
            Try::Failure(failure) => Try::Failure(failure.clone()),
        }
    }

    /// Apply `f` to a success. A panic in `f` becomes the new failure.
    /// A failure passes through and `f` is never called.
    pub fn map<S, F>(self, f: F) -> Try<S>
    where
        F: FnOnce(T) -> S,
    {
        match self {
            Try::Success(value) => match catching(move || f(value)) {
                Ok(mapped) => Try::Success(mapped),
                Err(failure) => Try::Failure(failure),
            },
            Try::Failure(failure) => Try::Failure(failure),
        }
    }

    /// Like [`map`](Self::map) for a fallible `f`; its `Err` replaces the
    /// success.
    pub fn try_map<S, E, F>(self, f: F) -> Try<S>
    where
        F: FnOnce(T) -> std::result::Result<S, E>,
        E: Into<anyhow::Error>,
    {
        match self {
            Try::Success(value) => Try::attempt(move || f(value)),
            Try::Failure(failure) => Try::Failure(failure),
        }
    }

    /// Chain a computation that itself yields a `Try`, without nesting.
    pub fn flat_map<S, F>(self, f: F) -> Try<S>
    where
        F: FnOnce(T) -> Try<S>,
    {
        match self {
            Try::Success(value) => catching(move || f(value)).unwrap_or_else(Try::Failure),
            Try::Failure(failure) => Try::Failure(failure),
        }
    }

    /// Run a side effect on the success. The outcome carries no value; an
    /// error from `f` becomes the failure.
    pub fn for_each<E, F>(self, f: F) -> Try<()>
    where
        F: FnOnce(T) -> std::result::Result<(), E>,
        E: Into<anyhow::Error>,
    {
        self.try_map(f)
    }

    /// Keep a success as is, otherwise attempt `alternative`.
    ///
    /// Chained calls try each alternative in order until one succeeds.
    pub fn or<E, F>(self, alternative: F) -> Try<T>
    where
        F: FnOnce() -> std::result::Result<T, E>,
        E: Into<anyhow::Error>,
    {
        match self {
            Try::Success(value) => Try::Success(value),
            Try::Failure(_) => Try::attempt(alternative),
        }
    }

    /// The success value, or whatever `recovery` builds from the failure
    pub fn or_else<F>(self, recovery: F) -> T
    where
        F: FnOnce(TryFailure) -> T,
    {
        match self {
            Try::Success(value) => value,
            Try::Failure(failure) => recovery(failure),
        }
    }

    /// The success value, or the error `mapper` builds from the failure
    pub fn or_else_throw<E, F>(self, mapper: F) -> std::result::Result<T, E>
    where
        F: FnOnce(TryFailure) -> E,
    {
        match self {
            Try::Success(value) => Ok(value),
            Try::Failure(failure) => Err(mapper(failure)),
        }
    }

    /// The success value, or `error` as given.
    ///
    /// The original cause is dropped here. Inspect it first (for example
    /// with [`inspect_failure`](Self::inspect_failure)) if it matters.
    pub fn or_else_throw_with<E>(self, error: E) -> std::result::Result<T, E> {
        match self {
            Try::Success(value) => Ok(value),
            Try::Failure(_) => Err(error),
        }
    }

    /// The success value, or `TryError::Unwrapped` with the failure as its
    /// source
    pub fn or_else_throw_unwrapped(self) -> std::result::Result<T, TryError> {
        self.or_else_throw(|source| TryError::Unwrapped { source })
    }

    /// `Some(value)` for a success, `None` for a failure
    pub fn to_optional(self) -> Option<T> {
        match self {
            Try::Success(value) => Some(value),
            Try::Failure(_) => None,
        }
    }

    /// As [`to_optional`](Self::to_optional), calling `on_failure` exactly
    /// once when there is a failure
    pub fn to_optional_with<F>(self, on_failure: F) -> Option<T>
    where
        F: FnOnce(&TryFailure),
    {
        self.inspect_failure(on_failure).to_optional()
    }

    /// Call `f` with the failure, if any, and return `self` unchanged
    pub fn inspect_failure<F>(self, f: F) -> Self
    where
        F: FnOnce(&TryFailure),
    {
        if let Try::Failure(failure) = &self {
            f(failure);
        }
        self
    }

    /// Zero or one borrowed values. Each call starts a fresh iterator.
    pub fn stream(&self) -> std::option::IntoIter<&T> {
        match self {
            Try::Success(value) => Some(value).into_iter(),
            Try::Failure(_) => None.into_iter(),
        }
    }

    /// Back to a plain `Result`
    pub fn into_result(self) -> std::result::Result<T, TryFailure> {
        match self {
            Try::Success(value) => Ok(value),
            Try::Failure(failure) => Err(failure),
        }
    }
}

impl<T, E> From<std::result::Result<T, E>> for Try<T>
where
    E: Into<anyhow::Error>,
{
    fn from(result: std::result::Result<T, E>) -> Self {
        Try::from_result(result)
    }
}

impl<T> IntoIterator for Try<T> {
    type Item = T;
    type IntoIter = std::option::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.to_optional().into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Try<T> {
    type Item = &'a T;
    type IntoIter = std::option::IntoIter<&'a T>;

    fn into_iter(self) -> Self::IntoIter {
        self.stream()
    }
}
