//! # Parallel Try
//!
//! A deferred-computation outcome type and a batched parallel mapper built
//! on top of it, for services that need to fan work out and cope with
//! partial failure.
//!
//! ## Overview
//!
//! [`Try`] captures the outcome of one fallible call the moment it runs.
//! Errors and panics become values, and combinators chain further work
//! without unwinding. [`ParallelMapper`] applies a function to many inputs
//! in fixed-size concurrent batches and sorts every outcome into ordered
//! successes and failures.
//!
//! ## Quick Start
//!
//! ```rust
//! use parallel_try::{attempt, ParallelMapper};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let port = attempt(|| "8080".parse::<u16>())
//!     .or(|| "80".parse::<u16>())
//!     .or_else(|_| 443);
//! assert_eq!(port, 8080);
//!
//! let inputs: Vec<String> = vec!["1".into(), "x".into(), "3".into()];
//! let mut mapper = ParallelMapper::new(inputs, |s: &String| s.parse::<u32>())
//!     .with_batch_size(2);
//! mapper.run()?;
//!
//! assert_eq!(mapper.successes(), &[1, 3]);
//! assert_eq!(mapper.failures()[0].input, "x");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`attempt`]: the `Try` type, its failure wrapper, and unwrap errors
//! - [`batch`]: the batched parallel mapper, its configuration and results

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

use thiserror::Error;

/// Result type for crate operations
pub type Result<T> = std::result::Result<T, ParallelTryError>;

/// Main error type for crate operations
#[derive(Error, Debug)]
pub enum ParallelTryError {
    /// Error raised while unwrapping a `Try`
    #[error("Try error: {0}")]
    Try(#[from] attempt::TryError),

    /// Call-level mapper error
    #[error("Mapper error: {0}")]
    Mapper(#[from] batch::MapperError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Deferred-computation outcome type
pub mod attempt;

/// Batched parallel execution
pub mod batch;

pub use attempt::{attempt, Try, TryError, TryFailure};
pub use batch::{
    ExecutionFailure, InterruptHandle, MapperConfig, MapperError, ParallelMapper, RunStats,
};
