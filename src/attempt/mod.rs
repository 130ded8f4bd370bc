/// Failure wrapper and unwrap errors
pub mod failure;
/// The `Try` type and its combinators
pub mod value;

pub use failure::*;
pub use value::*;
