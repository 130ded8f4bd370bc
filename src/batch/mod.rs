/// The parallel mapper
pub mod executor;
/// Mapper configuration and result types
pub mod types;

pub use executor::*;
pub use types::*;
