//! geq-core: stable foundation for the equilibrium workspace crates.
//!
//! Contains:
//! - numeric (Real + the solver's equality tolerance + float helpers)
//! - timing (stopwatch feeding the per-instance counters)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod timing;

pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use timing::Stopwatch;
