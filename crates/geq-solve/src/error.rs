//! Error types for equilibrium workspace operations.

use geq_core::CoreError;
use thiserror::Error;

/// Errors surfaced by the workspace manager.
///
/// Internal-consistency defects (mass-balance, mole-fraction or potential
/// mismatches detected at export) are not represented here: those panic,
/// because they indicate solver corruption rather than bad input.
#[derive(Error, Debug)]
pub enum EquilError {
    #[error("Workspace bound for {what} must be positive")]
    BadBound { what: &'static str },

    #[error("Workspace capacity exceeded for {what}: need {needed}, have {capacity}")]
    CapacityExceeded {
        what: &'static str,
        needed: usize,
        capacity: usize,
    },

    #[error("Problem setup error: {what}")]
    ProblemSetup { what: String },

    #[error("Problem is not well posed: {what}")]
    IllPosed { what: &'static str },

    #[error("Problem topology changed since import: {count} mismatch(es)")]
    TopologyMismatch { count: usize },

    #[error("Numeric error: {0}")]
    Core(#[from] CoreError),
}

pub type EquilResult<T> = Result<T, EquilError>;
