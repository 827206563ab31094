//! Multiphase chemical equilibrium workspace manager.
//!
//! This crate prepares, re-specifies and extracts results from a numerically
//! indexed working representation of a Gibbs-minimization problem. The
//! minimization itself is consumed through the [`GibbsMinimizer`] trait;
//! what lives here is the capacity-sized workspace reused across many
//! equilibrium calls, the species/element reordering permutations, the
//! phase-species map, and the import / respecify / export synchronization
//! protocol that keeps all of them mutually consistent.

pub mod counters;
pub mod driver;
pub mod error;
pub mod minimize;
pub mod phase;
pub mod problem;
pub mod thermo;
pub mod workspace;

mod export;
mod import;
mod respecify;

pub use counters::{Counters, ResetScope};
pub use driver::{SolveMode, SolveOptions};
pub use error::{EquilError, EquilResult};
pub use minimize::{Convergence, GibbsMinimizer, NullMinimizer};
pub use phase::{ActivityConvention, Existence, Phase};
pub use problem::{ElementKind, EquilProblem, PotentialUnits, ProblemKind, SpeciesKind};
pub use thermo::{SpeciesThermo, ThermoModel};
pub use workspace::{EquilWorkspace, SpeciesStatus};
