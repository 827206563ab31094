//! Contract with the external Gibbs-minimization routine.

use crate::error::EquilResult;
use crate::workspace::EquilWorkspace;

/// Outcome of a minimization run.
///
/// Failures are numeric outcomes, not errors: the driver reports them and
/// still exports whatever state the minimizer left behind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Convergence {
    Converged,
    /// Converged subject to a reduced-rank element-constraint matrix.
    RangeSpaceCaveat,
    /// Iteration budget exhausted before convergence.
    IterationBudget,
    Diverged,
}

impl Convergence {
    /// Signed convention: negative = failure, zero = success, positive =
    /// success with caveat.
    pub fn code(self) -> i32 {
        match self {
            Convergence::Converged => 0,
            Convergence::RangeSpaceCaveat => 1,
            Convergence::IterationBudget => -1,
            Convergence::Diverged => -2,
        }
    }

    pub fn is_failure(self) -> bool {
        self.code() < 0
    }
}

/// The minimization routine consumed by the driver.
///
/// Implementations receive a prepared workspace with mutually consistent
/// permutations and phase maps, and may mutate mole numbers, phase states
/// and the counters.
pub trait GibbsMinimizer {
    /// Minimize at fixed temperature and pressure.
    fn minimize_tp(
        &mut self,
        ws: &mut EquilWorkspace,
        verbose: bool,
        max_iterations: usize,
        temperature: f64,
        pressure: f64,
    ) -> EquilResult<Convergence>;

    /// Minimize at fixed temperature and volume. Typically an outer loop
    /// adjusting pressure around repeated fixed-T,P passes.
    fn minimize_tv(
        &mut self,
        ws: &mut EquilWorkspace,
        verbose: bool,
        max_iterations: usize,
        temperature: f64,
        volume: f64,
    ) -> EquilResult<Convergence>;
}

/// Minimizer that accepts the prepared state as already optimal.
///
/// Useful as a harness stub: the driver's import/export plumbing can be
/// exercised end to end with known mole numbers.
pub struct NullMinimizer;

impl GibbsMinimizer for NullMinimizer {
    fn minimize_tp(
        &mut self,
        _ws: &mut EquilWorkspace,
        _verbose: bool,
        _max_iterations: usize,
        _temperature: f64,
        _pressure: f64,
    ) -> EquilResult<Convergence> {
        Ok(Convergence::Converged)
    }

    fn minimize_tv(
        &mut self,
        _ws: &mut EquilWorkspace,
        _verbose: bool,
        _max_iterations: usize,
        _temperature: f64,
        _volume: f64,
    ) -> EquilResult<Convergence> {
        Ok(Convergence::Converged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_sign_convention() {
        assert_eq!(Convergence::Converged.code(), 0);
        assert!(Convergence::RangeSpaceCaveat.code() > 0);
        assert!(Convergence::IterationBudget.code() < 0);
        assert!(Convergence::Diverged.code() < 0);
    }

    #[test]
    fn only_negative_codes_are_failures() {
        assert!(!Convergence::Converged.is_failure());
        assert!(!Convergence::RangeSpaceCaveat.is_failure());
        assert!(Convergence::IterationBudget.is_failure());
        assert!(Convergence::Diverged.is_failure());
    }
}
