//! Per-instance call and timing counters.

/// Which counters to reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResetScope {
    /// Only the most-recent-call counters; totals keep accumulating.
    Call,
    /// Everything, including cumulative totals.
    All,
}

/// Diagnostic counters owned by one solver instance.
///
/// The minimizer fills in the per-call fields; the driver folds them into
/// the cumulative totals after each solve.
#[derive(Clone, Debug, Default)]
pub struct Counters {
    /// Iterations taken by the most recent minimization.
    pub iterations: usize,
    /// Basis optimizations during the most recent minimization.
    pub basis_optimizations: usize,
    /// Seconds inside the most recent minimization.
    pub time_minimize_s: f64,
    /// Seconds inside basis optimization for the most recent call.
    pub time_basis_opt_s: f64,

    pub total_iterations: usize,
    pub total_basis_optimizations: usize,
    pub total_solve_calls: usize,
    pub total_time_minimize_s: f64,
    pub total_time_basis_opt_s: f64,
    /// Seconds across entire driver calls, including transfer overhead.
    pub total_time_solve_s: f64,
}

impl Counters {
    pub fn reset(&mut self, scope: ResetScope) {
        match scope {
            ResetScope::Call => {
                self.iterations = 0;
                self.basis_optimizations = 0;
                self.time_minimize_s = 0.0;
                self.time_basis_opt_s = 0.0;
            }
            ResetScope::All => *self = Self::default(),
        }
    }

    /// Print a cumulative summary.
    pub fn report(&self) {
        println!(
            "[COUNTERS] last call: {} iterations, {} basis optimizations, {:.3e} s minimizing",
            self.iterations, self.basis_optimizations, self.time_minimize_s
        );
        println!(
            "[COUNTERS] totals over {} calls: {} iterations, {} basis optimizations, {:.3e} s solving",
            self.total_solve_calls,
            self.total_iterations,
            self.total_basis_optimizations,
            self.total_time_solve_s
        );
    }
}
