//! Top-level solve entry point tying import, minimization and export
//! together.

use geq_core::Stopwatch;
use tracing::{debug, warn};

use crate::error::EquilResult;
use crate::minimize::{Convergence, GibbsMinimizer};
use crate::problem::{EquilProblem, ProblemKind};
use crate::workspace::EquilWorkspace;

/// How the workspace should treat the incoming statement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveMode {
    /// Size the workspace, import everything and run one-time preparation.
    Fresh,
    /// Re-specify conditions on the already-imported topology and solve
    /// again from the current state.
    Resolve,
    /// Release every owned structure; no solve is performed.
    Teardown,
}

/// Driver options for one solve call.
#[derive(Clone, Copy, Debug)]
pub struct SolveOptions {
    /// Print a result summary after the solve.
    pub report: bool,
    /// Ask the minimizer for verbose progress output.
    pub verbose: bool,
    pub max_iterations: usize,
    /// Print the counter report; defaults to `report || verbose`.
    pub print_timing: Option<bool>,
    /// Extra species capacity reserved at a fresh import so the minimizer
    /// can append phantom species without reallocating.
    pub slack_species: usize,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            report: false,
            verbose: false,
            max_iterations: 1000,
            print_timing: None,
            slack_species: 10,
        }
    }
}

impl EquilWorkspace {
    /// Run one equilibrium calculation.
    ///
    /// `Fresh` imports `prob` from scratch; `Resolve` assumes the topology
    /// already imported and only refreshes conditions; `Teardown` releases
    /// the workspace and returns without solving. After a solve the results
    /// are exported back into `prob` whatever the convergence outcome, so
    /// a failed run still hands back the state it stopped in.
    pub fn solve<M: GibbsMinimizer>(
        &mut self,
        prob: &mut EquilProblem,
        mode: SolveMode,
        minimizer: &mut M,
        opts: SolveOptions,
    ) -> EquilResult<Convergence> {
        let clock = Stopwatch::start();

        match mode {
            SolveMode::Fresh => {
                self.ensure_capacity(
                    prob.n_species + opts.slack_species,
                    prob.n_elements.max(1),
                    prob.n_phases.max(1),
                )?;
                self.import(prob)?;
                self.prep_once();
            }
            SolveMode::Resolve => {
                self.respecify(prob)?;
            }
            SolveMode::Teardown => {
                self.teardown();
                return Ok(Convergence::Converged);
            }
        }

        self.prep();
        self.well_posed()?;

        debug!(mode = ?mode, kind = ?prob.kind, title = %self.title, "starting minimization");
        let minimize_clock = Stopwatch::start();
        let (temperature, pressure, volume) = (self.temperature, self.pressure, self.volume);
        let conv = match prob.kind {
            ProblemKind::FixedTP => {
                minimizer.minimize_tp(self, opts.verbose, opts.max_iterations, temperature, pressure)?
            }
            ProblemKind::FixedTV => {
                minimizer.minimize_tv(self, opts.verbose, opts.max_iterations, temperature, volume)?
            }
        };
        self.counters.time_minimize_s += minimize_clock.elapsed_s();

        if conv.is_failure() {
            warn!(code = conv.code(), "minimization did not converge");
        } else if conv != Convergence::Converged {
            warn!(code = conv.code(), "minimization converged with a caveat");
        }

        self.export(prob)?;

        if opts.report {
            println!(
                "[EQUIL] {}: outcome {:?} (code {}), {} species, {} phases, T = {} K",
                self.title,
                conv,
                conv.code(),
                self.n_species,
                self.n_phases,
                self.temperature
            );
        }

        self.counters.total_iterations += self.counters.iterations;
        self.counters.total_basis_optimizations += self.counters.basis_optimizations;
        self.counters.total_time_minimize_s += self.counters.time_minimize_s;
        self.counters.total_time_basis_opt_s += self.counters.time_basis_opt_s;
        self.counters.total_time_solve_s += clock.elapsed_s();
        self.counters.total_solve_calls += 1;

        if opts.print_timing.unwrap_or(opts.report || opts.verbose) {
            self.counters.report();
        }
        Ok(conv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EquilError;
    use crate::minimize::NullMinimizer;
    use nalgebra::DMatrix;

    fn simple_problem() -> EquilProblem {
        let mut prob = EquilProblem::new(2, 1, 1);
        prob.formula_matrix = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        prob.species_names = vec!["A".into(), "A2".into()];
        prob.set_estimate(&[1.0, 0.5]);
        prob
    }

    #[test]
    fn fresh_solve_reserves_slack_capacity() {
        let mut ws = EquilWorkspace::new();
        let mut prob = simple_problem();
        let conv = ws
            .solve(
                &mut prob,
                SolveMode::Fresh,
                &mut NullMinimizer,
                SolveOptions::default(),
            )
            .unwrap();
        assert_eq!(conv, Convergence::Converged);
        assert_eq!(ws.capacity(), (12, 1, 1));
        assert_eq!(ws.counters.total_solve_calls, 1);
    }

    #[test]
    fn resolve_without_fresh_import_reports_topology_drift() {
        let mut ws = EquilWorkspace::new();
        ws.ensure_capacity(4, 1, 1).unwrap();
        let mut prob = simple_problem();
        // Nothing was imported, so the topology check trips first.
        let err = ws
            .solve(
                &mut prob,
                SolveMode::Resolve,
                &mut NullMinimizer,
                SolveOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(err, EquilError::TopologyMismatch { .. }));
    }

    #[test]
    fn teardown_skips_the_minimizer_and_clears_state() {
        let mut ws = EquilWorkspace::new();
        let mut prob = simple_problem();
        ws.solve(
            &mut prob,
            SolveMode::Fresh,
            &mut NullMinimizer,
            SolveOptions::default(),
        )
        .unwrap();
        ws.solve(
            &mut prob,
            SolveMode::Teardown,
            &mut NullMinimizer,
            SolveOptions::default(),
        )
        .unwrap();
        assert_eq!(ws.capacity(), (0, 0, 0));
        assert_eq!(ws.n_species, 0);
    }

    #[test]
    fn failure_outcomes_are_returned_not_raised() {
        struct Exhausted;
        impl GibbsMinimizer for Exhausted {
            fn minimize_tp(
                &mut self,
                _ws: &mut EquilWorkspace,
                _verbose: bool,
                _max_iterations: usize,
                _temperature: f64,
                _pressure: f64,
            ) -> EquilResult<Convergence> {
                Ok(Convergence::IterationBudget)
            }
            fn minimize_tv(
                &mut self,
                _ws: &mut EquilWorkspace,
                _verbose: bool,
                _max_iterations: usize,
                _temperature: f64,
                _volume: f64,
            ) -> EquilResult<Convergence> {
                Ok(Convergence::IterationBudget)
            }
        }
        let mut ws = EquilWorkspace::new();
        let mut prob = simple_problem();
        let conv = ws
            .solve(
                &mut prob,
                SolveMode::Fresh,
                &mut Exhausted,
                SolveOptions::default(),
            )
            .unwrap();
        assert_eq!(conv, Convergence::IterationBudget);
        // Export still ran: the estimate round-tripped.
        assert_eq!(prob.mole_numbers, vec![1.0, 0.5]);
    }

    #[test]
    fn fixed_tv_dispatches_to_the_volume_entry() {
        struct Recorder {
            tv_calls: usize,
        }
        impl GibbsMinimizer for Recorder {
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
                self.tv_calls += 1;
                Ok(Convergence::Converged)
            }
        }
        let mut ws = EquilWorkspace::new();
        let mut prob = simple_problem();
        prob.kind = ProblemKind::FixedTV;
        prob.volume = 5.0;
        let mut rec = Recorder { tv_calls: 0 };
        ws.solve(
            &mut prob,
            SolveMode::Fresh,
            &mut rec,
            SolveOptions::default(),
        )
        .unwrap();
        assert_eq!(rec.tv_calls, 1);
    }
}
