//! Runs one or both solvers over the same prepared grid and
//! cross-checks their results.

use std::fmt;
use std::time::{Duration, Instant};

use crate::config::SolverKind;
use crate::error::GridstarError;
use crate::grid::{Grid, Position};
use crate::solver::parallel::ParallelAStar;
use crate::solver::sequential::SequentialAStar;
use crate::solver::{Solution, Solver};

/// Absolute-or-relative tolerance for comparing two solvers' optimal
/// costs. The diagonal cost sqrt(2) makes floating-point sums
/// non-associative, so exact equality is the wrong test.
pub const TOLERANCE: f32 = 1e-4;

pub fn costs_agree(a: f32, b: f32) -> bool {
    let diff = (a - b).abs();
    diff <= TOLERANCE || diff <= TOLERANCE * a.abs().max(b.abs())
}

/// One solver's result plus how long it took.
#[derive(Debug, Clone)]
pub struct TimedSolution {
    pub name: &'static str,
    pub solution: Solution,
    pub elapsed: Duration,
}

/// The outcome of a `Driver::run`: one or both solvers' results, and
/// whether they agreed when both ran.
pub struct Report {
    pub sequential: Option<TimedSolution>,
    pub parallel: Option<TimedSolution>,
    pub mismatch: bool,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for timed in [&self.sequential, &self.parallel].into_iter().flatten() {
            writeln!(
                f,
                "{}: success={} cost={:.4} path_len={} ({:.2?})",
                timed.name,
                timed.solution.success,
                timed.solution.optimal_cost,
                timed.solution.path.len(),
                timed.elapsed
            )?;
        }
        if self.mismatch {
            writeln!(f, "CROSS-CHECK FAILED: solvers disagree")?;
        } else if self.sequential.is_some() && self.parallel.is_some() {
            writeln!(f, "Cross-check OK: both solvers agree")?;
        }
        Ok(())
    }
}

/// Runs the solver(s) named by `kind` over `grid`, from `start` to
/// `target`.
pub struct Driver {
    kind: SolverKind,
    batch_width: usize,
}

impl Driver {
    pub fn new(kind: SolverKind, batch_width: usize) -> Self {
        Driver { kind, batch_width }
    }

    /// Runs the configured solver(s) and cross-checks their results.
    /// A cross-solver mismatch indicates a bug, not a normal query
    /// outcome, so it is reported through `Report::mismatch` rather
    /// than silently picking one answer.
    pub fn run(
        &self,
        grid: &Grid,
        start: Position,
        target: Position,
    ) -> Result<Report, GridstarError> {
        let sequential = match self.kind {
            SolverKind::Sequential | SolverKind::Both => {
                Some(run_timed("sequential", &mut SequentialAStar::new(), grid, start, target)?)
            }
            SolverKind::Parallel => None,
        };

        let parallel = match self.kind {
            SolverKind::Parallel | SolverKind::Both => Some(run_timed(
                "parallel",
                &mut ParallelAStar::new(self.batch_width),
                grid,
                start,
                target,
            )?),
            SolverKind::Sequential => None,
        };

        let mismatch = match (&sequential, &parallel) {
            (Some(a), Some(b)) => {
                a.solution.success != b.solution.success
                    || (a.solution.success
                        && !costs_agree(a.solution.optimal_cost, b.solution.optimal_cost))
            }
            _ => false,
        };

        Ok(Report { sequential, parallel, mismatch })
    }
}

fn run_timed(
    name: &'static str,
    solver: &mut dyn Solver,
    grid: &Grid,
    start: Position,
    target: Position,
) -> Result<TimedSolution, GridstarError> {
    let started = Instant::now();
    let solution = solver.solve(grid, start, target)?;
    Ok(TimedSolution { name, solution, elapsed: started.elapsed() })
}
