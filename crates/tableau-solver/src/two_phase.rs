use crate::iteration::SolverIteration;
use crate::problem::{Constraint, VariableKind};
use crate::rational::{ArithmeticError, Rational};
use crate::simplex::{SolveError, Solver};
use crate::solution::{Outcome, SolvedModel};

impl Solver {
    /// Two-phase simplex for tableaus that start with artificial variables.
    ///
    /// Phase 1 minimizes the sum of the artificial variables; a non-zero
    /// minimum, or an artificial variable left basic at a positive value,
    /// means the problem is infeasible. Phase 2 drops the artificial columns,
    /// restores the original costs and optimizes from the feasible basis.
    ///
    /// Phase 1 snapshots end up in `two_phase_history`, phase 2 snapshots in
    /// `simplex_history`.
    pub fn two_phase(
        &self,
        initial: SolverIteration,
        constraints: &[Constraint],
    ) -> Result<SolvedModel, SolveError> {
        let Some(cutoff) = initial.first_artificial_column() else {
            return self.simplex(initial, constraints);
        };

        let feasibility_costs = initial
            .variables()
            .map(|v| match v.kind() {
                VariableKind::Artificial => Rational::one(),
                _ => Rational::zero(),
            })
            .collect();
        let phase_one = initial.with_costs(feasibility_costs, true);

        log::debug!("phase 1 starting with {} artificial columns", initial.num_columns() - cutoff);
        let mut phase_one = self.simplex(phase_one, constraints)?;
        phase_one.two_phase_history = std::mem::take(&mut phase_one.simplex_history);

        if phase_one.outcome != Outcome::Optimized {
            log::debug!("phase 1 ended {}", phase_one.outcome);
            return Ok(phase_one);
        }
        if !phase_one.z.is_zero() {
            log::debug!("phase 1 minimum is {}, problem is infeasible", phase_one.z);
            phase_one.outcome = Outcome::Infeasible;
            return Ok(phase_one);
        }

        let Some(last) = phase_one.two_phase_history.last() else {
            return Ok(phase_one);
        };
        let stuck_artificial = last
            .rows
            .iter()
            .any(|r| r.basis.kind() == VariableKind::Artificial && r.value.is_positive());
        if stuck_artificial {
            log::debug!("artificial variable still basic after phase 1, problem is infeasible");
            phase_one.outcome = Outcome::Infeasible;
            return Ok(phase_one);
        }

        let feasible = drive_out_artificials(last, cutoff)?;
        let original_costs = initial.columns[..cutoff]
            .iter()
            .map(|c| c.cost.clone())
            .collect();
        let phase_two = feasible
            .without_columns_from(cutoff)
            .with_costs(original_costs, false);

        log::debug!("phase 2 starting from z = {}", phase_two.z);
        let mut solved = self.simplex(phase_two, constraints)?;
        solved.two_phase_history = phase_one.two_phase_history;
        // Dropped artificial columns are non-basic at zero
        for variable in initial.variables().skip(cutoff) {
            solved.solution.entry(variable.id()).or_insert_with(Rational::zero);
        }
        solved.variables = initial.variables().cloned().collect();
        Ok(solved)
    }
}

/// Pivot every artificial variable still basic (at zero) out of the basis,
/// using any non-zero entry of its row among the first `cutoff` columns.
/// Rows without such an entry are redundant and keep their artificial basis.
fn drive_out_artificials(
    iteration: &SolverIteration,
    cutoff: usize,
) -> Result<SolverIteration, ArithmeticError> {
    let mut current = iteration.clone();
    for row in 0..current.num_rows() {
        if current.rows[row].basis.kind() != VariableKind::Artificial {
            continue;
        }
        let Some(column) = (0..cutoff).find(|&j| !current.grid[(row, j)].is_zero()) else {
            log::debug!("row {} is redundant, {} stays basic", row, current.rows[row].basis);
            continue;
        };
        log::debug!(
            "degenerate artificial {} leaves for {}",
            current.rows[row].basis,
            current.columns[column].variable
        );
        current = current.pivoted(row, column)?;
    }
    Ok(current)
}
