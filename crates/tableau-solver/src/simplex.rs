use std::collections::HashMap;

use thiserror::Error;

use crate::iteration::{Pivot, SolverIteration};
use crate::problem::{Constraint, LinearModel, Objective, VariableId};
use crate::rational::{ArithmeticError, Rational};
use crate::solution::{Outcome, SolvedModel};
use crate::standardize::standardize;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolveError {
    #[error("Undeclared variable {variable} in {location}")]
    UndeclaredVariable { location: String, variable: String },
    #[error("Iteration limit of {limit} reached without converging")]
    IterationLimit { limit: usize },
    #[error("Arithmetic failure while pivoting: {0}")]
    Arithmetic(#[from] ArithmeticError),
}

/// Rule used to pick the entering column
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PivotRule {
    /// Most negative reduced cost, lowest index on ties. Can cycle on
    /// degenerate tableaus.
    #[default]
    Dantzig,
    /// Lowest-index column with a negative reduced cost. Never cycles.
    Bland,
}

/// Result of trying to advance one tableau
enum Step {
    Optimal,
    Unbounded { column: usize },
    Pivot(Pivot),
}

/// Exact simplex solver producing the full tableau history
#[derive(Debug, Clone)]
pub struct Solver {
    /// Maximum pivots per run before giving up
    max_iterations: usize,
    pivot_rule: PivotRule,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            pivot_rule: PivotRule::Dantzig,
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_pivot_rule(mut self, rule: PivotRule) -> Self {
        self.pivot_rule = rule;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn pivot_rule(&self) -> PivotRule {
        self.pivot_rule
    }

    /// Solve `model`, choosing plain simplex or the two-phase method depending
    /// on whether standardization needed artificial variables.
    ///
    /// `z` is reported in the orientation of `model`.
    pub fn solve(&self, model: &LinearModel) -> Result<SolvedModel, SolveError> {
        if let Some((location, variable)) = model.undeclared_variable() {
            return Err(SolveError::UndeclaredVariable { location, variable });
        }

        let first = standardize(model);
        let mut solved = if first.has_artificial() {
            self.two_phase(first, &model.constraints)?
        } else {
            self.simplex(first, &model.constraints)?
        };

        if model.objective == Objective::Min && !solved.z.is_zero() {
            solved.z = -&solved.z;
        }
        solved.objective_orientation = model.objective;
        solved.objective_function = model.objective_function.clone();

        log::info!(
            "solved {} model: {} (z = {}, {} tableaus)",
            model.objective,
            solved.outcome,
            solved.z,
            solved.num_iterations()
        );
        Ok(solved)
    }

    /// Run the simplex method from `initial` until no reduced cost is negative.
    ///
    /// The result's `simplex_history` starts with `initial`. On an optimal
    /// tableau the basic values are checked against `constraints`; any
    /// violation turns the outcome into [`Outcome::Infeasible`].
    pub fn simplex(
        &self,
        initial: SolverIteration,
        constraints: &[Constraint],
    ) -> Result<SolvedModel, SolveError> {
        let mut history = Vec::new();
        let mut current = initial;
        let mut pivots = 0;

        loop {
            match self.next_step(&current) {
                Step::Optimal => {
                    let variables: Vec<_> = current.variables().cloned().collect();
                    let solution = basic_solution(&current);
                    let z = current.z.clone();
                    history.push(current);

                    let outcome = if constraints.iter().all(|c| {
                        c.is_satisfied_by(|v| solution.get(&v.id()).cloned().unwrap_or_default())
                    }) {
                        Outcome::Optimized
                    } else {
                        log::debug!("optimal tableau violates the original constraints");
                        Outcome::Infeasible
                    };
                    log::debug!("simplex finished after {} tableaus: {}", history.len(), outcome);

                    let mut solved = SolvedModel::new(variables, constraints.to_vec(), history, outcome);
                    solved.solution = solution;
                    solved.z = z;
                    return Ok(solved);
                }
                Step::Unbounded { column } => {
                    log::debug!(
                        "column {} has no positive entry, problem is unbounded",
                        current.columns[column].variable
                    );
                    let variables = current.variables().cloned().collect();
                    let solution = basic_solution(&current);
                    history.push(current);
                    let mut solved =
                        SolvedModel::new(variables, constraints.to_vec(), history, Outcome::Unbounded);
                    solved.solution = solution;
                    return Ok(solved);
                }
                Step::Pivot(pivot) => {
                    if pivots == self.max_iterations {
                        log::warn!("simplex stopped after {} pivots", self.max_iterations);
                        return Err(SolveError::IterationLimit {
                            limit: self.max_iterations,
                        });
                    }
                    pivots += 1;
                    log::debug!(
                        "pivot ({}, {}): {} enters, {} leaves",
                        pivot.row,
                        pivot.column,
                        current.columns[pivot.column].variable,
                        current.rows[pivot.row].basis
                    );
                    let next = current.pivoted(pivot.row, pivot.column)?;
                    current.pivot = Some(pivot);
                    history.push(current);
                    current = next;
                }
            }
        }
    }

    fn next_step(&self, iteration: &SolverIteration) -> Step {
        let Some(column) = self.entering_column(iteration) else {
            return Step::Optimal;
        };
        match leaving_row(iteration, column) {
            Some(row) => Step::Pivot(Pivot { row, column }),
            None => Step::Unbounded { column },
        }
    }

    /// Column with a negative reduced cost chosen by the pivot rule, if any.
    fn entering_column(&self, iteration: &SolverIteration) -> Option<usize> {
        let mut candidates = iteration
            .decision_variables()
            .enumerate()
            .filter(|(_, rc)| rc.is_negative());

        match self.pivot_rule {
            PivotRule::Bland => candidates.next().map(|(j, _)| j),
            PivotRule::Dantzig => {
                let mut best: Option<(usize, &Rational)> = None;
                for (j, rc) in candidates {
                    if best.is_none_or(|(_, lowest)| rc < lowest) {
                        best = Some((j, rc));
                    }
                }
                best.map(|(j, _)| j)
            }
        }
    }
}

/// Minimum ratio test over rows with a strictly positive entry in `column`.
/// Ties go to the first row; `None` when no entry is positive.
fn leaving_row(iteration: &SolverIteration, column: usize) -> Option<usize> {
    let mut best: Option<(usize, Rational)> = None;
    for (i, entry) in iteration.grid.column(column).enumerate() {
        if !entry.is_positive() {
            continue;
        }
        // entry > 0, so the division cannot fail
        let Ok(ratio) = iteration.rows[i].value.checked_div(entry) else {
            continue;
        };
        if best.as_ref().is_none_or(|(_, lowest)| ratio < *lowest) {
            best = Some((i, ratio));
        }
    }
    best.map(|(i, _)| i)
}

/// Every variable at zero except the basic ones, which take their row value.
fn basic_solution(iteration: &SolverIteration) -> HashMap<VariableId, Rational> {
    let mut solution: HashMap<_, _> = iteration
        .variables()
        .map(|v| (v.id(), Rational::zero()))
        .collect();
    for row in &iteration.rows {
        solution.insert(row.basis.id(), row.value.clone());
    }
    solution
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iteration::Grid;
    use crate::problem::Variable;

    fn ints(values: &[i64]) -> Vec<Rational> {
        values.iter().map(|&v| Rational::from(v)).collect()
    }

    fn frac(numer: i64, denom: i64) -> Rational {
        Rational::new(numer, denom).unwrap()
    }

    #[test]
    fn test_direct_simplex() {
        // Maximize: 3x1 + 5x2 + 4x3
        // Subject to:
        //   2x1 + 3x2       <= 8
        //         2x2 + 5x3 <= 10
        //   3x1 + 2x2 + 4x3 <= 15
        // Optimal: z = 765/41
        let x1 = Variable::input("X1");
        let x2 = Variable::input("X2");
        let x3 = Variable::input("X3");
        let s1 = Variable::slack("S1");
        let s2 = Variable::slack("S2");
        let s3 = Variable::slack("S3");

        let constraints = vec![
            Constraint::less_than_or_equal("C1", 8, [x1.with(2), x2.with(3)]),
            Constraint::less_than_or_equal("C2", 10, [x2.with(2), x3.with(5)]),
            Constraint::less_than_or_equal("C3", 15, [x1.with(3), x2.with(2), x3.with(4)]),
        ];
        let initial = SolverIteration::from_parts(
            vec![x1.clone(), x2.clone(), x3.clone(), s1.clone(), s2.clone(), s3.clone()],
            ints(&[3, 5, 4, 0, 0, 0]),
            ints(&[-3, -5, -4, 0, 0, 0]),
            vec![s1, s2, s3],
            ints(&[8, 10, 15]),
            Grid::from_rows(vec![
                ints(&[2, 3, 0, 1, 0, 0]),
                ints(&[0, 2, 5, 0, 1, 0]),
                ints(&[3, 2, 4, 0, 0, 1]),
            ]),
        );

        let solved = Solver::new().simplex(initial, &constraints).unwrap();

        assert_eq!(solved.outcome, Outcome::Optimized);
        assert_eq!(solved.z, frac(765, 41));
        assert_eq!(solved.value(&x1), Some(&frac(89, 41)));
        assert_eq!(solved.value(&x2), Some(&frac(50, 41)));
        assert_eq!(solved.value(&x3), Some(&frac(62, 41)));
        assert!(solved.two_phase_history.is_empty());
    }

    #[test]
    fn test_history_records_pivots() {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut model = LinearModel::new(Objective::Max);
        let x1 = model.add_variable("X1");
        let x2 = model.add_variable("X2");
        model.set_objective(Objective::Max, [x1.with(3), x2.with(5)]);
        model.add_constraint(Constraint::less_than_or_equal("CT1", 4, [x1.with(1)]));
        model.add_constraint(Constraint::less_than_or_equal("CT2", 12, [x2.with(2)]));
        model.add_constraint(Constraint::less_than_or_equal("CT3", 18, [x1.with(3), x2.with(2)]));

        let solved = Solver::new().solve(&model).unwrap();

        assert_eq!(solved.outcome, Outcome::Optimized);
        assert_eq!(solved.z, Rational::from(36));
        assert_eq!(solved.value(&x1), Some(&Rational::from(2)));
        assert_eq!(solved.value(&x2), Some(&Rational::from(6)));

        // X2 enters first (most negative), leaving row CT2; then X1 enters at CT3
        let history = &solved.simplex_history;
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].pivot, Some(Pivot { row: 1, column: 1 }));
        assert_eq!(history[1].pivot, Some(Pivot { row: 2, column: 0 }));
        assert_eq!(history[2].pivot, None);
        assert_eq!(history[0].z, Rational::zero());
        assert_eq!(history[1].z, Rational::from(30));
        assert_eq!(history[2].z, Rational::from(36));
    }

    #[test]
    fn test_unbounded_keeps_partial_history() {
        // Maximize x1 + x2 subject to x1 - x2 <= 1
        let mut model = LinearModel::new(Objective::Max);
        let x1 = model.add_variable("X1");
        let x2 = model.add_variable("X2");
        model.set_objective(Objective::Max, [x1.with(1), x2.with(1)]);
        model.add_constraint(Constraint::less_than_or_equal("CT1", 1, [x1.with(1), x2.with(-1)]));

        let solved = Solver::new().solve(&model).unwrap();

        assert_eq!(solved.outcome, Outcome::Unbounded);
        assert_eq!(solved.simplex_history.len(), 2);
        assert_eq!(solved.simplex_history[0].pivot, Some(Pivot { row: 0, column: 0 }));
        assert_eq!(solved.z, Rational::zero());

        // Values of the last tableau, zero for non-basic columns
        assert_eq!(solved.solution.len(), 3);
        assert_eq!(solved.value(&x1), Some(&Rational::from(1)));
        assert_eq!(solved.value(&x2), Some(&Rational::zero()));
    }

    #[test]
    fn test_immediately_unbounded() {
        let mut model = LinearModel::new(Objective::Max);
        let x1 = model.add_variable("X1");
        model.set_objective(Objective::Max, [x1.with(1)]);
        model.add_constraint(Constraint::less_than_or_equal("CT1", 5, [x1.with(-1)]));

        let solved = Solver::new().solve(&model).unwrap();

        assert_eq!(solved.outcome, Outcome::Unbounded);
        assert_eq!(solved.simplex_history.len(), 1);
    }

    #[test]
    fn test_minimization_sign() {
        // Minimize -x1 - x2 subject to x1 + x2 <= 4 equals -(max x1 + x2)
        let build = |objective: Objective, coefficient: i64| {
            let mut model = LinearModel::new(objective);
            let x1 = model.add_variable("X1");
            let x2 = model.add_variable("X2");
            model.set_objective(objective, [x1.with(coefficient), x2.with(coefficient)]);
            model.add_constraint(Constraint::less_than_or_equal("CT1", 4, [x1.with(1), x2.with(1)]));
            model
        };

        let min = Solver::new().solve(&build(Objective::Min, -1)).unwrap();
        let max = Solver::new().solve(&build(Objective::Max, 1)).unwrap();

        assert_eq!(min.outcome, Outcome::Optimized);
        assert_eq!(min.z, Rational::from(-4));
        assert_eq!(min.z, -&max.z);
        assert_eq!(min.objective_orientation, Objective::Min);
    }

    #[test]
    fn test_zero_objective_stays_zero_for_min() {
        let mut model = LinearModel::new(Objective::Min);
        let x1 = model.add_variable("X1");
        model.set_objective(Objective::Min, [x1.with(1)]);
        model.add_constraint(Constraint::less_than_or_equal("CT1", 3, [x1.with(1)]));

        let solved = Solver::new().solve(&model).unwrap();

        assert_eq!(solved.outcome, Outcome::Optimized);
        assert_eq!(solved.z, Rational::zero());
        assert_eq!(solved.simplex_history.len(), 1);
    }

    #[test]
    fn test_bland_rule_reaches_same_optimum() {
        let mut model = LinearModel::new(Objective::Max);
        let x1 = model.add_variable("X1");
        let x2 = model.add_variable("X2");
        model.set_objective(Objective::Max, [x1.with(3), x2.with(5)]);
        model.add_constraint(Constraint::less_than_or_equal("CT1", 4, [x1.with(1)]));
        model.add_constraint(Constraint::less_than_or_equal("CT2", 12, [x2.with(2)]));
        model.add_constraint(Constraint::less_than_or_equal("CT3", 18, [x1.with(3), x2.with(2)]));

        let solved = Solver::new()
            .with_pivot_rule(PivotRule::Bland)
            .solve(&model)
            .unwrap();

        assert_eq!(solved.outcome, Outcome::Optimized);
        assert_eq!(solved.z, Rational::from(36));
        // Bland picks X1 first
        assert_eq!(solved.simplex_history[0].pivot.map(|p| p.column), Some(0));
    }

    #[test]
    fn test_iteration_limit() {
        let mut model = LinearModel::new(Objective::Max);
        let x1 = model.add_variable("X1");
        let x2 = model.add_variable("X2");
        model.set_objective(Objective::Max, [x1.with(3), x2.with(5)]);
        model.add_constraint(Constraint::less_than_or_equal("CT1", 4, [x1.with(1)]));
        model.add_constraint(Constraint::less_than_or_equal("CT2", 12, [x2.with(2)]));
        model.add_constraint(Constraint::less_than_or_equal("CT3", 18, [x1.with(3), x2.with(2)]));

        let result = Solver::new().with_max_iterations(1).solve(&model);
        assert_eq!(result.unwrap_err(), SolveError::IterationLimit { limit: 1 });

        // Two pivots are exactly enough
        assert!(Solver::new().with_max_iterations(2).solve(&model).is_ok());
    }

    /// Beale's degenerate problem, which cycles under Dantzig's rule.
    fn beale() -> LinearModel {
        let mut model = LinearModel::new(Objective::Max);
        let x4 = model.add_variable("X4");
        let x5 = model.add_variable("X5");
        let x6 = model.add_variable("X6");
        let x7 = model.add_variable("X7");
        model.set_objective(
            Objective::Max,
            [x4.with(frac(3, 4)), x5.with(-150), x6.with(frac(1, 50)), x7.with(-6)],
        );
        model.add_constraint(Constraint::less_than_or_equal(
            "CT1",
            0,
            [x4.with(frac(1, 4)), x5.with(-60), x6.with(frac(-1, 25)), x7.with(9)],
        ));
        model.add_constraint(Constraint::less_than_or_equal(
            "CT2",
            0,
            [x4.with(frac(1, 2)), x5.with(-90), x6.with(frac(-1, 50)), x7.with(3)],
        ));
        model.add_constraint(Constraint::less_than_or_equal("CT3", 1, [x6.with(1)]));
        model
    }

    #[test]
    fn test_dantzig_cycles_on_beale() {
        let result = Solver::new().with_max_iterations(50).solve(&beale());
        assert_eq!(result.unwrap_err(), SolveError::IterationLimit { limit: 50 });
    }

    #[test]
    fn test_bland_terminates_on_beale() {
        let model = beale();
        let solved = Solver::new()
            .with_pivot_rule(PivotRule::Bland)
            .with_max_iterations(50)
            .solve(&model)
            .unwrap();

        assert_eq!(solved.outcome, Outcome::Optimized);
        assert_eq!(solved.z, frac(1, 20));
        assert_eq!(solved.value_by_name("X4"), Some(&frac(1, 25)));
        assert_eq!(solved.value_by_name("X6"), Some(&Rational::one()));
    }

    #[test]
    fn test_undeclared_variable_is_rejected() {
        let mut model = LinearModel::new(Objective::Max);
        let x1 = model.add_variable("X1");
        let stray = Variable::input("X2");
        model.set_objective(Objective::Max, [x1.with(1)]);
        model.add_constraint(Constraint::less_than_or_equal("CT1", 4, [stray.with(1)]));

        let err = Solver::new().solve(&model).unwrap_err();
        assert_eq!(
            err,
            SolveError::UndeclaredVariable {
                location: "CT1".to_string(),
                variable: "X2".to_string()
            }
        );
    }

    #[test]
    fn test_solve_is_deterministic() {
        let mut model = LinearModel::new(Objective::Max);
        let x1 = model.add_variable("X1");
        let x2 = model.add_variable("X2");
        let x3 = model.add_variable("X3");
        model.set_objective(Objective::Max, [x1.with(3), x2.with(1), x2.with(0), x3.with(3)]);
        model.add_constraint(Constraint::less_than_or_equal("CT1", 2, [x1.with(2), x2.with(1), x3.with(1)]));
        model.add_constraint(Constraint::less_than_or_equal("CT2", 5, [x1.with(1), x2.with(2), x3.with(3)]));
        model.add_constraint(Constraint::less_than_or_equal("CT3", 6, [x1.with(2), x2.with(2), x3.with(1)]));

        let first = Solver::new().solve(&model).unwrap();
        let second = Solver::new().solve(&model).unwrap();

        assert_eq!(first.z, frac(27, 5));
        assert_eq!(first.z, second.z);
        assert_eq!(first.outcome, second.outcome);
        for (a, b) in first.input_values().iter().zip(second.input_values().iter()) {
            assert_eq!(a.0, b.0);
            assert_eq!(a.1, b.1);
        }
        let pivots = |s: &SolvedModel| s.simplex_history.iter().map(|it| it.pivot).collect::<Vec<_>>();
        assert_eq!(pivots(&first), pivots(&second));
    }
}
