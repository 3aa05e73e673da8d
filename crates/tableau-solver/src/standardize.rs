use crate::iteration::{Grid, SolverIteration};
use crate::problem::{Constraint, ConstraintOp, LinearModel, Objective, Variable};
use crate::rational::Rational;

/// An LP rewritten with equality rows, one dense term per variable
#[derive(Debug, Clone)]
pub struct StandardForm {
    /// Input, then slack, then artificial variables
    pub variables: Vec<Variable>,
    /// Dense rows, terms in `variables` order, every rhs non-negative
    pub constraints: Vec<Constraint>,
    /// Maximization costs, one per variable
    pub costs: Vec<Rational>,
    /// Initial basic variable of each row
    pub bases: Vec<Variable>,
}

impl StandardForm {
    /// The initial tableau: reduced costs `-c_j`, basis values equal to the
    /// right-hand sides, `z = 0`.
    pub fn into_iteration(self) -> SolverIteration {
        let grid = Grid::from_rows(
            self.constraints
                .iter()
                .map(|c| c.terms.iter().map(|t| t.coefficient.clone()).collect())
                .collect(),
        );
        let grid = if grid.num_rows() == 0 {
            Grid::zeros(0, self.variables.len())
        } else {
            grid
        };
        let values = self.constraints.iter().map(|c| c.rhs.clone()).collect();
        let reduced_costs = self.costs.iter().map(|c| -c).collect();
        SolverIteration::from_parts(
            self.variables,
            self.costs,
            reduced_costs,
            self.bases,
            values,
            grid,
        )
    }
}

/// Rewrite `model` in standard form.
///
/// Rows with a negative right-hand side are negated first. Each `<=` row
/// then gains a slack (+1), each `>=` row a slack (-1) and an artificial (+1),
/// each `=` row an artificial (+1). Slack and artificial names are numbered
/// across the whole model (`S1`, `S2`, ..., `A1`, ...).
///
/// Columns are ordered Input < Slack < Artificial, keeping creation order
/// within a kind. The initial basis of each row is the column added to it
/// with coefficient +1 (its slack, or its artificial for `>=` and `=` rows).
/// The engine always maximizes, so a MIN objective has its costs negated here.
pub fn standard_form(model: &LinearModel) -> StandardForm {
    let mut variables = model.variables.clone();
    let mut rows: Vec<Constraint> = Vec::with_capacity(model.num_constraints());
    let mut bases: Vec<Variable> = Vec::with_capacity(model.num_constraints());
    let mut slack_count = 0;
    let mut artificial_count = 0;

    for constraint in &model.constraints {
        let mut row = constraint.clone();
        if row.rhs.is_negative() {
            row.op = row.op.flipped();
            row.rhs = -&row.rhs;
            for term in &mut row.terms {
                term.coefficient = -&term.coefficient;
            }
        }

        match row.op {
            ConstraintOp::Le => {
                slack_count += 1;
                let slack = Variable::slack(format!("S{}", slack_count));
                row.terms.push(slack.with(1));
                bases.push(slack.clone());
                variables.push(slack);
            }
            ConstraintOp::Ge => {
                slack_count += 1;
                artificial_count += 1;
                let slack = Variable::slack(format!("S{}", slack_count));
                let artificial = Variable::artificial(format!("A{}", artificial_count));
                row.terms.push(slack.with(-1));
                row.terms.push(artificial.with(1));
                bases.push(artificial.clone());
                variables.push(slack);
                variables.push(artificial);
            }
            ConstraintOp::Eq => {
                artificial_count += 1;
                let artificial = Variable::artificial(format!("A{}", artificial_count));
                row.terms.push(artificial.with(1));
                bases.push(artificial.clone());
                variables.push(artificial);
            }
        }
        rows.push(row);
    }

    // Stable, so creation order is kept within each kind
    variables.sort_by_key(Variable::kind);

    let constraints = rows.iter().map(|row| densify(row, &variables)).collect();

    let sign = match model.objective {
        Objective::Max => Rational::one(),
        Objective::Min => -Rational::one(),
    };
    let mut costs = vec![Rational::zero(); variables.len()];
    for term in &model.objective_function {
        if let Some(j) = variables.iter().position(|v| *v == term.variable) {
            costs[j] += &(&sign * &term.coefficient);
        }
    }

    log::debug!(
        "standardized {} constraints into {} columns ({} slack, {} artificial)",
        rows.len(),
        variables.len(),
        slack_count,
        artificial_count
    );

    StandardForm {
        variables,
        constraints,
        costs,
        bases,
    }
}

/// Build the initial canonical tableau of `model`.
pub fn standardize(model: &LinearModel) -> SolverIteration {
    standard_form(model).into_iteration()
}

/// Rewrite `constraint` densely over `variables`, one term per variable in that order.
pub fn densify(constraint: &Constraint, variables: &[Variable]) -> Constraint {
    let terms = variables
        .iter()
        .map(|v| {
            let coefficient = constraint
                .terms
                .iter()
                .filter(|t| t.variable == *v)
                .map(|t| &t.coefficient)
                .sum::<Rational>();
            v.with(coefficient)
        })
        .collect();
    Constraint {
        name: constraint.name.clone(),
        op: constraint.op,
        rhs: constraint.rhs.clone(),
        terms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<Rational> {
        values.iter().map(|&v| Rational::from(v)).collect()
    }

    fn names(iteration: &SolverIteration) -> Vec<&str> {
        iteration.variables().map(Variable::name).collect()
    }

    #[test]
    fn test_all_le_constraints() {
        // MAX 3x1 + 5x2; x1 <= 4; 2x2 <= 12; 3x1 + 2x2 <= 18
        let mut model = LinearModel::new(Objective::Max);
        let x1 = model.add_variable("X1");
        let x2 = model.add_variable("X2");
        model.set_objective(Objective::Max, [x1.with(3), x2.with(5)]);
        model.add_constraint(Constraint::less_than_or_equal("CT1", 4, [x1.with(1)]));
        model.add_constraint(Constraint::less_than_or_equal("CT2", 12, [x2.with(2)]));
        model.add_constraint(Constraint::less_than_or_equal("CT3", 18, [x1.with(3), x2.with(2)]));

        let first = standardize(&model);

        assert_eq!(names(&first), vec!["X1", "X2", "S1", "S2", "S3"]);
        assert_eq!(first.objective_variables().cloned().collect::<Vec<_>>(), ints(&[3, 5, 0, 0, 0]));
        assert_eq!(first.decision_variables().cloned().collect::<Vec<_>>(), ints(&[-3, -5, 0, 0, 0]));
        assert_eq!(first.bases().map(Variable::name).collect::<Vec<_>>(), vec!["S1", "S2", "S3"]);
        assert_eq!(first.base_variables().cloned().collect::<Vec<_>>(), ints(&[4, 12, 18]));
        assert_eq!(first.grid.row(2), ints(&[3, 2, 0, 0, 1]).as_slice());
        assert_eq!(first.z, Rational::zero());
        assert_eq!(first.pivot, None);
        assert!(!first.has_artificial());
    }

    #[test]
    fn test_mixed_relations_and_kind_order() {
        // MIN x1 + x2; 2x1 + x2 >= 4; x1 + 7x2 = 7; x1 <= 3
        let mut model = LinearModel::new(Objective::Min);
        let x1 = model.add_variable("X1");
        let x2 = model.add_variable("X2");
        model.set_objective(Objective::Min, [x1.with(1), x2.with(1)]);
        model.add_constraint(Constraint::greater_than_or_equal("CT1", 4, [x1.with(2), x2.with(1)]));
        model.add_constraint(Constraint::equal("CT2", 7, [x1.with(1), x2.with(7)]));
        model.add_constraint(Constraint::less_than_or_equal("CT3", 3, [x1.with(1)]));

        let first = standardize(&model);

        assert_eq!(names(&first), vec!["X1", "X2", "S1", "S2", "A1", "A2"]);
        assert_eq!(first.objective_variables().cloned().collect::<Vec<_>>(), ints(&[-1, -1, 0, 0, 0, 0]));
        assert_eq!(first.grid.row(0), ints(&[2, 1, -1, 0, 1, 0]).as_slice());
        assert_eq!(first.grid.row(1), ints(&[1, 7, 0, 0, 0, 1]).as_slice());
        assert_eq!(first.grid.row(2), ints(&[1, 0, 0, 1, 0, 0]).as_slice());
        assert_eq!(first.bases().map(Variable::name).collect::<Vec<_>>(), vec!["A1", "A2", "S2"]);
        assert!(first.has_artificial());
    }

    #[test]
    fn test_negative_rhs_flips_row() {
        // -x1 - x2 <= -2 becomes x1 + x2 >= 2
        let mut model = LinearModel::new(Objective::Max);
        let x1 = model.add_variable("X1");
        let x2 = model.add_variable("X2");
        model.set_objective(Objective::Max, [x1.with(1)]);
        model.add_constraint(Constraint::less_than_or_equal("CT1", -2, [x1.with(-1), x2.with(-1)]));

        let first = standardize(&model);

        assert_eq!(names(&first), vec!["X1", "X2", "S1", "A1"]);
        assert_eq!(first.grid.row(0), ints(&[1, 1, -1, 1]).as_slice());
        assert_eq!(first.base_variables().cloned().collect::<Vec<_>>(), ints(&[2]));
        // The source model is untouched
        assert_eq!(model.constraints[0].rhs, Rational::from(-2));
        assert_eq!(model.constraints[0].op, ConstraintOp::Le);
    }

    #[test]
    fn test_repeated_objective_terms_accumulate() {
        let mut model = LinearModel::new(Objective::Max);
        let x1 = model.add_variable("X1");
        model.set_objective(Objective::Max, [x1.with(2), x1.with(3)]);
        model.add_constraint(Constraint::less_than_or_equal("CT1", 1, [x1.with(1)]));

        let first = standardize(&model);
        assert_eq!(first.columns[0].cost, Rational::from(5));
    }

    #[test]
    fn test_standard_form_rows_are_dense() {
        let mut model = LinearModel::new(Objective::Max);
        let x1 = model.add_variable("X1");
        let x2 = model.add_variable("X2");
        model.set_objective(Objective::Max, [x1.with(1), x2.with(1)]);
        model.add_constraint(Constraint::greater_than_or_equal("CT1", 2, [x2.with(1)]));
        model.add_constraint(Constraint::less_than_or_equal("CT2", 5, [x1.with(1)]));

        let form = standard_form(&model);
        for row in &form.constraints {
            let order: Vec<_> = row.terms.iter().map(|t| t.variable.clone()).collect();
            assert_eq!(order, form.variables);
        }
        assert_eq!(form.constraints[1].terms[0], x1.with(1));
        assert_eq!(form.constraints[1].terms[1], x2.with(0));
    }

    #[test]
    fn test_densify() {
        let x1 = Variable::input("X1");
        let x2 = Variable::input("X2");
        let s1 = Variable::slack("S1");
        let c = Constraint::less_than_or_equal("CT1", 5, [x2.with(4)]);
        let dense = densify(&c, &[x1.clone(), x2.clone(), s1.clone()]);

        assert_eq!(dense.terms.len(), 3);
        assert_eq!(dense.terms[0], x1.with(0));
        assert_eq!(dense.terms[1], x2.with(4));
        assert_eq!(dense.terms[2].variable, s1);
    }
}
