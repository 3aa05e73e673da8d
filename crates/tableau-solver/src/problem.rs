use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::rational::Rational;

static NEXT_VARIABLE_ID: AtomicUsize = AtomicUsize::new(0);

/// Identity handle of a [`Variable`], minted once when the variable is created.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariableId(usize);

impl VariableId {
    fn mint() -> Self {
        Self(NEXT_VARIABLE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VariableKind {
    /// Declared by the model
    Input,
    /// Added to turn an inequality into an equality
    Slack,
    /// Added to give a >= or = row an initial basic variable
    Artificial,
}

/// A decision, slack or artificial variable.
///
/// Two variables are equal only if they share the same [`VariableId`]; two
/// separately created variables named `X1` are different variables.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Variable {
    id: VariableId,
    name: String,
    kind: VariableKind,
}

impl Variable {
    pub fn new(name: impl Into<String>, kind: VariableKind) -> Self {
        Self {
            id: VariableId::mint(),
            name: name.into(),
            kind,
        }
    }

    pub fn input(name: impl Into<String>) -> Self {
        Self::new(name, VariableKind::Input)
    }

    pub fn slack(name: impl Into<String>) -> Self {
        Self::new(name, VariableKind::Slack)
    }

    pub fn artificial(name: impl Into<String>) -> Self {
        Self::new(name, VariableKind::Artificial)
    }

    pub fn id(&self) -> VariableId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    /// Pair this variable with a coefficient.
    pub fn with(&self, coefficient: impl Into<Rational>) -> Term {
        Term {
            coefficient: coefficient.into(),
            variable: self.clone(),
        }
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One `coefficient × variable` term of a linear expression
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub coefficient: Rational,
    pub variable: Variable,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

impl ConstraintOp {
    /// The relation obtained by multiplying both sides by -1.
    pub fn flipped(self) -> Self {
        match self {
            ConstraintOp::Le => ConstraintOp::Ge,
            ConstraintOp::Ge => ConstraintOp::Le,
            ConstraintOp::Eq => ConstraintOp::Eq,
        }
    }

    pub fn holds(self, lhs: &Rational, rhs: &Rational) -> bool {
        match self {
            ConstraintOp::Le => lhs <= rhs,
            ConstraintOp::Ge => lhs >= rhs,
            ConstraintOp::Eq => lhs == rhs,
        }
    }
}

impl fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintOp::Le => write!(f, "<="),
            ConstraintOp::Ge => write!(f, ">="),
            ConstraintOp::Eq => write!(f, "="),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Name/label for the constraint (for diagnostics)
    pub name: String,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: Rational,
    /// Left-hand side terms
    pub terms: Vec<Term>,
}

impl Constraint {
    pub fn new(
        name: impl Into<String>,
        op: ConstraintOp,
        rhs: impl Into<Rational>,
        terms: impl IntoIterator<Item = Term>,
    ) -> Self {
        Self {
            name: name.into(),
            op,
            rhs: rhs.into(),
            terms: terms.into_iter().collect(),
        }
    }

    pub fn less_than_or_equal(
        name: impl Into<String>,
        rhs: impl Into<Rational>,
        terms: impl IntoIterator<Item = Term>,
    ) -> Self {
        Self::new(name, ConstraintOp::Le, rhs, terms)
    }

    pub fn greater_than_or_equal(
        name: impl Into<String>,
        rhs: impl Into<Rational>,
        terms: impl IntoIterator<Item = Term>,
    ) -> Self {
        Self::new(name, ConstraintOp::Ge, rhs, terms)
    }

    pub fn equal(
        name: impl Into<String>,
        rhs: impl Into<Rational>,
        terms: impl IntoIterator<Item = Term>,
    ) -> Self {
        Self::new(name, ConstraintOp::Eq, rhs, terms)
    }

    /// Evaluate the left-hand side with `value_of` supplying each variable's value.
    pub fn lhs<F>(&self, mut value_of: F) -> Rational
    where
        F: FnMut(&Variable) -> Rational,
    {
        self.terms
            .iter()
            .map(|term| &term.coefficient * value_of(&term.variable))
            .sum()
    }

    pub fn is_satisfied_by<F>(&self, value_of: F) -> bool
    where
        F: FnMut(&Variable) -> Rational,
    {
        self.op.holds(&self.lhs(value_of), &self.rhs)
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Objective {
    #[default]
    Max,
    Min,
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Objective::Max => write!(f, "MAX"),
            Objective::Min => write!(f, "MIN"),
        }
    }
}

/// Represents a linear programming problem as declared by the user
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    /// Whether to maximize or minimize
    pub objective: Objective,
    /// Input variables, in declaration order
    pub variables: Vec<Variable>,
    /// Constraints
    pub constraints: Vec<Constraint>,
    /// Objective function terms
    pub objective_function: Vec<Term>,
}

impl LinearModel {
    pub fn new(objective: Objective) -> Self {
        Self {
            objective,
            variables: Vec::new(),
            constraints: Vec::new(),
            objective_function: Vec::new(),
        }
    }

    /// Declare a new input variable.
    pub fn add_variable(&mut self, name: impl Into<String>) -> Variable {
        let variable = Variable::input(name);
        self.variables.push(variable.clone());
        variable
    }

    pub fn set_objective(&mut self, objective: Objective, terms: impl IntoIterator<Item = Term>) {
        self.objective = objective;
        self.objective_function = terms.into_iter().collect();
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Find the first term (objective or constraint) whose variable was never
    /// declared in `variables`. Returns `(location, variable name)`.
    pub fn undeclared_variable(&self) -> Option<(String, String)> {
        let declared: HashSet<_> = self.variables.iter().map(Variable::id).collect();

        let objective = self
            .objective_function
            .iter()
            .map(|term| ("objective".to_string(), term));
        let constraints = self
            .constraints
            .iter()
            .flat_map(|c| c.terms.iter().map(move |term| (c.name.clone(), term)));

        objective
            .chain(constraints)
            .find(|(_, term)| !declared.contains(&term.variable.id()))
            .map(|(location, term)| (location, term.variable.name().to_string()))
    }
}
