use std::collections::HashMap;
use std::fmt;

use crate::iteration::SolverIteration;
use crate::problem::{Constraint, Objective, Term, Variable, VariableId, VariableKind};
use crate::rational::Rational;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// An optimal solution was found
    Optimized,
    /// The objective can grow without limit
    Unbounded,
    /// No point satisfies every constraint
    Infeasible,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Optimized => write!(f, "Optimized"),
            Outcome::Unbounded => write!(f, "Unbounded"),
            Outcome::Infeasible => write!(f, "Infeasible"),
        }
    }
}

/// Which stage of the algorithm produced a snapshot
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Phase 1 of the two-phase method
    TwoPhases,
    /// Plain simplex, or phase 2 of the two-phase method
    Simplex,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::TwoPhases => write!(f, "Two Phases"),
            Method::Simplex => write!(f, "Simplex"),
        }
    }
}

/// The result of solving a linear model, with every tableau visited on the way
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct SolvedModel {
    /// Variables of the final tableau
    pub variables: Vec<Variable>,
    /// Constraints the solution was validated against
    pub constraints: Vec<Constraint>,
    /// Phase 1 snapshots (empty when no artificial variable was needed)
    pub two_phase_history: Vec<SolverIteration>,
    /// Simplex (or phase 2) snapshots
    pub simplex_history: Vec<SolverIteration>,
    pub objective_orientation: Objective,
    pub objective_function: Vec<Term>,
    /// Value of every variable, zero for non-basic ones
    pub solution: HashMap<VariableId, Rational>,
    /// Objective value, in the orientation of the original model
    pub z: Rational,
    pub outcome: Outcome,
}

impl SolvedModel {
    pub(crate) fn new(
        variables: Vec<Variable>,
        constraints: Vec<Constraint>,
        simplex_history: Vec<SolverIteration>,
        outcome: Outcome,
    ) -> Self {
        Self {
            variables,
            constraints,
            two_phase_history: Vec::new(),
            simplex_history,
            objective_orientation: Objective::Max,
            objective_function: Vec::new(),
            solution: HashMap::new(),
            z: Rational::zero(),
            outcome,
        }
    }

    pub fn is_optimized(&self) -> bool {
        self.outcome == Outcome::Optimized
    }

    pub fn value(&self, variable: &Variable) -> Option<&Rational> {
        self.solution.get(&variable.id())
    }

    pub fn value_by_name(&self, name: &str) -> Option<&Rational> {
        self.variables
            .iter()
            .find(|v| v.name() == name)
            .and_then(|v| self.value(v))
    }

    /// Values of the input variables, in tableau order.
    pub fn input_values(&self) -> Vec<(&Variable, Rational)> {
        self.variables
            .iter()
            .filter(|v| v.kind() == VariableKind::Input)
            .map(|v| (v, self.value(v).cloned().unwrap_or_else(Rational::zero)))
            .collect()
    }

    /// Every snapshot in playback order, tagged with the stage that produced it.
    pub fn pages(&self) -> impl Iterator<Item = (Method, &SolverIteration)> {
        self.two_phase_history
            .iter()
            .map(|it| (Method::TwoPhases, it))
            .chain(self.simplex_history.iter().map(|it| (Method::Simplex, it)))
    }

    pub fn num_iterations(&self) -> usize {
        self.two_phase_history.len() + self.simplex_history.len()
    }

    /// Human-readable objective, e.g. `MAX Z: 3X1 + 5X2`. Zero terms are omitted.
    pub fn objective_text(&self) -> String {
        let mut text = String::new();
        for term in &self.objective_function {
            let coefficient = &term.coefficient;
            if coefficient.is_zero() {
                continue;
            }
            let magnitude = if coefficient.is_negative() {
                -coefficient
            } else {
                coefficient.clone()
            };
            let sign = if coefficient.is_negative() { "-" } else { "+" };
            if text.is_empty() {
                if coefficient.is_negative() {
                    text.push('-');
                }
            } else {
                text.push_str(&format!(" {} ", sign));
            }
            if magnitude != Rational::one() {
                text.push_str(&magnitude.to_string());
            }
            text.push_str(term.variable.name());
        }
        if text.is_empty() {
            text.push('0');
        }
        format!("{} Z: {}", self.objective_orientation, text)
    }
}
