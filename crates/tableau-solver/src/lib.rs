mod iteration;
mod problem;
mod rational;
mod simplex;
mod solution;
mod standardize;
mod two_phase;

pub use iteration::{Column, Grid, Pivot, Row, SolverIteration};
pub use problem::{
    Constraint, ConstraintOp, LinearModel, Objective, Term, Variable, VariableId, VariableKind,
};
pub use rational::{ArithmeticError, Rational};
pub use simplex::{PivotRule, SolveError, Solver};
pub use solution::{Method, Outcome, SolvedModel};
pub use standardize::{densify, standard_form, standardize, StandardForm};
