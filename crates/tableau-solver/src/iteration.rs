use std::ops::{Index, IndexMut};

use crate::problem::{Variable, VariableKind};
use crate::rational::{ArithmeticError, Rational};

/// Dense row-major matrix of tableau coefficients.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    data: Vec<Rational>,
}

impl Grid {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![Rational::zero(); rows * cols],
        }
    }

    /// Build from explicit rows. Every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<Rational>>) -> Self {
        let cols = rows.first().map_or(0, Vec::len);
        debug_assert!(rows.iter().all(|r| r.len() == cols), "ragged grid");
        Self {
            rows: rows.len(),
            cols,
            data: rows.into_iter().flatten().collect(),
        }
    }

    pub fn num_rows(&self) -> usize {
        self.rows
    }

    pub fn num_cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, row: usize) -> &[Rational] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Rational]> {
        (0..self.rows).map(move |r| self.row(r))
    }

    pub fn column(&self, col: usize) -> impl Iterator<Item = &Rational> {
        (0..self.rows).map(move |r| &self[(r, col)])
    }

    /// Keep only the first `cols` columns.
    pub fn truncate_columns(&self, cols: usize) -> Grid {
        let cols = cols.min(self.cols);
        Grid::from_rows(self.rows().map(|row| row[..cols].to_vec()).collect())
    }
}

impl Index<(usize, usize)> for Grid {
    type Output = Rational;

    fn index(&self, (row, col): (usize, usize)) -> &Rational {
        &self.data[row * self.cols + col]
    }
}

impl IndexMut<(usize, usize)> for Grid {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut Rational {
        &mut self.data[row * self.cols + col]
    }
}

/// Per-variable header of a tableau column
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub variable: Variable,
    /// Objective coefficient (c_j)
    pub cost: Rational,
    /// Entry of the decision row
    pub reduced_cost: Rational,
}

/// Basic variable of a tableau row and its current value (RHS)
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub basis: Variable,
    pub value: Rational,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pivot {
    pub row: usize,
    pub column: usize,
}

/// One tableau snapshot.
///
/// Snapshots are values: [`SolverIteration::pivoted`] builds the next one and
/// leaves `self` untouched, so a history of snapshots can be replayed as-is.
/// `pivot` is the cell that was pivoted on to leave this snapshot; it is
/// `None` for the last snapshot of a run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SolverIteration {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
    pub grid: Grid,
    pub z: Rational,
    pub pivot: Option<Pivot>,
}

impl SolverIteration {
    /// Assemble a snapshot from the parallel-array view used by renderers.
    ///
    /// `costs` and `reduced_costs` have one entry per variable, `bases` and
    /// `values` one entry per grid row.
    pub fn from_parts(
        variables: Vec<Variable>,
        costs: Vec<Rational>,
        reduced_costs: Vec<Rational>,
        bases: Vec<Variable>,
        values: Vec<Rational>,
        grid: Grid,
    ) -> Self {
        let columns = variables
            .into_iter()
            .zip(costs)
            .zip(reduced_costs)
            .map(|((variable, cost), reduced_cost)| Column {
                variable,
                cost,
                reduced_cost,
            })
            .collect();
        let rows = bases
            .into_iter()
            .zip(values)
            .map(|(basis, value)| Row { basis, value })
            .collect();
        Self {
            columns,
            rows,
            grid,
            z: Rational::zero(),
            pivot: None,
        }
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.columns.iter().map(|c| &c.variable)
    }

    /// Cost row
    pub fn objective_variables(&self) -> impl Iterator<Item = &Rational> {
        self.columns.iter().map(|c| &c.cost)
    }

    /// Reduced-cost row
    pub fn decision_variables(&self) -> impl Iterator<Item = &Rational> {
        self.columns.iter().map(|c| &c.reduced_cost)
    }

    pub fn bases(&self) -> impl Iterator<Item = &Variable> {
        self.rows.iter().map(|r| &r.basis)
    }

    /// RHS value of each basic row
    pub fn base_variables(&self) -> impl Iterator<Item = &Rational> {
        self.rows.iter().map(|r| &r.value)
    }

    pub fn column_of(&self, variable: &Variable) -> Option<usize> {
        self.columns.iter().position(|c| c.variable == *variable)
    }

    /// Cost of `variable`, or zero when it has no column (a dropped artificial).
    pub fn cost_of(&self, variable: &Variable) -> Rational {
        self.column_of(variable)
            .map(|j| self.columns[j].cost.clone())
            .unwrap_or_else(Rational::zero)
    }

    pub fn has_artificial(&self) -> bool {
        self.first_artificial_column().is_some()
    }

    pub fn first_artificial_column(&self) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.variable.kind() == VariableKind::Artificial)
    }

    /// Objective value of the current basis: `Σ cost(basis_i) · value_i`.
    pub fn basis_objective(&self) -> Rational {
        self.rows
            .iter()
            .map(|r| self.cost_of(&r.basis) * &r.value)
            .sum()
    }

    /// `z_j = Σ_i cost(basis_i) · grid[i][j]` for column `j`.
    pub fn column_value(&self, column: usize) -> Rational {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, r)| self.cost_of(&r.basis) * &self.grid[(i, column)])
            .sum()
    }

    /// Replace the cost row and recompute `z` from the current basis.
    ///
    /// Reduced costs become `z_j - c_j` (maximizing) or `c_j - z_j`
    /// (minimizing); in both cases a negative entry marks an improving column.
    pub fn with_costs(&self, costs: Vec<Rational>, minimize: bool) -> SolverIteration {
        let mut next = self.clone();
        next.pivot = None;
        for (column, cost) in next.columns.iter_mut().zip(costs) {
            column.cost = cost;
        }
        for j in 0..next.columns.len() {
            let zj = next.column_value(j);
            let cj = &next.columns[j].cost;
            next.columns[j].reduced_cost = if minimize { cj - zj } else { zj - cj };
        }
        next.z = next.basis_objective();
        next
    }

    /// Drop every column from `cutoff` onwards (the artificial columns once
    /// phase 1 is over). Rows and their basic variables are kept.
    pub fn without_columns_from(&self, cutoff: usize) -> SolverIteration {
        let cutoff = cutoff.min(self.columns.len());
        SolverIteration {
            columns: self.columns[..cutoff].to_vec(),
            rows: self.rows.clone(),
            grid: self.grid.truncate_columns(cutoff),
            z: self.z.clone(),
            pivot: None,
        }
    }

    /// Gauss-Jordan pivot on `(row, column)`, producing the next snapshot.
    pub fn pivoted(&self, row: usize, column: usize) -> Result<SolverIteration, ArithmeticError> {
        let mut next = self.clone();
        next.pivot = None;

        let element = next.grid[(row, column)].clone();
        for j in 0..next.grid.num_cols() {
            next.grid[(row, j)] = next.grid[(row, j)].checked_div(&element)?;
        }
        next.rows[row].value = next.rows[row].value.checked_div(&element)?;

        let pivot_row = next.grid.row(row).to_vec();
        let pivot_value = next.rows[row].value.clone();

        for i in 0..next.grid.num_rows() {
            if i == row {
                continue;
            }
            let factor = next.grid[(i, column)].clone();
            if factor.is_zero() {
                continue;
            }
            for (j, entry) in pivot_row.iter().enumerate() {
                next.grid[(i, j)] -= &(&factor * entry);
            }
            next.rows[i].value -= &(&factor * &pivot_value);
        }

        let factor = next.columns[column].reduced_cost.clone();
        for (c, entry) in next.columns.iter_mut().zip(&pivot_row) {
            c.reduced_cost -= &(&factor * entry);
        }

        next.rows[row].basis = next.columns[column].variable.clone();
        next.z = next.basis_objective();
        Ok(next)
    }
}
