//! Dense chains-by-validators matrix used for stake, risk, liveness, and
//! fragmentation weight state. Rows are chains, columns are validators.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Creates a matrix of zeros with the given shape.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Creates a matrix where every entry is `value`.
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Builds a matrix from row vectors. All rows must have equal length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, |r| r.len());
        debug_assert!(rows.iter().all(|r| r.len() == n_cols));
        let data = rows.into_iter().flatten().collect();
        Self {
            rows: n_rows,
            cols: n_cols,
            data,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [f64] {
        &mut self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Appends a row. The row length must match the matrix width, except on
    /// an empty matrix where it sets the width.
    pub fn push_row(&mut self, row: Vec<f64>) {
        if self.rows == 0 && self.cols == 0 {
            self.cols = row.len();
        }
        debug_assert_eq!(row.len(), self.cols);
        self.data.extend(row);
        self.rows += 1;
    }

    /// Sum over one column (a validator's total across chains).
    pub fn col_sum(&self, col: usize) -> f64 {
        (0..self.rows).map(|r| self.get(r, col)).sum()
    }

    /// Per-column sums as a vector.
    pub fn col_sums(&self) -> Vec<f64> {
        (0..self.cols).map(|c| self.col_sum(c)).collect()
    }

    /// Sum over all entries.
    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Applies `f` to every entry in place.
    pub fn map_inplace<F: FnMut(f64) -> f64>(&mut self, mut f: F) {
        for v in self.data.iter_mut() {
            *v = f(*v);
        }
    }

    /// Sum of entry-wise products with another matrix of the same shape.
    pub fn dot_sum(&self, other: &Matrix) -> f64 {
        debug_assert_eq!((self.rows, self.cols), (other.rows, other.cols));
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    /// Iterator over row slices.
    pub fn row_iter(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks(self.cols.max(1)).take(self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_row_and_sums() {
        let mut m = Matrix::zeros(0, 0);
        m.push_row(vec![1.0, 2.0, 3.0]);
        m.push_row(vec![4.0, 5.0, 6.0]);
        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 3);
        assert_eq!(m.col_sum(1), 7.0);
        assert_eq!(m.col_sums(), vec![5.0, 7.0, 9.0]);
        assert_eq!(m.sum(), 21.0);
    }

    #[test]
    fn test_dot_sum() {
        let a = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        let b = Matrix::from_rows(vec![vec![2.0, 0.0], vec![0.0, 2.0]]);
        assert_eq!(a.dot_sum(&b), 2.0 + 8.0);
    }

    #[test]
    fn test_map_inplace_floor() {
        let mut m = Matrix::from_rows(vec![vec![100.0, 200_000.0]]);
        m.map_inplace(|v| if v < 180_000.0 { 0.0 } else { v });
        assert_eq!(m.row(0), &[0.0, 200_000.0]);
    }
}
