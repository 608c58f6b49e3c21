use rand::Rng;
use serde::{Serialize, Deserialize};

/// Dense row-major matrix.
///
/// Weight matrices use one row per node and one column per incoming
/// connection, which is also the shape written to a `NetworkExport`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix{
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<f64>>
}

impl Matrix{
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix{
            rows,
            cols,
            data: vec![vec![0.0; cols]; rows]
        }
    }

    /// Samples every entry uniformly from `[-bound, bound]`.
    pub fn uniform<R: Rng + ?Sized>(rows: usize, cols: usize, bound: f64, rng: &mut R) -> Matrix {
        let mut res = Matrix::zeros(rows, cols);

        for i in 0..rows {
            for j in 0..cols {
                res.data[i][j] = rng.gen_range(-bound..=bound);
            }
        }

        res
    }

    /// Wraps row data; `cols` is taken from the first row (0 when empty).
    /// Callers are responsible for the rows being of equal length.
    pub fn from_data(data: Vec<Vec<f64>>) -> Matrix {
        Matrix {
            rows: data.len(),
            cols: data.first().map_or(0, |row| row.len()),
            data
        }
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.data[i]
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix { rows: 0, cols: 0, data: vec![] }
    }
}

/// Vector of `len` values drawn uniformly from `[-bound, bound]`.
pub fn uniform_vec<R: Rng + ?Sized>(len: usize, bound: f64, rng: &mut R) -> Vec<f64> {
    (0..len).map(|_| rng.gen_range(-bound..=bound)).collect()
}
