use std::fmt;

use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatrixError {
    #[error("Row {row} has {found} columns, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Cannot multiply: left operand has {left_cols} columns, right operand has {right_rows} rows")]
    DimensionMismatch { left_cols: usize, right_rows: usize },
    #[error("Product cell ({row}, {col}) overflows i64")]
    Overflow { row: usize, col: usize },
    #[error("A worker computing a product cell panicked")]
    WorkerPanicked,
}

/// Dense row-major matrix of integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<i64>,
}

impl Matrix {
    /// Zero-filled matrix.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0; rows * cols],
        }
    }

    pub fn from_rows(rows: Vec<Vec<i64>>) -> Result<Self, MatrixError> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (row, values) in rows.iter().enumerate() {
            if values.len() != cols {
                return Err(MatrixError::Ragged {
                    row,
                    expected: cols,
                    found: values.len(),
                });
            }
            data.extend_from_slice(values);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<i64> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    fn at(&self, row: usize, col: usize) -> i64 {
        self.data[row * self.cols + col]
    }

    fn at_mut(&mut self, row: usize, col: usize) -> &mut i64 {
        &mut self.data[row * self.cols + col]
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows {
            for col in 0..self.cols {
                write!(f, "{} ", self.at(row, col))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Computes `a * b` with one thread per output cell.
///
/// Every worker accumulates its terms into the shared product through a single
/// lock, one read-modify-write per term. The scope returns once every worker
/// has finished. Arithmetic is checked, a cell that does not fit in `i64` fails
/// the whole product with [`MatrixError::Overflow`].
pub fn multiply_concurrent(a: &Matrix, b: &Matrix) -> Result<Matrix, MatrixError> {
    if a.cols != b.rows {
        return Err(MatrixError::DimensionMismatch {
            left_cols: a.cols,
            right_rows: b.rows,
        });
    }

    let product = Mutex::new(Matrix::new(a.rows, b.cols));
    let results = crossbeam::scope(|scope| {
        let workers: Vec<_> = (0..a.rows)
            .flat_map(|row| (0..b.cols).map(move |col| (row, col)))
            .map(|(row, col)| {
                let product = &product;
                scope.spawn(move |_| accumulate_cell(a, b, product, row, col))
            })
            .collect();
        workers
            .into_iter()
            .map(|worker| worker.join().unwrap_or(Err(MatrixError::WorkerPanicked)))
            .collect::<Vec<_>>()
    })
    .map_err(|_| MatrixError::WorkerPanicked)?;
    results.into_iter().collect::<Result<(), _>>()?;

    tracing::debug!(rows = a.rows, cols = b.cols, "matrix product computed");
    Ok(product.into_inner())
}

fn accumulate_cell(
    a: &Matrix,
    b: &Matrix,
    product: &Mutex<Matrix>,
    row: usize,
    col: usize,
) -> Result<(), MatrixError> {
    for k in 0..a.cols {
        let term = a
            .at(row, k)
            .checked_mul(b.at(k, col))
            .ok_or(MatrixError::Overflow { row, col })?;
        let mut product = product.lock();
        let cell = product.at_mut(row, col);
        *cell = cell
            .checked_add(term)
            .ok_or(MatrixError::Overflow { row, col })?;
    }
    tracing::trace!(row, col, "product cell computed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequential(a: &Matrix, b: &Matrix) -> Matrix {
        let mut product = Matrix::new(a.rows, b.cols);
        for row in 0..a.rows {
            for col in 0..b.cols {
                *product.at_mut(row, col) = (0..a.cols).map(|k| a.at(row, k) * b.at(k, col)).sum();
            }
        }
        product
    }

    #[test]
    fn multiply_square() {
        let a = Matrix::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9]]).unwrap();
        let b = Matrix::from_rows(vec![vec![9, 8, 7], vec![6, 5, 4], vec![3, 2, 1]]).unwrap();
        let c = multiply_concurrent(&a, &b).unwrap();
        let expected =
            Matrix::from_rows(vec![vec![30, 24, 18], vec![84, 69, 54], vec![138, 114, 90]])
                .unwrap();
        assert_eq!(c, expected);
        assert_eq!(c.to_string(), "30 24 18 \n84 69 54 \n138 114 90 \n");
    }

    #[test]
    fn multiply_rectangular() {
        let a = Matrix::from_rows(vec![vec![1, -2, 3, 0], vec![2, 2, -1, 5]]).unwrap();
        let b = Matrix::from_rows(vec![
            vec![1, 0, 2],
            vec![0, 1, -1],
            vec![3, 3, 3],
            vec![-4, 2, 1],
        ])
        .unwrap();
        let c = multiply_concurrent(&a, &b).unwrap();
        assert_eq!(c.rows(), 2);
        assert_eq!(c.cols(), 3);
        assert_eq!(c, sequential(&a, &b));
        assert_eq!(c.get(1, 2), Some(4));
        assert_eq!(c.get(2, 0), None);
    }

    #[test]
    fn dimension_mismatch() {
        let a = Matrix::new(2, 3);
        let b = Matrix::new(2, 3);
        let err = multiply_concurrent(&a, &b).unwrap_err();
        assert_eq!(
            err,
            MatrixError::DimensionMismatch {
                left_cols: 3,
                right_rows: 2
            }
        );
    }

    #[test]
    fn overflowing_term() {
        let a = Matrix::from_rows(vec![vec![1, 0], vec![i64::MAX, 0]]).unwrap();
        let b = Matrix::from_rows(vec![vec![2], vec![0]]).unwrap();
        let err = multiply_concurrent(&a, &b).unwrap_err();
        assert_eq!(err, MatrixError::Overflow { row: 1, col: 0 });
    }

    #[test]
    fn overflowing_sum() {
        let a = Matrix::from_rows(vec![vec![i64::MAX, 1]]).unwrap();
        let b = Matrix::from_rows(vec![vec![1], vec![1]]).unwrap();
        let err = multiply_concurrent(&a, &b).unwrap_err();
        assert_eq!(err, MatrixError::Overflow { row: 0, col: 0 });
        assert_eq!(err.to_string(), "Product cell (0, 0) overflows i64");
    }

    #[test]
    fn ragged_rows() {
        let err = Matrix::from_rows(vec![vec![1, 2], vec![3]]).unwrap_err();
        assert_eq!(
            err,
            MatrixError::Ragged {
                row: 1,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn empty_product() {
        let a = Matrix::new(0, 3);
        let b = Matrix::new(3, 2);
        let c = multiply_concurrent(&a, &b).unwrap();
        assert_eq!(c, Matrix::new(0, 2));
        assert_eq!(c.to_string(), "");
    }
}
