//! Dense n-dimensional `f64` matrices.
//!
//! A [`Matrix`] always satisfies `data.len() == product(dims)` and has at least
//! one dimension, every dimension non-zero. Indexing is row-major: the last axis
//! varies fastest.
//!
//! ```rust
//! use polyform::Matrix;
//!
//! let mut m = Matrix::new(&[2, 3]).unwrap();
//! m.set_data(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
//! assert_eq!(m.total_size(), 6);
//! assert_eq!(m.get(&[1, 2]), Some(5.0));
//! assert_eq!(m.get(&[2, 0]), None);
//! ```

use crate::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    dims: Vec<usize>,
    data: Vec<f64>,
}

impl Matrix {
    /// Creates a zero-filled matrix with the given dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMatrix`] when `dims` is empty, contains a zero,
    /// or the element count overflows `usize`.
    pub fn new(dims: &[usize]) -> Result<Self> {
        let total = checked_total(dims)?;
        Ok(Matrix {
            dims: dims.to_vec(),
            data: vec![0.0; total],
        })
    }

    /// Creates a matrix from dimensions and exactly `product(dims)` values.
    pub fn from_data(dims: &[usize], data: Vec<f64>) -> Result<Self> {
        let total = checked_total(dims)?;
        if data.len() != total {
            return Err(Error::invalid_matrix(&format!(
                "dims {:?} need {} values, got {}",
                dims,
                total,
                data.len()
            )));
        }
        Ok(Matrix {
            dims: dims.to_vec(),
            data,
        })
    }

    #[inline]
    #[must_use]
    pub fn ndims(&self) -> usize {
        self.dims.len()
    }

    /// Size along `axis`, or `None` past the last axis.
    #[inline]
    #[must_use]
    pub fn dim(&self, axis: usize) -> Option<usize> {
        self.dims.get(axis).copied()
    }

    #[inline]
    #[must_use]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Flat row-major offset of `indices`, if every index is in range.
    #[must_use]
    pub fn offset(&self, indices: &[usize]) -> Option<usize> {
        if indices.len() != self.dims.len() {
            return None;
        }
        let mut offset = 0;
        for (&index, &dim) in indices.iter().zip(&self.dims) {
            if index >= dim {
                return None;
            }
            offset = offset * dim + index;
        }
        Some(offset)
    }

    /// Element at `indices`, or `None` when out of range.
    #[must_use]
    pub fn get(&self, indices: &[usize]) -> Option<f64> {
        self.offset(indices).map(|i| self.data[i])
    }

    /// Stores `value` at `indices`. Returns `false` and leaves the matrix
    /// untouched when the indices are out of range.
    pub fn set(&mut self, indices: &[usize], value: f64) -> bool {
        match self.offset(indices) {
            Some(i) => {
                self.data[i] = value;
                true
            }
            None => false,
        }
    }

    pub fn fill(&mut self, value: f64) {
        self.data.iter_mut().for_each(|v| *v = value);
    }

    /// Copies the leading `min(values.len(), total_size())` values into the
    /// matrix, ignoring any excess, and returns how many were copied.
    pub fn set_data(&mut self, values: &[f64]) -> usize {
        let count = values.len().min(self.data.len());
        self.data[..count].copy_from_slice(&values[..count]);
        count
    }

    pub(crate) fn into_parts(self) -> (Vec<usize>, Vec<f64>) {
        (self.dims, self.data)
    }
}

/// A single zero element with dims `[1]`.
impl Default for Matrix {
    fn default() -> Self {
        Matrix {
            dims: vec![1],
            data: vec![0.0],
        }
    }
}

fn checked_total(dims: &[usize]) -> Result<usize> {
    if dims.is_empty() {
        return Err(Error::invalid_matrix("a matrix needs at least one dimension"));
    }
    dims.iter().try_fold(1usize, |acc, &d| {
        if d == 0 {
            return Err(Error::invalid_matrix("matrix dimensions must be non-zero"));
        }
        acc.checked_mul(d)
            .ok_or_else(|| Error::invalid_matrix("matrix element count overflows"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_bad_dims() {
        assert!(Matrix::new(&[]).is_err());
        assert!(Matrix::new(&[2, 0, 3]).is_err());
        assert!(Matrix::new(&[usize::MAX, 2]).is_err());
        assert_eq!(Matrix::new(&[2, 3]).unwrap().total_size(), 6);
    }

    #[test]
    fn test_row_major_indexing() {
        let mut m = Matrix::new(&[2, 3, 4]).unwrap();
        assert_eq!(m.offset(&[1, 2, 3]), Some(12 + 2 * 4 + 3));
        assert!(m.set(&[1, 0, 2], 7.5));
        assert_eq!(m.data()[14], 7.5);
        assert_eq!(m.get(&[1, 0, 2]), Some(7.5));
    }

    #[test]
    fn test_out_of_range_fails_softly() {
        let mut m = Matrix::new(&[2, 2]).unwrap();
        assert_eq!(m.get(&[2, 0]), None);
        assert_eq!(m.get(&[0]), None);
        assert!(!m.set(&[0, 5], 1.0));
        assert!(m.data().iter().all(|&v| v == 0.0));
        assert_eq!(m.dim(1), Some(2));
        assert_eq!(m.dim(2), None);
    }

    #[test]
    fn test_set_data_truncates() {
        let mut m = Matrix::new(&[3]).unwrap();
        assert_eq!(m.set_data(&[1.0, 2.0, 3.0, 4.0]), 3);
        assert_eq!(m.data(), &[1.0, 2.0, 3.0]);

        assert_eq!(m.set_data(&[9.0]), 1);
        assert_eq!(m.data(), &[9.0, 2.0, 3.0]);
        assert_eq!(m.total_size(), 3);
    }

    #[test]
    fn test_fill_and_from_data() {
        let mut m = Matrix::from_data(&[2], vec![1.0, 2.0]).unwrap();
        m.fill(0.5);
        assert_eq!(m.data(), &[0.5, 0.5]);
        assert!(Matrix::from_data(&[2, 2], vec![1.0]).is_err());
    }
}
