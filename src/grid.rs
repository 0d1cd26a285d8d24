//! Row-major grid type for diagrams and matrices.
//!
//! [`Grid`] carries its dimensions alongside a flat `Vec<f64>` and replaces
//! manual `data[row * ncols + col]` arithmetic. Correlation diagrams and
//! p-value diagrams are indexed `[time-scale][window position]`, so rows are
//! contiguous: a whole time-scale is available as one slice.
//!
//! # Examples
//!
//! ```
//! use xcorr_timescale::grid::Grid;
//!
//! // 2 time-scales, 3 window positions
//! let grid = Grid::from_rows(&[vec![0.1, 0.2, 0.3], vec![0.4, 0.5, 0.6]]).unwrap();
//!
//! assert_eq!(grid[(1, 2)], 0.6);
//! assert_eq!(grid.row(0), &[0.1, 0.2, 0.3]);
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Row-major `nrows x ncols` matrix of `f64`.
///
/// Element `(row, col)` is stored at `row * ncols + col`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Grid {
    data: Vec<f64>,
    nrows: usize,
    ncols: usize,
}

/// Correlation diagram: `[time-scale][window position]`, values in [-1, 1].
pub type CorrelationDiagram = Grid;

/// P-value diagram with the shape of its correlation diagram, values in [0, 1].
pub type PValueDiagram = Grid;

/// Square matrix of onset window widths, one row and column per node.
pub type OnsetMatrix = Grid;

impl Grid {
    /// Create from flat row-major data with dimension validation.
    ///
    /// Returns `None` if `data.len() != nrows * ncols`.
    pub fn from_row_major(data: Vec<f64>, nrows: usize, ncols: usize) -> Option<Self> {
        if data.len() != nrows * ncols {
            return None;
        }
        Some(Self { data, nrows, ncols })
    }

    /// Create from a list of rows.
    ///
    /// Returns `None` if the rows do not all share the same length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let nrows = rows.len();
        let ncols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != ncols) {
            return None;
        }
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Some(Self { data, nrows, ncols })
    }

    /// Create a grid with every element set to `value`.
    pub fn filled(nrows: usize, ncols: usize, value: f64) -> Self {
        Self {
            data: vec![value; nrows * ncols],
            nrows,
            ncols,
        }
    }

    /// Create a zero-filled grid.
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self::filled(nrows, ncols, 0.0)
    }

    /// Create a NaN-filled grid (the output of an invalid node pair).
    pub fn nan(nrows: usize, ncols: usize) -> Self {
        Self::filled(nrows, ncols, f64::NAN)
    }

    /// Number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Dimensions as `(nrows, ncols)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    /// Total number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the grid is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Contiguous row slice (zero-copy).
    ///
    /// # Panics
    /// Panics if `row >= nrows`.
    #[inline]
    pub fn row(&self, row: usize) -> &[f64] {
        let start = row * self.ncols;
        &self.data[start..start + self.ncols]
    }

    /// Iterate over rows as slices.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        // chunks_exact(0) panics; a zero-column grid has no data to chunk
        self.data.chunks_exact(self.ncols.max(1))
    }

    /// Flat slice of the underlying row-major data.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Whether every element is NaN.
    pub fn is_all_nan(&self) -> bool {
        self.data.iter().all(|v| v.is_nan())
    }
}

impl std::ops::Index<(usize, usize)> for Grid {
    type Output = f64;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        debug_assert!(
            row < self.nrows && col < self.ncols,
            "Grid index ({}, {}) out of bounds for {}x{} grid",
            row,
            col,
            self.nrows,
            self.ncols
        );
        &self.data[row * self.ncols + col]
    }
}

impl std::ops::IndexMut<(usize, usize)> for Grid {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        debug_assert!(
            row < self.nrows && col < self.ncols,
            "Grid index ({}, {}) out of bounds for {}x{} grid",
            row,
            col,
            self.nrows,
            self.ncols
        );
        &mut self.data[row * self.ncols + col]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_2x3() -> Grid {
        Grid::from_row_major(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3).unwrap()
    }

    #[test]
    fn test_from_row_major_valid() {
        let grid = sample_2x3();
        assert_eq!(grid.shape(), (2, 3));
        assert_eq!(grid.len(), 6);
        assert!(!grid.is_empty());
        assert_eq!(grid[(0, 0)], 1.0);
        assert_eq!(grid[(1, 0)], 4.0);
        assert_eq!(grid[(1, 2)], 6.0);
    }

    #[test]
    fn test_from_row_major_invalid() {
        assert!(Grid::from_row_major(vec![1.0, 2.0], 2, 3).is_none());
    }

    #[test]
    fn test_from_rows_ragged() {
        assert!(Grid::from_rows(&[vec![1.0, 2.0], vec![3.0]]).is_none());
    }

    #[test]
    fn test_rows() {
        let grid = sample_2x3();
        assert_eq!(grid.row(1), &[4.0, 5.0, 6.0]);
        assert_eq!(grid.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(grid.rows().count(), 2);
    }

    #[test]
    fn test_rows_zero_columns() {
        let grid = Grid::zeros(3, 0);
        assert_eq!(grid.rows().count(), 0);
        assert!(grid.is_empty());
    }

    #[test]
    fn test_index_mut() {
        let mut grid = sample_2x3();
        grid[(0, 1)] = 9.0;
        grid[(1, 2)] = -1.0;
        assert_eq!(grid[(0, 1)], 9.0);
        assert_eq!(grid.row(1), &[4.0, 5.0, -1.0]);
    }

    #[test]
    fn test_nan_grid() {
        let grid = Grid::nan(2, 2);
        assert!(grid.is_all_nan());
        assert!(!sample_2x3().is_all_nan());
        assert_eq!(grid.shape(), Grid::zeros(2, 2).shape());
    }
}
