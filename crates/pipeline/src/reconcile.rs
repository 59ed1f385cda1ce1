//! Shape reconciliation
//!
//! Scene rasters from the same path/row can differ by a few pixels in
//! extent because sensor footprints drift between acquisitions, so the
//! per-scene index arrays cannot be assumed grid-identical. Before
//! averaging, every array is coerced onto one target shape: the shape
//! with the fewest total elements among the inputs (ties broken by the
//! lexicographically smaller (rows, cols) tuple).
//!
//! Two coercion paths exist and the chosen one is reported per array:
//!
//! - [`ReshapePath::Exact`]: element counts match, so the array is
//!   reinterpreted row-major into the target shape with no data loss.
//! - [`ReshapePath::Resized`]: element counts differ; the row-major
//!   sequence is truncated or cyclically repeated to fill the target.
//!   This is lossy and logged as a warning.

use ndarray::Array2;
use scenestack_core::{Error, Result};
use tracing::warn;

/// Which coercion path [`reconcile`] took for one array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReshapePath {
    /// Element-count-preserving row-major reinterpretation
    Exact,
    /// Lossy truncate-or-repeat resize
    Resized,
}

/// Determine the target shape for a collection of array shapes.
///
/// Fails with [`Error::ShapeReconcile`] on empty input.
pub fn target_shape(shapes: &[(usize, usize)]) -> Result<(usize, usize)> {
    shapes
        .iter()
        .copied()
        .min_by_key(|&(rows, cols)| (rows * cols, rows, cols))
        .ok_or_else(|| Error::ShapeReconcile("no input arrays".to_string()))
}

/// Coerce every array to the common target shape.
///
/// Returns the coerced arrays (input order preserved) and the path
/// taken for each.
pub fn reconcile(arrays: Vec<Array2<f64>>) -> Result<(Vec<Array2<f64>>, Vec<ReshapePath>)> {
    let shapes: Vec<(usize, usize)> = arrays.iter().map(|a| a.dim()).collect();
    let target = target_shape(&shapes)?;

    let mut out = Vec::with_capacity(arrays.len());
    let mut paths = Vec::with_capacity(arrays.len());

    for array in arrays {
        let (coerced, path) = coerce(array, target)?;
        out.push(coerced);
        paths.push(path);
    }

    Ok((out, paths))
}

fn coerce(array: Array2<f64>, target: (usize, usize)) -> Result<(Array2<f64>, ReshapePath)> {
    let shape = array.dim();
    if shape == target {
        return Ok((array, ReshapePath::Exact));
    }

    let target_len = target.0 * target.1;
    let flat: Vec<f64> = array.iter().copied().collect();

    if flat.len() == target_len {
        let reshaped = Array2::from_shape_vec(target, flat)
            .map_err(|e| Error::ShapeReconcile(e.to_string()))?;
        return Ok((reshaped, ReshapePath::Exact));
    }

    warn!(
        from_rows = shape.0,
        from_cols = shape.1,
        to_rows = target.0,
        to_cols = target.1,
        "element counts differ, resizing lossily"
    );

    let resized: Vec<f64> = flat.iter().copied().cycle().take(target_len).collect();
    let resized = Array2::from_shape_vec(target, resized)
        .map_err(|e| Error::ShapeReconcile(e.to_string()))?;
    Ok((resized, ReshapePath::Resized))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_single_input_unchanged() {
        let a = array![[1.0, 2.0], [3.0, 4.0]];
        let (out, paths) = reconcile(vec![a.clone()]).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0], a);
        assert_eq!(paths, vec![ReshapePath::Exact]);
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(matches!(
            reconcile(vec![]),
            Err(Error::ShapeReconcile(_))
        ));
    }

    #[test]
    fn test_target_is_fewest_elements() {
        let shapes = [(10, 10), (9, 9), (10, 9)];
        assert_eq!(target_shape(&shapes).unwrap(), (9, 9));
    }

    #[test]
    fn test_target_tie_breaks_lexicographically() {
        let shapes = [(4, 6), (6, 4)];
        assert_eq!(target_shape(&shapes).unwrap(), (4, 6));
    }

    #[test]
    fn test_equal_count_reshape_loses_nothing() {
        // 2x6 and 3x4 have equal element counts; both coerce exactly
        // and a round trip recovers the original values in order.
        let a = Array2::from_shape_vec((2, 6), (0..12).map(f64::from).collect()).unwrap();
        let b = Array2::from_shape_vec((3, 4), (100..112).map(f64::from).collect()).unwrap();

        let (out, paths) = reconcile(vec![a.clone(), b.clone()]).unwrap();

        // Equal counts tie; (2, 6) is the lexicographically smaller shape.
        assert!(paths.iter().all(|p| *p == ReshapePath::Exact));
        assert_eq!(out[0].dim(), (2, 6));
        assert_eq!(out[1].dim(), (2, 6));

        let back: Vec<f64> = out[0].iter().copied().collect();
        let orig: Vec<f64> = a.iter().copied().collect();
        assert_eq!(back, orig);

        let back_b: Vec<f64> = out[1].iter().copied().collect();
        let orig_b: Vec<f64> = b.iter().copied().collect();
        assert_eq!(back_b, orig_b);
    }

    #[test]
    fn test_resize_truncates_larger_array() {
        let small = Array2::from_elem((2, 2), 1.0);
        let large = Array2::from_shape_vec((3, 3), (0..9).map(f64::from).collect()).unwrap();

        let (out, paths) = reconcile(vec![small, large]).unwrap();

        assert_eq!(paths, vec![ReshapePath::Exact, ReshapePath::Resized]);
        assert_eq!(out[1].dim(), (2, 2));
        // First four row-major elements survive
        assert_eq!(out[1][[0, 0]], 0.0);
        assert_eq!(out[1][[1, 1]], 3.0);
    }

    #[test]
    fn test_reconcile_targets_smallest_input() {
        let tiny = array![[7.0, 8.0]];
        let big = Array2::from_elem((2, 3), 0.0);

        let (out, paths) = reconcile(vec![big, tiny.clone()]).unwrap();

        assert_eq!(paths, vec![ReshapePath::Resized, ReshapePath::Exact]);
        assert_eq!(out[0].dim(), (1, 2));
        assert_eq!(out[1], tiny);
    }

    #[test]
    fn test_coerce_repeats_cyclically_when_growing() {
        let tiny = array![[7.0, 8.0]];

        let (grown, path) = coerce(tiny, (2, 3)).unwrap();

        assert_eq!(path, ReshapePath::Resized);
        assert_eq!(grown.dim(), (2, 3));
        // 7 8 7 8 7 8, cyclic fill
        assert_eq!(grown[[0, 2]], 7.0);
        assert_eq!(grown[[1, 0]], 8.0);
    }
}
