//! Averaging and descriptive statistics
//!
//! The composite for a (year, index) batch is the per-cell mean of the
//! reconciled scene arrays, ignoring non-finite cells: a cloud-masked
//! or zero-sum cell in one scene does not poison the composite where
//! other scenes measured it. A cell with no finite observation at all
//! stays NaN.

use ndarray::Array2;
use scenestack_core::{Error, Result};
use serde::Serialize;

/// One row of the statistics table: a scene's index product or the
/// synthetic AVERAGE row.
#[derive(Debug, Clone, Serialize)]
pub struct StatsRecord {
    #[serde(rename = "Filename")]
    pub name: String,
    #[serde(rename = "Min")]
    pub min: f64,
    #[serde(rename = "Max")]
    pub max: f64,
    #[serde(rename = "Mean")]
    pub mean: f64,
    #[serde(rename = "Median")]
    pub median: f64,
}

/// Per-cell mean of a collection of same-shaped arrays, ignoring
/// non-finite values.
///
/// Fails with [`Error::ShapeReconcile`] on empty input or shape
/// disagreement (callers reconcile first).
pub fn average(arrays: &[Array2<f64>]) -> Result<Array2<f64>> {
    let first = arrays
        .first()
        .ok_or_else(|| Error::ShapeReconcile("no arrays to average".to_string()))?;
    let shape = first.dim();

    for array in arrays {
        if array.dim() != shape {
            return Err(Error::ShapeReconcile(format!(
                "cannot average {}x{} with {}x{}",
                shape.0,
                shape.1,
                array.dim().0,
                array.dim().1
            )));
        }
    }

    let mut sum = Array2::<f64>::zeros(shape);
    let mut count = Array2::<f64>::zeros(shape);

    for array in arrays {
        sum.zip_mut_with(array, |s, &v| {
            if v.is_finite() {
                *s += v;
            }
        });
        count.zip_mut_with(array, |c, &v| {
            if v.is_finite() {
                *c += 1.0;
            }
        });
    }

    // 0/0 where nothing was observed leaves the cell NaN.
    sum.zip_mut_with(&count, |s, &c| *s /= c);
    Ok(sum)
}

/// Descriptive statistics of one array, ignoring non-finite values.
///
/// All fields are NaN when the array has no finite cell.
pub fn stats_record(name: impl Into<String>, data: &Array2<f64>) -> StatsRecord {
    let mut values: Vec<f64> = data.iter().copied().filter(|v| v.is_finite()).collect();

    if values.is_empty() {
        return StatsRecord {
            name: name.into(),
            min: f64::NAN,
            max: f64::NAN,
            mean: f64::NAN,
            median: f64::NAN,
        };
    }

    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let count = values.len();
    let min = values[0];
    let max = values[count - 1];
    let mean = values.iter().sum::<f64>() / count as f64;
    let median = if count % 2 == 0 {
        (values[count / 2 - 1] + values[count / 2]) / 2.0
    } else {
        values[count / 2]
    };

    StatsRecord {
        name: name.into(),
        min,
        max,
        mean,
        median,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_average_of_identical_arrays_is_identity() {
        let a = array![[1.0, 2.0], [3.0, 4.0]];
        let result = average(&[a.clone(), a.clone(), a.clone()]).unwrap();
        assert_eq!(result, a);
    }

    #[test]
    fn test_average_of_x_and_neg_x_is_zero() {
        let x = array![[1.5, -2.0], [0.25, 7.0]];
        let result = average(&[x.clone(), -&x]).unwrap();
        for &v in result.iter() {
            assert_relative_eq!(v, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_average_ignores_nan_per_cell() {
        let a = array![[1.0, f64::NAN]];
        let b = array![[3.0, 5.0]];

        let result = average(&[a, b]).unwrap();
        assert_relative_eq!(result[[0, 0]], 2.0, epsilon = 1e-12);
        assert_relative_eq!(result[[0, 1]], 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_all_nan_cell_stays_nan() {
        let a = array![[f64::NAN]];
        let b = array![[f64::NAN]];
        let result = average(&[a, b]).unwrap();
        assert!(result[[0, 0]].is_nan());
    }

    #[test]
    fn test_average_empty_is_error() {
        assert!(average(&[]).is_err());
    }

    #[test]
    fn test_average_shape_disagreement_is_error() {
        let a = Array2::<f64>::zeros((2, 2));
        let b = Array2::<f64>::zeros((2, 3));
        assert!(average(&[a, b]).is_err());
    }

    #[test]
    fn test_stats_record_basic() {
        let data = array![[4.0, 1.0], [3.0, 2.0]];
        let rec = stats_record("scene", &data);

        assert_eq!(rec.name, "scene");
        assert_eq!(rec.min, 1.0);
        assert_eq!(rec.max, 4.0);
        assert_relative_eq!(rec.mean, 2.5, epsilon = 1e-12);
        assert_relative_eq!(rec.median, 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_stats_record_ignores_nan_and_inf() {
        let data = array![[f64::NAN, 1.0, f64::INFINITY, 3.0, 5.0]];
        let rec = stats_record("scene", &data);

        assert_eq!(rec.min, 1.0);
        assert_eq!(rec.max, 5.0);
        assert_relative_eq!(rec.mean, 3.0, epsilon = 1e-12);
        assert_relative_eq!(rec.median, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_stats_record_all_nan() {
        let data = array![[f64::NAN, f64::NAN]];
        let rec = stats_record("empty", &data);
        assert!(rec.min.is_nan() && rec.max.is_nan() && rec.mean.is_nan() && rec.median.is_nan());
    }
}
