use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use num_traits::Float;
use rayon::prelude::*;

/// Proximal operator of the l1 norm: shrink `value` toward zero by
/// `threshold`, with values at exactly the threshold mapping to zero.
pub fn soft_threshold<T: Float>(value: T, threshold: T) -> T {
    value.signum() * (value.abs() - threshold).max(T::zero())
}

/// Proximal operator of the nuclear norm: `u * diag(max(s - threshold, 0)) * vt`.
///
/// The singular values arrive sorted in decreasing order, so the zeroed tail
/// is dropped before the reconstruction matmul.
pub fn singular_value_shrink(
    u: &Array2<f64>,
    singular_values: &Array1<f64>,
    vt: &Array2<f64>,
    threshold: f64,
) -> Array2<f64> {
    let shrunk = singular_values.mapv(|value| (value - threshold).max(0.0));
    let rank = shrunk.iter().take_while(|&&value| value > 0.0).count();

    let mut scaled = u.slice(s![.., ..rank]).to_owned();
    for (mut column, &value) in scaled.columns_mut().into_iter().zip(shrunk.iter()) {
        column *= value;
    }
    scaled.dot(&vt.slice(s![..rank, ..]))
}

// Row partial sums are collected in order and folded sequentially so the
// result does not depend on rayon's scheduling; the norm feeds the solver's
// stopping rule, which must be deterministic.
pub fn frobenius_norm(matrix: &ArrayView2<f64>) -> f64 {
    let row_sums: Vec<f64> = matrix
        .axis_iter(Axis(0))
        .into_par_iter()
        .map(|row| row.iter().map(|&value| value * value).sum::<f64>())
        .collect();
    row_sums.iter().sum::<f64>().sqrt()
}

/// Entrywise infinity norm: the maximum absolute entry.
pub fn infinity_norm(matrix: &ArrayView2<f64>) -> f64 {
    matrix.iter().fold(0.0f64, |acc, &value| acc.max(value.abs()))
}
