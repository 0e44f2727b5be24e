use linfa::Float;
use ndarray::{Array2, ArrayView1, ArrayView2, Zip};

/// Conversion of a float value to `f64` for `libm` special functions
pub(crate) fn to_f64<F: Float>(v: F) -> f64 {
    v.to_f64().unwrap_or(f64::NAN)
}

/// Computes the (n, n) matrix `[k(x_i, x_j)]` given the (n, nx) `x` data points
/// where `k` is a symmetric function.
pub(crate) fn symmetric_matrix<F, K>(x: ArrayView2<F>, k: K) -> Array2<F>
where
    F: Float,
    K: Fn(ArrayView1<F>, ArrayView1<F>) -> F + Sync,
{
    let n = x.nrows();
    let mut res = Array2::zeros((n, n));
    Zip::indexed(&mut res).par_for_each(|(i, j), v| {
        if i <= j {
            *v = k(x.row(i), x.row(j));
        }
    });
    for i in 0..n {
        for j in 0..i {
            res[[i, j]] = res[[j, i]];
        }
    }
    res
}

/// Returns `theta[j]` or `theta[0]` when `theta` is isotropic (single element)
pub(crate) fn theta_at<F: Float>(theta: ArrayView1<F>, j: usize) -> F {
    if theta.len() == 1 {
        theta[0]
    } else {
        theta[j]
    }
}
