//! Dense factorizations used by the Laplace approximation.
//!
//! Cholesky decomposition and triangular solves come from `linfa-linalg`,
//! failures being reported as [`GpError::FactorizationError`]. The indefinite
//! case needs a general decomposition: `linfa-linalg` has no LU, the full pivoting
//! LU of `faer` is used through an ndarray bridge.

use crate::errors::{GpError, Result};
use crate::utils::to_f64;
use faer::linalg::solvers::{FullPivLu as FaerFullPivLu, Solve};
use faer::{Mat, MatRef};
use linfa::Float;
use linfa_linalg::{cholesky::*, triangular::*};
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};
use std::marker::PhantomData;

/// Upper triangular factor `U` of the symmetric positive definite matrix `a = Ut.U`
pub(crate) fn cholesky_upper<F: Float>(a: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
    let lower = a
        .cholesky()
        .map_err(|e| GpError::FactorizationError(format!("Cholesky decomposition: {e}")))?;
    if lower.diag().iter().any(|v| !v.is_finite() || *v <= F::zero()) {
        return Err(GpError::FactorizationError(
            "Cholesky decomposition: non positive or non finite diagonal".to_string(),
        ));
    }
    Ok(lower.reversed_axes())
}

/// Solve `(Ut.U).x = b` given the upper Cholesky factor `U`
pub(crate) fn cholesky_solve<F: Float>(
    u: &Array2<F>,
    b: &ArrayBase<impl Data<Elem = F>, Ix1>,
) -> Result<Array1<F>> {
    let rhs = b.to_owned().insert_axis(Axis(1));
    let y = u.t().solve_triangular_into(rhs, UPLO::Lower)?;
    let x = u.solve_triangular_into(y, UPLO::Upper)?;
    Ok(x.remove_axis(Axis(1)))
}

/// Solve `Ut.X = B` given the upper triangular `U`
pub(crate) fn solve_upper_transposed<F: Float>(u: &Array2<F>, b: Array2<F>) -> Result<Array2<F>> {
    Ok(u.t().solve_triangular_into(b, UPLO::Lower)?)
}

/// Inverse of the upper triangular `U`
pub(crate) fn upper_inverse<F: Float>(u: &Array2<F>) -> Result<Array2<F>> {
    Ok(u.solve_triangular_into(Array2::eye(u.nrows()), UPLO::Upper)?)
}

/// ndarray to faer (`f64`) copy
fn to_faer<F: Float>(a: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Mat<f64> {
    Mat::from_fn(a.nrows(), a.ncols(), |i, j| to_f64(a[[i, j]]))
}

/// faer to ndarray copy
fn from_faer<F: Float>(mat: MatRef<'_, f64>) -> Array2<F> {
    Array2::from_shape_fn((mat.nrows(), mat.ncols()), |(i, j)| F::cast(mat[(i, j)]))
}

/// LU decomposition with complete pivoting `P.A.Q = L.U` backed by `faer`
pub(crate) struct FullPivLu<F: Float> {
    lu: FaerFullPivLu<f64>,
    n: usize,
    _float: PhantomData<F>,
}

impl<F: Float> FullPivLu<F> {
    /// Factorize the square matrix `a`.
    ///
    /// Fails when a pivot falls under `n * eps * max|a|`, i.e. when `a` is singular
    /// to working precision.
    pub fn new(a: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Self> {
        let n = a.nrows();
        if n != a.ncols() {
            return Err(GpError::InvalidValueError(format!(
                "LU decomposition requires a square matrix, got ({}, {})",
                a.nrows(),
                a.ncols()
            )));
        }
        check_finite("LU decomposition input", a)?;

        let lu = FaerFullPivLu::new(to_faer(a).as_ref());
        // with complete pivoting the first pivot is max|a|
        let u = lu.U();
        let threshold =
            (0..n).fold(0f64, |acc, k| acc.max(u[(k, k)].abs())) * f64::EPSILON * n as f64;
        if let Some(k) = (0..n).find(|&k| u[(k, k)].abs() <= threshold) {
            return Err(GpError::FactorizationError(format!(
                "LU decomposition: matrix is singular to working precision (rank {k} < {n})"
            )));
        }
        Ok(FullPivLu {
            lu,
            n,
            _float: PhantomData,
        })
    }

    /// `ln|det(A)|`
    pub fn log_abs_determinant(&self) -> F {
        let u = self.lu.U();
        F::cast((0..self.n).map(|k| u[(k, k)].abs().ln()).sum::<f64>())
    }

    /// Solve `A.X = B`
    pub fn solve(&self, b: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        let x = self.lu.solve(to_faer(b).as_ref());
        from_faer(x.as_ref())
    }

    /// Inverse of the factorized matrix
    pub fn inverse(&self) -> Array2<F> {
        let x = self.lu.solve(Mat::<f64>::identity(self.n, self.n).as_ref());
        from_faer(x.as_ref())
    }
}

/// Check that every value of the given array is finite
pub(crate) fn check_finite<F: Float, D: ndarray::Dimension>(
    what: &str,
    a: &ArrayBase<impl Data<Elem = F>, D>,
) -> Result<()> {
    if a.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(GpError::FactorizationError(format!(
            "{what} has non finite values"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_full_piv_lu_log_determinant() {
        let a: Array2<f64> = array![[2., 1., 1.], [4., -6., 0.], [-2., 7., 2.]];
        let lu = FullPivLu::new(&a).unwrap();
        assert_abs_diff_eq!(16f64.ln(), lu.log_abs_determinant(), epsilon = 1e-12);

        let a: Array2<f64> = array![[0.5, 0.], [0., -0.25]];
        let lu = FullPivLu::new(&a).unwrap();
        assert_abs_diff_eq!(0.125f64.ln(), lu.log_abs_determinant(), epsilon = 1e-12);
    }

    #[test]
    fn test_full_piv_lu_inverse() {
        let a: Array2<f64> = array![[0., 2., 1.], [1., 0., 3.], [4., -1., 0.5]];
        let lu = FullPivLu::new(&a).unwrap();
        let inv = lu.inverse();
        assert_abs_diff_eq!(Array2::<f64>::eye(3), a.dot(&inv), epsilon = 1e-12);
        assert_abs_diff_eq!(Array2::<f64>::eye(3), inv.dot(&a), epsilon = 1e-12);

        let b: Array2<f64> = array![[1.], [2.], [3.]];
        let x = lu.solve(&b);
        assert_abs_diff_eq!(b, a.dot(&x), epsilon = 1e-12);
    }

    #[test]
    fn test_full_piv_lu_singular() {
        let a: Array2<f64> = array![[1., 2., 3.], [2., 4., 6.], [0., 1., 1.]];
        assert!(matches!(
            FullPivLu::new(&a),
            Err(GpError::FactorizationError(_))
        ));
        let a = array![[1., f64::NAN], [0., 1.]];
        assert!(matches!(
            FullPivLu::new(&a),
            Err(GpError::FactorizationError(_))
        ));
    }

    #[test]
    fn test_cholesky() {
        let a: Array2<f64> = array![[4., 2., 0.6], [2., 5., 1.], [0.6, 1., 3.]];
        let u = cholesky_upper(&a).unwrap();
        assert_abs_diff_eq!(a, u.t().dot(&u), epsilon = 1e-12);
        assert_eq!(0., u[[1, 0]]);

        let b: Array1<f64> = array![1., -2., 0.5];
        let x = cholesky_solve(&u, &b).unwrap();
        assert_abs_diff_eq!(b, a.dot(&x), epsilon = 1e-12);

        let uinv = upper_inverse(&u).unwrap();
        assert_abs_diff_eq!(Array2::<f64>::eye(3), u.dot(&uinv), epsilon = 1e-12);
        let v = solve_upper_transposed(&u, Array2::<f64>::eye(3)).unwrap();
        assert_abs_diff_eq!(uinv.t(), v.view(), epsilon = 1e-12);

        let not_pd: Array2<f64> = array![[1., 2.], [2., 1.]];
        assert!(matches!(
            cholesky_upper(&not_pd),
            Err(GpError::FactorizationError(_))
        ));
    }
}
