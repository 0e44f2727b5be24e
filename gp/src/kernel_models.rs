//! A module for kernel models giving the (unscaled) prior covariance matrix
//! of the latent function at the training inputs.
//!
//! The following kernel models are implemented:
//! * precomputed (fixed matrix),
//! * squared exponential,
//! * matern 3/2.
//!
//! `theta` hyperparameters are either isotropic (one element) or anisotropic
//! (one element per input dimension).

use crate::errors::{GpError, Result};
use crate::hyperparameters::{check_hyperparameter, Hyperparameter};
use crate::utils::{symmetric_matrix, theta_at};
use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Data, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// A trait for kernel models used in Laplace inference
pub trait KernelModel<F: Float>: Clone + fmt::Display + Sync {
    /// Compute the (n, n) kernel matrix `K(x, x)` for the given `x` data points
    /// specified as (n, nx) matrix.
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F>;

    /// Input dimension expected by the model if any
    fn input_dim(&self) -> Option<usize> {
        None
    }

    /// Hyperparameters of the kernel
    fn hyperparameters(&self) -> Vec<Hyperparameter> {
        vec![]
    }

    /// Compute `dK/dparam[index]` as a (n, n) matrix
    fn parameter_gradient(
        &self,
        _x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        param: &Hyperparameter,
        _index: usize,
    ) -> Result<Array2<F>> {
        Err(GpError::UnknownHyperparameter(format!(
            "{self} has no derivative wrt {param}"
        )))
    }
}

fn theta_hyperparameter<F: Float>(theta: &Array1<F>) -> Hyperparameter {
    Hyperparameter::vector("theta", theta.len())
}

fn check_theta<F: Float>(
    owner: &str,
    theta: &Array1<F>,
    param: &Hyperparameter,
    index: usize,
) -> Result<()> {
    check_hyperparameter(owner, param, &[theta_hyperparameter(theta)])?;
    if index < theta.len() {
        Ok(())
    } else {
        Err(GpError::InvalidValueError(format!(
            "index {index} out of range for hyperparameter {param}"
        )))
    }
}

/// Kernel given as a fixed precomputed matrix, input points are ignored
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct PrecomputedKernel<F: Float> {
    /// kernel matrix
    pub matrix: Array2<F>,
}

impl<F: Float> PrecomputedKernel<F> {
    /// Constructor
    pub fn new(matrix: Array2<F>) -> Self {
        PrecomputedKernel { matrix }
    }
}

impl<F: Float> KernelModel<F> for PrecomputedKernel<F> {
    fn value(&self, _x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        self.matrix.to_owned()
    }
}

/// Squared exponential kernel
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct SquaredExponentialKernel<F: Float> {
    /// inverse squared length scales
    pub theta: Array1<F>,
}

impl<F: Float> SquaredExponentialKernel<F> {
    /// Constructor
    pub fn new(theta: Array1<F>) -> Self {
        SquaredExponentialKernel { theta }
    }

    fn eval(&self, a: ArrayView1<F>, b: ArrayView1<F>) -> F {
        let r = (0..a.len()).fold(F::zero(), |acc, j| {
            let d = a[j] - b[j];
            acc + theta_at(self.theta.view(), j) * d * d
        });
        F::exp(-r)
    }
}

impl<F: Float> KernelModel<F> for SquaredExponentialKernel<F> {
    ///   nx
    /// prod exp( - theta_j * d_j^2 )
    ///  j=1
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        symmetric_matrix(x.view(), |a, b| self.eval(a, b))
    }

    fn input_dim(&self) -> Option<usize> {
        (self.theta.len() > 1).then_some(self.theta.len())
    }

    fn hyperparameters(&self) -> Vec<Hyperparameter> {
        vec![theta_hyperparameter(&self.theta)]
    }

    /// dk/dtheta_l = - d_l^2 * k
    fn parameter_gradient(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        param: &Hyperparameter,
        index: usize,
    ) -> Result<Array2<F>> {
        check_theta(&self.to_string(), &self.theta, param, index)?;
        let isotropic = self.theta.len() == 1;
        Ok(symmetric_matrix(x.view(), |a, b| {
            let d2 = if isotropic {
                (&a - &b).mapv(|v| v * v).sum()
            } else {
                (a[index] - b[index]) * (a[index] - b[index])
            };
            -d2 * self.eval(a, b)
        }))
    }
}

/// Matern 3/2 kernel (product over input dimensions)
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Matern32Kernel<F: Float> {
    /// inverse length scales
    pub theta: Array1<F>,
}

impl<F: Float> Matern32Kernel<F> {
    /// Constructor
    pub fn new(theta: Array1<F>) -> Self {
        Matern32Kernel { theta }
    }

    /// u_j = sqrt(3) * theta_j * |d_j|
    fn factors(&self, a: ArrayView1<F>, b: ArrayView1<F>) -> Array1<F> {
        let sqrt3 = F::cast(3.).sqrt();
        Array1::from_shape_fn(a.len(), |j| {
            sqrt3 * theta_at(self.theta.view(), j) * (a[j] - b[j]).abs()
        })
    }

    fn eval(&self, u: &Array1<F>) -> F {
        u.fold(F::one(), |acc, &v| acc * (F::one() + v) * F::exp(-v))
    }
}

impl<F: Float> KernelModel<F> for Matern32Kernel<F> {
    ///   nx
    /// prod (1 + sqrt(3) * theta_j * |d_j|) exp( - sqrt(3) * theta_j * |d_j| )
    ///  j=1
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        symmetric_matrix(x.view(), |a, b| self.eval(&self.factors(a, b)))
    }

    fn input_dim(&self) -> Option<usize> {
        (self.theta.len() > 1).then_some(self.theta.len())
    }

    fn hyperparameters(&self) -> Vec<Hyperparameter> {
        vec![theta_hyperparameter(&self.theta)]
    }

    /// dk/dtheta_l = - k * u_l / (1 + u_l) * sqrt(3) * |d_l|
    fn parameter_gradient(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        param: &Hyperparameter,
        index: usize,
    ) -> Result<Array2<F>> {
        check_theta(&self.to_string(), &self.theta, param, index)?;
        let sqrt3 = F::cast(3.).sqrt();
        let isotropic = self.theta.len() == 1;
        Ok(symmetric_matrix(x.view(), |a, b| {
            let u = self.factors(a, b);
            let k = self.eval(&u);
            let dims = if isotropic { 0..a.len() } else { index..index + 1 };
            dims.fold(F::zero(), |acc, j| {
                acc - k * u[j] / (F::one() + u[j]) * sqrt3 * (a[j] - b[j]).abs()
            })
        }))
    }
}

impl<F: Float> fmt::Display for PrecomputedKernel<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "PrecomputedKernel({}x{})",
            self.matrix.nrows(),
            self.matrix.ncols()
        )
    }
}

impl<F: Float> fmt::Display for SquaredExponentialKernel<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SquaredExponential(theta={})", self.theta)
    }
}

impl<F: Float> fmt::Display for Matern32Kernel<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Matern32(theta={})", self.theta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};
    use paste::paste;

    #[test]
    fn test_squared_exponential() {
        let xt = array![[4.5], [1.2], [2.0], [3.0], [4.0]];
        let k = SquaredExponentialKernel::new(array![0.1]).value(&xt);
        assert_abs_diff_eq!(0.336552878364737, k[[0, 1]], epsilon = 1e-12);
        assert_abs_diff_eq!(0.9048374180359595, k[[3, 2]], epsilon = 1e-12);
        assert_abs_diff_eq!(Array1::<f64>::ones(5), k.diag(), epsilon = 1e-12);
        assert_abs_diff_eq!(k.t(), k.view(), epsilon = 0.);
    }

    #[test]
    fn test_matern32_2d() {
        let xt = array![[0., 1.], [2., 3.]];
        let k = Matern32Kernel::new(array![1., 0.5]).value(&xt);
        let u1 = 2. * 3f64.sqrt();
        let u2 = 3f64.sqrt();
        let expected = (1. + u1) * (-u1).exp() * (1. + u2) * (-u2).exp();
        assert_abs_diff_eq!(expected, k[[0, 1]], epsilon = 1e-12);
        assert_eq!(Some(2), k_input_dim(&Matern32Kernel::new(array![1., 0.5])));
        assert_eq!(None, k_input_dim(&Matern32Kernel::new(array![1.])));
    }

    fn k_input_dim<K: KernelModel<f64>>(k: &K) -> Option<usize> {
        k.input_dim()
    }

    #[test]
    fn test_precomputed() {
        let m = array![[2., 0.5], [0.5, 1.]];
        let kernel = PrecomputedKernel::new(m.clone());
        assert_eq!(m, kernel.value(&Array2::<f64>::zeros((2, 1))));
        let err = kernel.parameter_gradient(
            &Array2::<f64>::zeros((2, 1)),
            &Hyperparameter::scalar("theta"),
            0,
        );
        assert!(matches!(err, Err(GpError::UnknownHyperparameter(_))));
    }

    macro_rules! test_kernel_gradient {
        ($kernel:ident, $theta:ident) => {
            paste! {
                #[test]
                fn [<test_ $kernel:snake _ $theta _gradient>]() {
                    let x = array![[0.1, -0.4], [0.9, 0.3], [-0.7, 1.2], [0.4, 0.4]];
                    let theta: Array1<f64> = match stringify!($theta) {
                        "iso" => array![0.8],
                        _ => array![0.8, 1.7],
                    };
                    let kernel = [<$kernel Kernel>]::new(theta.clone());
                    let param = kernel.hyperparameters()[0];
                    let e = 1e-6;
                    for i in 0..theta.len() {
                        let mut tp = theta.clone();
                        tp[i] += e;
                        let mut tm = theta.clone();
                        tm[i] -= e;
                        let fdiff = ([<$kernel Kernel>]::new(tp).value(&x)
                            - [<$kernel Kernel>]::new(tm).value(&x))
                            / (2. * e);
                        let grad = kernel.parameter_gradient(&x, &param, i).unwrap();
                        assert_abs_diff_eq!(fdiff, grad, epsilon = 1e-7);
                    }
                    assert!(matches!(
                        kernel.parameter_gradient(&x, &param, theta.len()),
                        Err(GpError::InvalidValueError(_))
                    ));
                }
            }
        };
    }

    test_kernel_gradient!(SquaredExponential, iso);
    test_kernel_gradient!(SquaredExponential, aniso);
    test_kernel_gradient!(Matern32, iso);
    test_kernel_gradient!(Matern32, aniso);
}
