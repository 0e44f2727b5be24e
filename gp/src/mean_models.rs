//! A module for mean models giving the prior mean `m` of the latent function
//! at the training inputs.
//!
//! The following models are implemented:
//! * zero,
//! * constant,
//! * linear (affine)

use crate::errors::{GpError, Result};
use crate::hyperparameters::{check_hyperparameter, Hyperparameter};
use linfa::Float;
use ndarray::{Array1, ArrayBase, Data, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Constant value hyperparameter of [`ConstantMean`]
pub const VALUE: Hyperparameter = Hyperparameter::scalar("value");
/// Bias hyperparameter of [`LinearMean`]
pub const BIAS: Hyperparameter = Hyperparameter::scalar("bias");

/// A trait for mean models used in Laplace inference
pub trait MeanModel<F: Float>: Clone + fmt::Display + Sync {
    /// Compute the mean at the given `x` data points specified as (n, nx) matrix.
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F>;

    /// Input dimension expected by the model if any
    fn input_dim(&self) -> Option<usize> {
        None
    }

    /// Hyperparameters of the mean
    fn hyperparameters(&self) -> Vec<Hyperparameter> {
        vec![]
    }

    /// Derivative of the mean at `x` wrt the `index`-th element of `param`
    fn parameter_derivative(
        &self,
        _x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        param: &Hyperparameter,
        _index: usize,
    ) -> Result<Array1<F>> {
        Err(GpError::UnknownHyperparameter(format!(
            "{self} has no derivative wrt {param}"
        )))
    }
}

fn check_index(param: &Hyperparameter, index: usize) -> Result<()> {
    if index < param.n_elements {
        Ok(())
    } else {
        Err(GpError::InvalidValueError(format!(
            "index {index} out of range for hyperparameter {param}"
        )))
    }
}

/// A zero function as mean of the GP
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct ZeroMean();

impl<F: Float> MeanModel<F> for ZeroMean {
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
        Array1::zeros(x.nrows())
    }
}

/// A constant function as mean of the GP
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct ConstantMean<F: Float> {
    /// mean value
    pub value: F,
}

impl<F: Float> Default for ConstantMean<F> {
    fn default() -> Self {
        ConstantMean { value: F::zero() }
    }
}

impl<F: Float> ConstantMean<F> {
    /// Constructor
    pub fn new(value: F) -> Self {
        ConstantMean { value }
    }
}

impl<F: Float> MeanModel<F> for ConstantMean<F> {
    /// m(x) = [c, ..., c].T
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
        Array1::from_elem(x.nrows(), self.value)
    }

    fn hyperparameters(&self) -> Vec<Hyperparameter> {
        vec![VALUE]
    }

    fn parameter_derivative(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        param: &Hyperparameter,
        index: usize,
    ) -> Result<Array1<F>> {
        check_hyperparameter(&self.to_string(), param, &[VALUE])?;
        check_index(param, index)?;
        Ok(Array1::ones(x.nrows()))
    }
}

/// An affine function as mean of the GP
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct LinearMean<F: Float> {
    /// intercept
    pub bias: F,
    /// slopes, one per input dimension
    pub weights: Array1<F>,
}

impl<F: Float> LinearMean<F> {
    /// Constructor
    pub fn new(bias: F, weights: Array1<F>) -> Self {
        LinearMean { bias, weights }
    }

    /// Handle on the weights hyperparameter
    pub fn weights_hyperparameter(&self) -> Hyperparameter {
        Hyperparameter::vector("weights", self.weights.len())
    }
}

impl<F: Float> MeanModel<F> for LinearMean<F> {
    /// m(x) = b + x.w
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
        x.dot(&self.weights) + self.bias
    }

    fn input_dim(&self) -> Option<usize> {
        Some(self.weights.len())
    }

    fn hyperparameters(&self) -> Vec<Hyperparameter> {
        vec![BIAS, self.weights_hyperparameter()]
    }

    /// dm/db = [1, ..., 1].T and dm/dw_i = x[:, i]
    fn parameter_derivative(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        param: &Hyperparameter,
        index: usize,
    ) -> Result<Array1<F>> {
        check_hyperparameter(&self.to_string(), param, &self.hyperparameters())?;
        check_index(param, index)?;
        if *param == BIAS {
            Ok(Array1::ones(x.nrows()))
        } else {
            Ok(x.column(index).to_owned())
        }
    }
}

impl fmt::Display for ZeroMean {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ZeroMean")
    }
}

impl<F: Float> fmt::Display for ConstantMean<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ConstantMean(value={})", self.value)
    }
}

impl<F: Float> fmt::Display for LinearMean<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "LinearMean(bias={}, weights={})", self.bias, self.weights)
    }
}
