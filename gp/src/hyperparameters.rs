//! Hyperparameter handles shared by kernel, mean and likelihood models.
//!
//! A [`Hyperparameter`] is an opaque identifier (its name) together with the number
//! of scalar elements it holds. Derivative getters of the inference engine
//! return one value per element.

use crate::errors::{GpError, Result};
use std::fmt;

/// A handle on a model hyperparameter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Hyperparameter {
    /// Name of the hyperparameter, unique within its owning model
    pub name: &'static str,
    /// Number of scalar elements
    pub n_elements: usize,
}

impl Hyperparameter {
    /// Scalar hyperparameter constructor
    pub const fn scalar(name: &'static str) -> Self {
        Hyperparameter {
            name,
            n_elements: 1,
        }
    }

    /// Vector hyperparameter constructor
    pub const fn vector(name: &'static str, n_elements: usize) -> Self {
        Hyperparameter { name, n_elements }
    }
}

impl fmt::Display for Hyperparameter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}[{}]", self.name, self.n_elements)
    }
}

/// Kernel scale hyperparameter owned by the inference method itself:
/// the kernel matrix is scaled by `exp(2 * log_scale)`.
pub const LOG_SCALE: Hyperparameter = Hyperparameter::scalar("log_scale");

/// Check that `param` is one of the `known` handles of `owner`
pub(crate) fn check_hyperparameter(
    owner: &str,
    param: &Hyperparameter,
    known: &[Hyperparameter],
) -> Result<()> {
    if known.iter().any(|p| p == param) {
        Ok(())
    } else {
        Err(GpError::UnknownHyperparameter(format!(
            "{owner} has no hyperparameter {param}, expected one of {:?}",
            known.iter().map(|p| p.to_string()).collect::<Vec<_>>()
        )))
    }
}
