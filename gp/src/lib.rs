//! This library implements the [Laplace approximation](https://gaussianprocess.org/gpml/chapters/RW3.pdf)
//! of the posterior of [Gaussian Process](https://en.wikipedia.org/wiki/Gaussian_process) models
//! with non-gaussian likelihoods (logit and probit classification, robust Student-t regression).
//!
//! Given a kernel model, a mean model and a likelihood model, the inference engine finds the mode of
//! the posterior over latent function values, factorizes the resulting gaussian approximation and
//! evaluates the negative log marginal likelihood `nlZ` along with its derivatives with respect to
//! every hyperparameter, ready to be fed to a hyperparameter optimizer.
//!
//! When the likelihood is not log-concave (Student-t), the negative hessian of the log likelihood
//! may have negative entries at the mode: the approximation then switches from a Cholesky to a
//! LU based factorization.
//!
//! The engine is implemented by [SingleLaplaceInference] parameterized by [LaplaceParams].
//! The mode search is either a Newton method with Brent line search or a first order method
//! (L-BFGS, steepest descent) from [argmin](https://docs.rs/argmin), see [LaplaceMinimizer].
mod algorithm;
mod errors;
mod hyperparameters;
pub mod kernel_models;
pub mod likelihood_models;
mod linalg;
pub mod mean_models;
mod optimization;
mod parameters;
mod utils;

pub use algorithm::*;
pub use errors::*;
pub use hyperparameters::*;
pub use optimization::*;
pub use parameters::*;
