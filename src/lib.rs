//! `gpinfer` computes Laplace approximations of gaussian process posteriors with non-gaussian
//! likelihoods: posterior mode, factorization, negative log marginal likelihood and its
//! derivatives wrt the model hyperparameters.
//!
//! This crate re-exports the [`gpinfer_gp`] crate where the inference engine is implemented:
//!
//! ```no_run
//! use gpinfer::gp::{
//!     kernel_models::Matern32Kernel, likelihood_models::StudentsTLikelihood,
//!     mean_models::ConstantMean, SingleLaplaceInference,
//! };
//! use linfa::prelude::*;
//! use ndarray::array;
//!
//! let xt = array![[0.], [1.], [2.], [3.], [4.]];
//! let yt = array![0.1, 0.8, 9.0, 0.2, -0.5];
//! let mut laplace = SingleLaplaceInference::params(
//!     Matern32Kernel::new(array![1.]),
//!     ConstantMean::new(0.),
//!     StudentsTLikelihood::new(0.3, 3.),
//! )
//! .fit(&Dataset::new(xt, yt))
//! .expect("Laplace approximation");
//! println!("nlZ = {}", laplace.negative_log_marginal_likelihood().unwrap());
//! ```
pub use gpinfer_gp as gp;
