use crate::errors::{GpError, Result};
use crate::kernel_models::KernelModel;
use crate::likelihood_models::LikelihoodModel;
use crate::mean_models::MeanModel;
use crate::optimization::{LaplaceMinimizer, Minimizer};
use linfa::{Float, ParamGuard};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// A set of validated Laplace inference parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize, K: Serialize, M: Serialize, L: Serialize",
        deserialize = "F: Deserialize<'de>, K: Deserialize<'de>, M: Deserialize<'de>, L: Deserialize<'de>"
    ))
)]
pub struct LaplaceValidParams<F, K, M, L>
where
    F: Float,
    K: KernelModel<F>,
    M: MeanModel<F>,
    L: LikelihoodModel<F>,
{
    /// Kernel model giving the prior covariance
    pub(crate) kernel: K,
    /// Mean model giving the prior mean
    pub(crate) mean: M,
    /// Likelihood model linking labels to latent values
    pub(crate) likelihood: L,
    /// Logarithm of the kernel scale, the kernel matrix is scaled by `exp(2 * log_scale)`
    pub(crate) log_scale: F,
    /// Minimizer used for the mode search
    pub(crate) minimizer: LaplaceMinimizer,
}

impl<F, K, M, L> LaplaceValidParams<F, K, M, L>
where
    F: Float,
    K: KernelModel<F>,
    M: MeanModel<F>,
    L: LikelihoodModel<F>,
{
    /// Get kernel model
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Get mean model
    pub fn mean(&self) -> &M {
        &self.mean
    }

    /// Get likelihood model
    pub fn likelihood(&self) -> &L {
        &self.likelihood
    }

    /// Get log kernel scale
    pub fn log_scale(&self) -> F {
        self.log_scale
    }

    /// Get minimizer
    pub fn minimizer(&self) -> &LaplaceMinimizer {
        &self.minimizer
    }

    /// Check settings and models consistency, models may have been changed
    /// since the parameters were validated.
    pub(crate) fn check_consistency(&self) -> Result<()> {
        if !self.log_scale.is_finite() {
            return Err(GpError::InvalidValueError(format!(
                "`log_scale` should be finite, got {}",
                self.log_scale
            )));
        }
        if let (Some(kdim), Some(mdim)) = (self.kernel.input_dim(), self.mean.input_dim()) {
            if kdim != mdim {
                return Err(GpError::InvalidValueError(format!(
                    "Kernel {} and mean {} input dimensions differ ({kdim} != {mdim})",
                    self.kernel, self.mean
                )));
            }
        }
        Minimizer::<F>::check(&self.minimizer)
    }
}

#[derive(Clone, Debug)]
/// The set of parameters that can be specified for the fitting of
/// a [SingleLaplaceInference](crate::SingleLaplaceInference) engine.
pub struct LaplaceParams<F, K, M, L>(LaplaceValidParams<F, K, M, L>)
where
    F: Float,
    K: KernelModel<F>,
    M: MeanModel<F>,
    L: LikelihoodModel<F>;

impl<F, K, M, L> LaplaceParams<F, K, M, L>
where
    F: Float,
    K: KernelModel<F>,
    M: MeanModel<F>,
    L: LikelihoodModel<F>,
{
    /// A constructor for Laplace parameters given kernel, mean and likelihood models
    pub fn new(kernel: K, mean: M, likelihood: L) -> LaplaceParams<F, K, M, L> {
        Self(LaplaceValidParams {
            kernel,
            mean,
            likelihood,
            log_scale: F::zero(),
            minimizer: LaplaceMinimizer::default(),
        })
    }

    /// A constructor for Laplace parameters from validated parameters
    pub fn new_from_valid(params: &LaplaceValidParams<F, K, M, L>) -> Self {
        Self(params.clone())
    }

    /// Set kernel model.
    pub fn kernel(mut self, kernel: K) -> Self {
        self.0.kernel = kernel;
        self
    }

    /// Set mean model.
    pub fn mean(mut self, mean: M) -> Self {
        self.0.mean = mean;
        self
    }

    /// Set likelihood model.
    pub fn likelihood(mut self, likelihood: L) -> Self {
        self.0.likelihood = likelihood;
        self
    }

    /// Set the logarithm of the kernel scale.
    pub fn log_scale(mut self, log_scale: F) -> Self {
        self.0.log_scale = log_scale;
        self
    }

    /// Set the minimizer used to find the posterior mode.
    pub fn minimizer(mut self, minimizer: LaplaceMinimizer) -> Self {
        self.0.minimizer = minimizer;
        self
    }
}

impl<F, K, M, L> From<LaplaceValidParams<F, K, M, L>> for LaplaceParams<F, K, M, L>
where
    F: Float,
    K: KernelModel<F>,
    M: MeanModel<F>,
    L: LikelihoodModel<F>,
{
    fn from(valid: LaplaceValidParams<F, K, M, L>) -> Self {
        LaplaceParams(valid)
    }
}

impl<F, K, M, L> ParamGuard for LaplaceParams<F, K, M, L>
where
    F: Float,
    K: KernelModel<F>,
    M: MeanModel<F>,
    L: LikelihoodModel<F>,
{
    type Checked = LaplaceValidParams<F, K, M, L>;
    type Error = GpError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        self.0.check_consistency()?;
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
