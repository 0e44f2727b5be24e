use crate::errors::{GpError, Result};
use crate::hyperparameters::{check_hyperparameter, Hyperparameter, LOG_SCALE};
use crate::kernel_models::KernelModel;
use crate::likelihood_models::{DerivativeOrder, LikelihoodModel};
use crate::linalg::{
    check_finite, cholesky_upper, solve_upper_transposed, upper_inverse, FullPivLu,
};
use crate::mean_models::MeanModel;
use crate::optimization::{LaplaceMinimizer, LaplaceProblem, Minimizer, ModeEstimate};
use crate::parameters::{LaplaceParams, LaplaceValidParams};

use linfa::prelude::{DatasetBase, Fit, Float};
use log::{debug, info};
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};
use std::fmt;
use std::time::Instant;

/// Factorization of the Laplace approximation around the posterior mode
///
/// The variant depends on the sign of the negative hessian `W = -d2lp` of the log
/// likelihood at the mode.
#[derive(Clone, Debug, PartialEq)]
pub enum PosteriorFactor<F: Float> {
    /// When `W >= 0`: upper Cholesky factor `l` of `I + sW.K.sW`
    Cholesky {
        /// upper triangular factor
        l: Array2<F>,
    },
    /// When some `W < 0`: `l = -diag(W).(I + K.diag(W))^-1`
    Indefinite {
        /// dense factor
        l: Array2<F>,
        /// `(I + K.diag(W))^-1`
        ia: Array2<F>,
        /// `log(|det(I + K.diag(W))|)`
        log_det: F,
    },
}

impl<F: Float> PosteriorFactor<F> {
    /// Posterior factor matrix
    pub fn matrix(&self) -> &Array2<F> {
        match self {
            PosteriorFactor::Cholesky { l } => l,
            PosteriorFactor::Indefinite { l, .. } => l,
        }
    }

    /// `log(|I + K.W|) / 2`
    fn half_log_det(&self) -> F {
        match self {
            PosteriorFactor::Cholesky { l } => l.diag().mapv(|v| v.ln()).sum(),
            PosteriorFactor::Indefinite { log_det, .. } => *log_det / F::cast(2.),
        }
    }
}

/// Quantities computed at the posterior mode
#[derive(Clone, Debug)]
struct Posterior<F: Float> {
    /// scaled kernel matrix
    ks: Array2<F>,
    dlp: Array1<F>,
    d3lp: Array1<F>,
    /// signed square root of `W`
    sw: Array1<F>,
    factor: PosteriorFactor<F>,
}

/// Snapshot of one update: mode, factorization and marginal likelihood
#[derive(Clone, Debug)]
struct LaplaceState<F: Float> {
    /// unscaled kernel matrix
    kernel: Array2<F>,
    mean: Array1<F>,
    mode: ModeEstimate<F>,
    posterior: Posterior<F>,
    nlz: F,
}

/// Intermediates shared by the marginal likelihood derivatives
#[derive(Clone, Debug)]
struct GradientTerms<F: Float> {
    z: Array2<F>,
    /// half of the posterior covariance diagonal
    g: Array1<F>,
    dfhat: Array1<F>,
}

/// Laplace approximation inference for single output GP models
///
/// The posterior over the latent function values `f` given labels `y`
/// is approximated by a gaussian centered on its mode. The engine computes:
/// * the mode of `p(f|y)` ([`SingleLaplaceInference::latent_mode`]),
/// * the factorization of the approximation ([`SingleLaplaceInference::posterior_factor`]),
/// * the negative log marginal likelihood `nlZ`,
/// * the derivatives of `nlZ` wrt the kernel scale, kernel, mean and likelihood hyperparameters.
///
/// Results are computed once per update and cached. Changing any model, the labels,
/// the kernel scale or the minimizer through the engine accessors invalidates the cache,
/// the next getter call triggers a new update warm started from the last `alpha`.
///
/// # Example
///
/// ```no_run
/// use gpinfer_gp::{
///     kernel_models::SquaredExponentialKernel, likelihood_models::LogitLikelihood,
///     mean_models::ZeroMean, SingleLaplaceInference, LOG_SCALE,
/// };
/// use linfa::prelude::*;
/// use ndarray::array;
///
/// let xt = array![[-1.5], [-0.5], [0.2], [1.0], [1.8]];
/// let yt = array![-1., -1., 1., 1., 1.];
///
/// let mut laplace = SingleLaplaceInference::params(
///     SquaredExponentialKernel::new(array![0.5]),
///     ZeroMean(),
///     LogitLikelihood(),
/// )
/// .fit(&Dataset::new(xt, yt))
/// .expect("Laplace approximation");
///
/// let nlz = laplace.negative_log_marginal_likelihood().unwrap();
/// let dnlz = laplace.derivative_wrt_inference_method(&LOG_SCALE).unwrap();
/// ```
///
/// # Reference
///
/// Rasmussen C. E., Williams C. K. I., Gaussian Processes for Machine Learning, MIT Press, 2006.
///
/// Vanhatalo J., Jylanki P., Vehtari A., Gaussian process regression with Student-t likelihood,
/// Advances in Neural Information Processing Systems 22, 2009.
#[derive(Clone, Debug)]
pub struct SingleLaplaceInference<F, K, M, L>
where
    F: Float,
    K: KernelModel<F>,
    M: MeanModel<F>,
    L: LikelihoodModel<F>,
{
    params: LaplaceValidParams<F, K, M, L>,
    /// Training inputs
    x: Array2<F>,
    /// Training labels
    y: Array1<F>,
    /// Last computed dual vector, used as warm start
    alpha: Array1<F>,
    state: Option<LaplaceState<F>>,
    gradients: Option<GradientTerms<F>>,
}

impl<F, K, M, L> fmt::Display for SingleLaplaceInference<F, K, M, L>
where
    F: Float,
    K: KernelModel<F>,
    M: MeanModel<F>,
    L: LikelihoodModel<F>,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "SingleLaplaceInference(kernel={}, mean={}, likelihood={}, log_scale={}, minimizer={})",
            self.params.kernel,
            self.params.mean,
            self.params.likelihood,
            self.params.log_scale,
            self.params.minimizer
        )
    }
}

fn check_training_data<F, K, M, L>(
    params: &LaplaceValidParams<F, K, M, L>,
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix1>,
) -> Result<()>
where
    F: Float,
    K: KernelModel<F>,
    M: MeanModel<F>,
    L: LikelihoodModel<F>,
{
    if x.nrows() != y.len() {
        return Err(GpError::InvalidValueError(format!(
            "Number of labels ({}) should match the number of training inputs ({})",
            y.len(),
            x.nrows()
        )));
    }
    if y.is_empty() {
        return Err(GpError::InvalidValueError(
            "Training data should not be empty".to_string(),
        ));
    }
    for (model, dim) in [
        (params.kernel.to_string(), params.kernel.input_dim()),
        (params.mean.to_string(), params.mean.input_dim()),
    ] {
        if let Some(d) = dim {
            if d != x.ncols() {
                return Err(GpError::InvalidValueError(format!(
                    "{model} expects inputs of dimension {d}, got {}",
                    x.ncols()
                )));
            }
        }
    }
    params.likelihood.check_labels(y)
}

impl<F, K, M, L> SingleLaplaceInference<F, K, M, L>
where
    F: Float,
    K: KernelModel<F>,
    M: MeanModel<F>,
    L: LikelihoodModel<F>,
{
    /// Laplace inference parameters constructor
    pub fn params(kernel: K, mean: M, likelihood: L) -> LaplaceParams<F, K, M, L> {
        LaplaceParams::new(kernel, mean, likelihood)
    }

    /// Kernel model
    pub fn kernel(&self) -> &K {
        &self.params.kernel
    }

    /// Mean model
    pub fn mean(&self) -> &M {
        &self.params.mean
    }

    /// Likelihood model
    pub fn likelihood(&self) -> &L {
        &self.params.likelihood
    }

    /// Logarithm of the kernel scale
    pub fn log_scale(&self) -> F {
        self.params.log_scale
    }

    /// Kernel scale `exp(2 * log_scale)`
    pub fn scale(&self) -> F {
        (F::cast(2.) * self.params.log_scale).exp()
    }

    /// Minimizer used for the mode search
    pub fn minimizer(&self) -> &LaplaceMinimizer {
        &self.params.minimizer
    }

    /// Training inputs
    pub fn inputs(&self) -> &Array2<F> {
        &self.x
    }

    /// Training labels
    pub fn labels(&self) -> &Array1<F> {
        &self.y
    }

    /// Whether the cached approximation matches the current configuration
    pub fn is_up_to_date(&self) -> bool {
        self.state.is_some()
    }

    fn invalidate(&mut self) {
        self.state = None;
        self.gradients = None;
    }

    /// Set the logarithm of the kernel scale
    pub fn set_log_scale(&mut self, log_scale: F) -> Result<()> {
        if !log_scale.is_finite() {
            return Err(GpError::InvalidValueError(format!(
                "`log_scale` should be finite, got {log_scale}"
            )));
        }
        self.params.log_scale = log_scale;
        self.invalidate();
        Ok(())
    }

    /// Mutable access to the kernel model
    pub fn kernel_mut(&mut self) -> &mut K {
        self.invalidate();
        &mut self.params.kernel
    }

    /// Mutable access to the mean model
    pub fn mean_mut(&mut self) -> &mut M {
        self.invalidate();
        &mut self.params.mean
    }

    /// Mutable access to the likelihood model
    pub fn likelihood_mut(&mut self) -> &mut L {
        self.invalidate();
        &mut self.params.likelihood
    }

    /// Set labels, training inputs are unchanged
    pub fn set_labels(&mut self, y: Array1<F>) -> Result<()> {
        check_training_data(&self.params, &self.x, &y)?;
        self.y = y;
        self.invalidate();
        Ok(())
    }

    /// Set training inputs and labels
    pub fn set_training_data(&mut self, x: Array2<F>, y: Array1<F>) -> Result<()> {
        check_training_data(&self.params, &x, &y)?;
        self.x = x;
        self.y = y;
        self.invalidate();
        Ok(())
    }

    /// Set the minimizer used for the mode search
    pub fn set_minimizer(&mut self, minimizer: LaplaceMinimizer) -> Result<()> {
        Minimizer::<F>::check(&minimizer)?;
        self.params.minimizer = minimizer;
        self.invalidate();
        Ok(())
    }

    /// Find the posterior mode and compute the Laplace approximation around it.
    ///
    /// Getters call it when the cached approximation is out of date.
    pub fn update(&mut self) -> Result<()> {
        let now = Instant::now();
        self.params.check_consistency()?;
        check_training_data(&self.params, &self.x, &self.y)?;
        let n = self.y.len();
        let kernel = self.params.kernel.value(&self.x);
        if kernel.dim() != (n, n) {
            return Err(GpError::InvalidValueError(format!(
                "Kernel matrix of shape {:?} does not match the number of labels ({n})",
                kernel.dim()
            )));
        }
        let mean = self.params.mean.value(&self.x);
        if mean.len() != n {
            return Err(GpError::InvalidValueError(format!(
                "Mean vector of length {} does not match the number of labels ({n})",
                mean.len()
            )));
        }

        let (mode, posterior) = {
            let problem = LaplaceProblem {
                kernel: kernel.view(),
                mean: mean.view(),
                labels: self.y.view(),
                likelihood: &self.params.likelihood,
                scale: self.scale(),
            };
            let start = self.update_init(&problem);
            let mode = self.params.minimizer.minimize(&problem, start)?;
            let posterior = Self::update_chol(&problem, &mode)?;
            (mode, posterior)
        };

        let nlz = mode.psi + posterior.factor.half_log_det();
        if !nlz.is_finite() {
            return Err(GpError::FactorizationError(format!(
                "negative log marginal likelihood is not finite ({nlz})"
            )));
        }
        info!(
            "Laplace update (n={n}, {}): psi={}, nlZ={}",
            match posterior.factor {
                PosteriorFactor::Cholesky { .. } => "cholesky",
                PosteriorFactor::Indefinite { .. } => "indefinite",
            },
            mode.psi,
            nlz
        );
        debug!("elapsed update = {:?}", now.elapsed().as_millis());

        self.alpha = mode.alpha.to_owned();
        self.state = Some(LaplaceState {
            kernel,
            mean,
            mode,
            posterior,
            nlz,
        });
        self.gradients = None;
        Ok(())
    }

    /// Starting point of the mode search: the stored `alpha` if it is better than
    /// `alpha = 0`, or `alpha = 0` when sizes do not match.
    fn update_init(&self, problem: &LaplaceProblem<F, L>) -> ModeEstimate<F> {
        let default = problem.estimate(Array1::zeros(problem.len()));
        if self.alpha.len() != problem.len() {
            return default;
        }
        let warm = problem.estimate(self.alpha.to_owned());
        if default.psi < warm.psi {
            debug!("Laplace warm start discarded: psi(0)={} < {}", default.psi, warm.psi);
            default
        } else {
            warm
        }
    }

    fn update_chol(
        problem: &LaplaceProblem<F, L>,
        mode: &ModeEstimate<F>,
    ) -> Result<Posterior<F>> {
        let lik = problem.likelihood;
        let y = &problem.labels;
        let ks = problem.scaled_kernel();
        let dlp = lik.log_probability_derivative(y, &mode.f, DerivativeOrder::First);
        let w = -lik.log_probability_derivative(y, &mode.f, DerivativeOrder::Second);
        let d3lp = lik.log_probability_derivative(y, &mode.f, DerivativeOrder::Third);
        let two = F::cast(2.);

        let (sw, factor) = if w.iter().all(|v| *v >= F::zero()) {
            let sw = w.mapv(|v| v.sqrt());
            let mut a = &ks * &sw.view().insert_axis(Axis(1)) * &sw;
            a.diag_mut().mapv_inplace(|v| v + F::one());
            let l = cholesky_upper(&a)?;
            (sw, PosteriorFactor::Cholesky { l })
        } else {
            let sw = w.mapv(|v| ((v.abs() + v) / two).sqrt() - ((v.abs() - v) / two).sqrt());
            let mut a = &ks * &w;
            a.diag_mut().mapv_inplace(|v| v + F::one());
            let lu = FullPivLu::new(&a)?;
            let ia = lu.inverse();
            check_finite("(I + K.W)^-1", &ia)?;
            let l = -(&ia * &w.view().insert_axis(Axis(1)));
            let log_det = lu.log_abs_determinant();
            (sw, PosteriorFactor::Indefinite { l, ia, log_det })
        };
        check_finite("posterior factor", factor.matrix())?;

        Ok(Posterior {
            ks,
            dlp,
            d3lp,
            sw,
            factor,
        })
    }

    fn gradient_terms(state: &LaplaceState<F>) -> Result<GradientTerms<F>> {
        let post = &state.posterior;
        let two = F::cast(2.);
        let (z, g) = match &post.factor {
            PosteriorFactor::Cholesky { l } => {
                let sw_col = post.sw.view().insert_axis(Axis(1));
                let linv = upper_inverse(l)?;
                let z = linv.dot(&linv.t()) * &sw_col * &post.sw;
                let c = solve_upper_transposed(l, &post.ks * &sw_col)?;
                let g = (post.ks.diag().to_owned() - c.mapv(|v| v * v).sum_axis(Axis(0))) / two;
                (z, g)
            }
            PosteriorFactor::Indefinite { l, ia, .. } => {
                let g = (ia * &post.ks).sum_axis(Axis(1)) / two;
                (l.mapv(|v| -v), g)
            }
        };
        let dfhat = &g * &post.d3lp;
        Ok(GradientTerms { z, g, dfhat })
    }

    /// Run the update if needed, computing the derivative intermediates if `gradients` is set
    fn refresh(&mut self, gradients: bool) -> Result<()> {
        if self.state.is_none() {
            self.update()?;
        }
        if gradients && self.gradients.is_none() {
            let terms = Self::gradient_terms(self.cached()?)?;
            self.gradients = Some(terms);
        }
        Ok(())
    }

    fn cached(&self) -> Result<&LaplaceState<F>> {
        self.state.as_ref().ok_or_else(|| {
            GpError::InvalidValueError("Laplace approximation is not computed".to_string())
        })
    }

    fn cached_gradients(&self) -> Result<(&LaplaceState<F>, &GradientTerms<F>)> {
        let terms = self.gradients.as_ref().ok_or_else(|| {
            GpError::InvalidValueError("Laplace gradient terms are not computed".to_string())
        })?;
        Ok((self.cached()?, terms))
    }

    /// `dfhat.(b - K.scale.Z.b)`, the part of the derivative due to the mode shift
    fn implicit_term(state: &LaplaceState<F>, terms: &GradientTerms<F>, b: &Array1<F>) -> F {
        let kzb = state.posterior.ks.dot(&terms.z.dot(b));
        terms.dfhat.dot(&(b - &kzb))
    }

    /// Negative log marginal likelihood
    ///
    /// `nlZ = alpha.(f - m) / 2 - sum(log(p(y|f))) + log(|I + K.W|) / 2`
    pub fn negative_log_marginal_likelihood(&mut self) -> Result<F> {
        self.refresh(false)?;
        Ok(self.cached()?.nlz)
    }

    /// Posterior mean of the latent function values relative to the prior mean: `f - m`
    pub fn posterior_mean(&mut self) -> Result<Array1<F>> {
        self.refresh(false)?;
        let state = self.cached()?;
        Ok(&state.mode.f - &state.mean)
    }

    /// Mode of the posterior over latent function values `f = K.scale.alpha + m`
    pub fn latent_mode(&mut self) -> Result<Array1<F>> {
        self.refresh(false)?;
        Ok(self.cached()?.mode.f.to_owned())
    }

    /// Dual vector `alpha` at the mode
    pub fn alpha(&mut self) -> Result<Array1<F>> {
        self.refresh(false)?;
        Ok(self.cached()?.mode.alpha.to_owned())
    }

    /// Objective value at the mode
    pub fn psi(&mut self) -> Result<F> {
        self.refresh(false)?;
        Ok(self.cached()?.mode.psi)
    }

    /// Signed square root of `W = -d2lp` at the mode
    pub fn diagonal_vector(&mut self) -> Result<Array1<F>> {
        self.refresh(false)?;
        Ok(self.cached()?.posterior.sw.to_owned())
    }

    /// Factorization of the approximation at the mode
    pub fn posterior_factor(&mut self) -> Result<&PosteriorFactor<F>> {
        self.refresh(false)?;
        Ok(&self.cached()?.posterior.factor)
    }

    /// Covariance of the gaussian approximation `(K^-1 + W)^-1`
    pub fn posterior_covariance(&mut self) -> Result<Array2<F>> {
        self.refresh(false)?;
        let post = &self.cached()?.posterior;
        match &post.factor {
            PosteriorFactor::Cholesky { l } => {
                let v = solve_upper_transposed(l, &post.ks * &post.sw.view().insert_axis(Axis(1)))?;
                Ok(&post.ks - &v.t().dot(&v))
            }
            PosteriorFactor::Indefinite { l, .. } => Ok(&post.ks + &post.ks.dot(&l.dot(&post.ks))),
        }
    }

    /// Derivative of `nlZ` wrt the inference method hyperparameter `log_scale`
    pub fn derivative_wrt_inference_method(&mut self, param: &Hyperparameter) -> Result<Array1<F>> {
        check_hyperparameter("SingleLaplaceInference", param, &[LOG_SCALE])?;
        self.refresh(true)?;
        let scale = self.scale();
        let (state, terms) = self.cached_gradients()?;
        let two = F::cast(2.);
        let k = &state.kernel;
        let alpha = &state.mode.alpha;

        let explicit = (&terms.z * k).sum() / two - alpha.dot(&k.dot(alpha)) / two;
        let b = k.dot(&state.posterior.dlp);
        let implicit = Self::implicit_term(state, terms, &b);
        Ok(Array1::from_elem(1, (explicit - implicit) * two * scale))
    }

    /// Derivatives of `nlZ` wrt the elements of the given kernel hyperparameter
    pub fn derivative_wrt_kernel(&mut self, param: &Hyperparameter) -> Result<Array1<F>> {
        check_hyperparameter(
            &self.params.kernel.to_string(),
            param,
            &self.params.kernel.hyperparameters(),
        )?;
        self.refresh(true)?;
        let scale = self.scale();
        let (state, terms) = self.cached_gradients()?;
        let two = F::cast(2.);
        let alpha = &state.mode.alpha;

        (0..param.n_elements)
            .map(|i| {
                let dk = self.params.kernel.parameter_gradient(&self.x, param, i)?;
                let explicit = (&terms.z * &dk).sum() / two - alpha.dot(&dk.dot(alpha)) / two;
                let b = dk.dot(&state.posterior.dlp);
                let implicit = Self::implicit_term(state, terms, &b);
                Ok((explicit - implicit) * scale)
            })
            .collect::<Result<Vec<F>>>()
            .map(Array1::from)
    }

    /// Derivatives of `nlZ` wrt the elements of the given mean hyperparameter
    pub fn derivative_wrt_mean(&mut self, param: &Hyperparameter) -> Result<Array1<F>> {
        check_hyperparameter(
            &self.params.mean.to_string(),
            param,
            &self.params.mean.hyperparameters(),
        )?;
        self.refresh(true)?;
        let (state, terms) = self.cached_gradients()?;

        (0..param.n_elements)
            .map(|i| {
                let dm = self.params.mean.parameter_derivative(&self.x, param, i)?;
                let implicit = Self::implicit_term(state, terms, &dm);
                Ok(-state.mode.alpha.dot(&dm) - implicit)
            })
            .collect::<Result<Vec<F>>>()
            .map(Array1::from)
    }

    /// Derivative of `nlZ` wrt the given (scalar) likelihood hyperparameter
    pub fn derivative_wrt_likelihood_model(
        &mut self,
        param: &Hyperparameter,
    ) -> Result<Array1<F>> {
        let lik = &self.params.likelihood;
        check_hyperparameter(&lik.to_string(), param, &lik.hyperparameters())?;
        if param.n_elements != 1 {
            return Err(GpError::InvalidValueError(format!(
                "Likelihood hyperparameter {param} should be scalar"
            )));
        }
        self.refresh(true)?;
        let (state, terms) = self.cached_gradients()?;
        let lik = &self.params.likelihood;
        let f = &state.mode.f;

        let lp_dhyp = lik.first_derivative(&self.y, f, param)?;
        let dlp_dhyp = lik.second_derivative(&self.y, f, param)?;
        let d2lp_dhyp = lik.third_derivative(&self.y, f, param)?;

        let explicit = -terms.g.dot(&d2lp_dhyp) - lp_dhyp.sum();
        let b = state.posterior.ks.dot(&dlp_dhyp);
        let implicit = Self::implicit_term(state, terms, &b);
        Ok(Array1::from_elem(1, explicit - implicit))
    }
}

impl<F, K, M, L, D> Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>, GpError>
    for LaplaceValidParams<F, K, M, L>
where
    F: Float,
    K: KernelModel<F>,
    M: MeanModel<F>,
    L: LikelihoodModel<F>,
    D: Data<Elem = F>,
{
    type Object = SingleLaplaceInference<F, K, M, L>;

    /// Compute the Laplace approximation of the posterior given training inputs and labels
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>>,
    ) -> Result<Self::Object> {
        let x = dataset.records();
        let y = dataset.targets();
        check_training_data(self, x, y)?;

        let mut laplace = SingleLaplaceInference {
            params: self.clone(),
            x: x.to_owned(),
            y: y.to_owned(),
            alpha: Array1::zeros(y.len()),
            state: None,
            gradients: None,
        };
        laplace.update()?;
        Ok(laplace)
    }
}
