//! Minimizers of the Laplace objective
//!
//! `Psi(alpha) = alpha.(f - m) / 2 - sum(log(p(y|f)))` with `f = K.scale.alpha + m`
//!
//! whose minimizer gives the mode of the posterior over the latent function values.
//!
//! Two [`Minimizer`] implementations are available:
//! * [`NewtonOptimizer`]: Newton iterations with a bounded Brent line search
//!   (Rasmussen & Williams, 2006, algorithm 3.1, with the Vanhatalo et al., 2009
//!   correction for non log-concave likelihoods),
//! * [`FirstOrderOptimizer`]: a gradient-based solver (L-BFGS or steepest descent)
//!   driven through a cost function adapter.

use crate::errors::{GpError, Result};
use crate::likelihood_models::{DerivativeOrder, LikelihoodModel};
use crate::linalg::{cholesky_solve, cholesky_upper};
use crate::utils::to_f64;
use linfa::Float;
use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, ArrayView2, Axis, Data, Ix1};
use ndarray_stats::QuantileExt;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;

/// Read-only view of the engine state needed to evaluate `Psi` and its gradient
pub struct LaplaceProblem<'a, F: Float, L: LikelihoodModel<F>> {
    /// unscaled kernel matrix (n, n)
    pub kernel: ArrayView2<'a, F>,
    /// prior mean (n,)
    pub mean: ArrayView1<'a, F>,
    /// labels (n,)
    pub labels: ArrayView1<'a, F>,
    /// likelihood model
    pub likelihood: &'a L,
    /// kernel scale `exp(2 * log_scale)`
    pub scale: F,
}

impl<'a, F: Float, L: LikelihoodModel<F>> LaplaceProblem<'a, F, L> {
    /// Number of training points
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the training set is empty
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Scaled kernel matrix `K.scale`
    pub fn scaled_kernel(&self) -> Array2<F> {
        self.kernel.mapv(|v| v * self.scale)
    }

    /// Latent function values `f = K.scale.alpha + m`
    pub fn latent(&self, alpha: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Array1<F> {
        self.kernel.dot(alpha) * self.scale + self.mean
    }

    /// Objective value given `alpha` and the corresponding latent values `f`
    pub fn psi_at(
        &self,
        alpha: &ArrayBase<impl Data<Elem = F>, Ix1>,
        f: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> F {
        let lp = self.likelihood.log_probability(&self.labels, f).sum();
        alpha.dot(&(f - &self.mean)) / F::cast(2.) - lp
    }

    /// Objective value at `alpha`
    pub fn psi(&self, alpha: &ArrayBase<impl Data<Elem = F>, Ix1>) -> F {
        let f = self.latent(alpha);
        self.psi_at(alpha, &f)
    }

    /// Gradient of the objective wrt `alpha`: `K.scale.(alpha - dlp(f))`
    pub fn gradient(&self, alpha: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Array1<F> {
        let f = self.latent(alpha);
        let dlp = self
            .likelihood
            .log_probability_derivative(&self.labels, &f, DerivativeOrder::First);
        self.kernel.dot(&(alpha - &dlp)) * self.scale
    }

    /// Estimate built from `alpha`
    pub fn estimate(&self, alpha: Array1<F>) -> ModeEstimate<F> {
        let f = self.latent(&alpha);
        let psi = self.psi_at(&alpha, &f);
        ModeEstimate { alpha, f, psi }
    }
}

/// Current estimate of the posterior mode
#[derive(Clone, Debug, PartialEq)]
pub struct ModeEstimate<F: Float> {
    /// dual vector
    pub alpha: Array1<F>,
    /// latent function values `K.scale.alpha + m`
    pub f: Array1<F>,
    /// objective value
    pub psi: F,
}

/// A capability to minimize the Laplace objective starting from a given estimate
pub trait Minimizer<F: Float> {
    /// Check minimizer settings
    fn check(&self) -> Result<()>;

    /// Minimize `Psi` starting from `start`, never returning a worse estimate than `start`
    fn minimize<L: LikelihoodModel<F>>(
        &self,
        problem: &LaplaceProblem<F, L>,
        start: ModeEstimate<F>,
    ) -> Result<ModeEstimate<F>>;
}

/// Newton minimizer with Brent line search
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct NewtonOptimizer {
    /// maximum number of Newton iterations
    pub max_iter: usize,
    /// convergence tolerance on the decrease of the objective
    pub tolerance: f64,
    /// tolerance of the line search
    pub opt_tolerance: f64,
    /// upper bound of the line search step
    pub opt_max: f64,
}

impl Default for NewtonOptimizer {
    fn default() -> Self {
        NewtonOptimizer {
            max_iter: 20,
            tolerance: 1e-6,
            opt_tolerance: 1e-6,
            opt_max: 10.,
        }
    }
}

impl NewtonOptimizer {
    /// Set the maximum number of Newton iterations
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the convergence tolerance
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the line search tolerance
    pub fn opt_tolerance(mut self, opt_tolerance: f64) -> Self {
        self.opt_tolerance = opt_tolerance;
        self
    }

    /// Set the line search upper bound
    pub fn opt_max(mut self, opt_max: f64) -> Self {
        self.opt_max = opt_max;
        self
    }

    /// One Newton direction `dalpha` from the current estimate
    fn direction<F: Float, L: LikelihoodModel<F>>(
        problem: &LaplaceProblem<F, L>,
        ks: &Array2<F>,
        est: &ModeEstimate<F>,
    ) -> Result<Array1<F>> {
        let dlp = problem.likelihood.log_probability_derivative(
            &problem.labels,
            &est.f,
            DerivativeOrder::First,
        );
        let mut w = -problem.likelihood.log_probability_derivative(
            &problem.labels,
            &est.f,
            DerivativeOrder::Second,
        );
        if matches!(w.min(), Ok(v) if *v < F::zero()) {
            let df = problem
                .likelihood
                .degrees_of_freedom()
                .unwrap_or_else(F::one);
            w.zip_mut_with(&dlp, |wi, &di| *wi += F::cast(2.) / df * di * di);
        }
        let sw = w.mapv(|v| v.max(F::zero()).sqrt());

        let mut a = ks * &sw.view().insert_axis(Axis(1)) * &sw;
        a.diag_mut().mapv_inplace(|v| v + F::one());
        let l = cholesky_upper(&a)?;

        let b = &w * &(&est.f - &problem.mean) + &dlp;
        let v = ks.dot(&b) * &sw;
        Ok(&b - &(cholesky_solve(&l, &v)? * &sw) - &est.alpha)
    }
}

#[cfg(feature = "linesearch")]
mod linesearch {
    use super::*;
    use argmin::core::{CostFunction, Executor, Gradient, State};
    use argmin::solver::brent::BrentOpt;
    use argmin::solver::gradientdescent::SteepestDescent;
    use argmin::solver::linesearch::MoreThuenteLineSearch;
    use argmin::solver::quasinewton::LBFGS;

    /// `x -> Psi(alpha + x.dalpha)`
    pub(super) struct StepCost<'p, 'a, F: Float, L: LikelihoodModel<F>> {
        pub problem: &'p LaplaceProblem<'a, F, L>,
        pub alpha: &'p Array1<F>,
        pub dalpha: &'p Array1<F>,
    }

    impl<'p, 'a, F: Float, L: LikelihoodModel<F>> CostFunction for StepCost<'p, 'a, F, L> {
        type Param = f64;
        type Output = f64;

        fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
            let alpha = self.alpha + &(self.dalpha * F::cast(*x));
            let psi = to_f64(self.problem.psi(&alpha));
            Ok(if psi.is_nan() { f64::INFINITY } else { psi })
        }
    }

    /// Minimize the step cost over `[0, opt_max]`, returns the best step
    pub(super) fn brent<F: Float, L: LikelihoodModel<F>>(
        cost: StepCost<F, L>,
        opt_max: f64,
        opt_tolerance: f64,
    ) -> Result<f64> {
        let solver = BrentOpt::new(0., opt_max).set_tolerance(f64::EPSILON.sqrt(), opt_tolerance);
        let res = Executor::new(cost, solver)
            .configure(|state| state.max_iters(100))
            .run()?;
        Ok(res.state().get_best_param().copied().unwrap_or(0.))
    }

    /// `alpha -> Psi(alpha)` cost function in f64 for argmin solvers
    pub(super) struct PsiCost<'p, 'a, F: Float, L: LikelihoodModel<F>> {
        pub problem: &'p LaplaceProblem<'a, F, L>,
    }

    impl<'p, 'a, F: Float, L: LikelihoodModel<F>> CostFunction for PsiCost<'p, 'a, F, L> {
        type Param = Array1<f64>;
        type Output = f64;

        fn cost(&self, alpha: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
            let psi = to_f64(self.problem.psi(&alpha.mapv(F::cast)));
            Ok(if psi.is_nan() { f64::INFINITY } else { psi })
        }
    }

    impl<'p, 'a, F: Float, L: LikelihoodModel<F>> Gradient for PsiCost<'p, 'a, F, L> {
        type Param = Array1<f64>;
        type Gradient = Array1<f64>;

        fn gradient(
            &self,
            alpha: &Self::Param,
        ) -> std::result::Result<Self::Gradient, argmin::core::Error> {
            Ok(self.problem.gradient(&alpha.mapv(F::cast)).mapv(to_f64))
        }
    }

    pub(super) fn first_order<F: Float, L: LikelihoodModel<F>>(
        optimizer: &FirstOrderOptimizer,
        problem: &LaplaceProblem<F, L>,
        alpha0: &Array1<F>,
    ) -> Result<Option<Array1<F>>> {
        let cost = PsiCost { problem };
        let x0 = alpha0.mapv(to_f64);
        let best = match optimizer.method {
            FirstOrderMethod::Lbfgs { memory } => {
                let solver = LBFGS::new(MoreThuenteLineSearch::new(), memory)
                    .with_tolerance_grad(optimizer.tolerance_grad)?
                    .with_tolerance_cost(optimizer.tolerance_cost)?;
                let res = Executor::new(cost, solver)
                    .configure(|state| state.param(x0).max_iters(optimizer.max_iter))
                    .run()?;
                debug!(
                    "L-BFGS: {} iterations, termination: {:?}",
                    res.state().get_iter(),
                    res.state().get_termination_status()
                );
                res.state().get_best_param().cloned()
            }
            FirstOrderMethod::SteepestDescent => {
                let solver = SteepestDescent::new(MoreThuenteLineSearch::new());
                let res = Executor::new(cost, solver)
                    .configure(|state| state.param(x0).max_iters(optimizer.max_iter))
                    .run()?;
                debug!(
                    "Steepest descent: {} iterations, termination: {:?}",
                    res.state().get_iter(),
                    res.state().get_termination_status()
                );
                res.state().get_best_param().cloned()
            }
        };
        Ok(best.map(|x| x.mapv(F::cast)))
    }
}

impl<F: Float> Minimizer<F> for NewtonOptimizer {
    fn check(&self) -> Result<()> {
        if self.max_iter == 0 {
            return Err(GpError::InvalidValueError(
                "Newton max_iter should be positive".to_string(),
            ));
        }
        if !(self.tolerance >= 0.) || !(self.opt_tolerance > 0.) || !(self.opt_max > 0.) {
            return Err(GpError::InvalidValueError(format!(
                "Newton tolerances and line search bound should be positive, got {self}"
            )));
        }
        Ok(())
    }

    #[cfg(not(feature = "linesearch"))]
    fn minimize<L: LikelihoodModel<F>>(
        &self,
        _problem: &LaplaceProblem<F, L>,
        _start: ModeEstimate<F>,
    ) -> Result<ModeEstimate<F>> {
        Err(GpError::UnsupportedCapability(
            "Newton minimizer requires the `linesearch` feature for Brent line search".to_string(),
        ))
    }

    #[cfg(feature = "linesearch")]
    fn minimize<L: LikelihoodModel<F>>(
        &self,
        problem: &LaplaceProblem<F, L>,
        start: ModeEstimate<F>,
    ) -> Result<ModeEstimate<F>> {
        let ks = problem.scaled_kernel();
        let tolerance = F::cast(self.tolerance);
        let mut est = start;
        let mut psi_old = F::infinity();
        let mut iter = 0;

        while psi_old - est.psi > tolerance && iter < self.max_iter {
            psi_old = est.psi;
            iter += 1;

            let dalpha = Self::direction(problem, &ks, &est)?;
            let step = linesearch::brent(
                linesearch::StepCost {
                    problem,
                    alpha: &est.alpha,
                    dalpha: &dalpha,
                },
                self.opt_max,
                self.opt_tolerance,
            )?;
            let candidate = problem.estimate(&est.alpha + &(dalpha * F::cast(step)));
            debug!(
                "Newton iteration {iter}: step={step}, psi={}",
                candidate.psi
            );
            if candidate.psi < est.psi {
                est = candidate;
            }
        }
        if iter >= self.max_iter && psi_old - est.psi > tolerance {
            warn!(
                "Newton minimizer reached max_iter={} before convergence (psi decrease {} > {})",
                self.max_iter,
                psi_old - est.psi,
                self.tolerance
            );
        }
        Ok(est)
    }
}

/// First order method used by [`FirstOrderOptimizer`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum FirstOrderMethod {
    /// L-BFGS with More-Thuente line search, `memory` last gradients are kept
    Lbfgs {
        /// history size
        memory: usize,
    },
    /// Steepest descent with More-Thuente line search
    SteepestDescent,
}

/// Gradient-based minimizer of the Laplace objective
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct FirstOrderOptimizer {
    /// solver
    pub method: FirstOrderMethod,
    /// maximum number of iterations
    pub max_iter: u64,
    /// tolerance on the gradient norm
    pub tolerance_grad: f64,
    /// tolerance on the objective change
    pub tolerance_cost: f64,
}

impl Default for FirstOrderOptimizer {
    fn default() -> Self {
        FirstOrderOptimizer {
            method: FirstOrderMethod::Lbfgs { memory: 10 },
            max_iter: 1000,
            tolerance_grad: 1e-10,
            tolerance_cost: 1e-14,
        }
    }
}

impl FirstOrderOptimizer {
    /// Steepest descent constructor with default tolerances
    pub fn steepest_descent() -> Self {
        FirstOrderOptimizer {
            method: FirstOrderMethod::SteepestDescent,
            ..Default::default()
        }
    }

    /// Set the maximum number of iterations
    pub fn max_iter(mut self, max_iter: u64) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the gradient norm tolerance
    pub fn tolerance_grad(mut self, tolerance_grad: f64) -> Self {
        self.tolerance_grad = tolerance_grad;
        self
    }
}

impl<F: Float> Minimizer<F> for FirstOrderOptimizer {
    fn check(&self) -> Result<()> {
        if let FirstOrderMethod::Lbfgs { memory: 0 } = self.method {
            return Err(GpError::InvalidValueError(
                "L-BFGS memory should be positive".to_string(),
            ));
        }
        if self.max_iter == 0 || !(self.tolerance_grad >= 0.) || !(self.tolerance_cost >= 0.) {
            return Err(GpError::InvalidValueError(format!(
                "First order minimizer settings should be positive, got {self}"
            )));
        }
        Ok(())
    }

    #[cfg(not(feature = "linesearch"))]
    fn minimize<L: LikelihoodModel<F>>(
        &self,
        _problem: &LaplaceProblem<F, L>,
        _start: ModeEstimate<F>,
    ) -> Result<ModeEstimate<F>> {
        Err(GpError::UnsupportedCapability(
            "First order minimizers require the `linesearch` feature".to_string(),
        ))
    }

    #[cfg(feature = "linesearch")]
    fn minimize<L: LikelihoodModel<F>>(
        &self,
        problem: &LaplaceProblem<F, L>,
        start: ModeEstimate<F>,
    ) -> Result<ModeEstimate<F>> {
        match linesearch::first_order(self, problem, &start.alpha)? {
            Some(alpha) => {
                let candidate = problem.estimate(alpha);
                if candidate.psi <= start.psi {
                    Ok(candidate)
                } else {
                    warn!("{self} did not improve the objective, keeping start estimate");
                    Ok(start)
                }
            }
            None => {
                warn!("{self} returned no solution, keeping start estimate");
                Ok(start)
            }
        }
    }
}

/// Minimizer selection for the mode search
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum LaplaceMinimizer {
    /// Newton iterations with Brent line search
    Newton(NewtonOptimizer),
    /// Generic gradient-based minimizer
    FirstOrder(FirstOrderOptimizer),
}

impl Default for LaplaceMinimizer {
    fn default() -> Self {
        LaplaceMinimizer::Newton(NewtonOptimizer::default())
    }
}

impl<F: Float> Minimizer<F> for LaplaceMinimizer {
    fn check(&self) -> Result<()> {
        match self {
            LaplaceMinimizer::Newton(m) => Minimizer::<F>::check(m),
            LaplaceMinimizer::FirstOrder(m) => Minimizer::<F>::check(m),
        }
    }

    fn minimize<L: LikelihoodModel<F>>(
        &self,
        problem: &LaplaceProblem<F, L>,
        start: ModeEstimate<F>,
    ) -> Result<ModeEstimate<F>> {
        match self {
            LaplaceMinimizer::Newton(m) => m.minimize(problem, start),
            LaplaceMinimizer::FirstOrder(m) => m.minimize(problem, start),
        }
    }
}

impl TryFrom<&str> for LaplaceMinimizer {
    type Error = GpError;
    fn try_from(s: &str) -> Result<Self> {
        match s {
            "Newton" => Ok(LaplaceMinimizer::Newton(NewtonOptimizer::default())),
            "Lbfgs" => Ok(LaplaceMinimizer::FirstOrder(FirstOrderOptimizer::default())),
            "SteepestDescent" => Ok(LaplaceMinimizer::FirstOrder(
                FirstOrderOptimizer::steepest_descent(),
            )),
            _ => Err(GpError::UnsupportedMinimizer(format!(
                "{s}, should be one of 'Newton', 'Lbfgs', 'SteepestDescent'"
            ))),
        }
    }
}

impl fmt::Display for NewtonOptimizer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Newton(max_iter={}, tolerance={}, opt_tolerance={}, opt_max={})",
            self.max_iter, self.tolerance, self.opt_tolerance, self.opt_max
        )
    }
}

impl fmt::Display for FirstOrderOptimizer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let method = match self.method {
            FirstOrderMethod::Lbfgs { memory } => format!("Lbfgs(memory={memory})"),
            FirstOrderMethod::SteepestDescent => "SteepestDescent".to_string(),
        };
        write!(
            f,
            "{method}(max_iter={}, tolerance_grad={}, tolerance_cost={})",
            self.max_iter, self.tolerance_grad, self.tolerance_cost
        )
    }
}

impl fmt::Display for LaplaceMinimizer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LaplaceMinimizer::Newton(m) => write!(f, "{m}"),
            LaplaceMinimizer::FirstOrder(m) => write!(f, "{m}"),
        }
    }
}
