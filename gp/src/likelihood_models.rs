//! A module for likelihood models `p(y|f)` linking labels `y` to the latent
//! function values `f` of the GP.
//!
//! The following models are implemented:
//! * logit (binary classification, labels in {-1, 1}),
//! * probit (binary classification, labels in {-1, 1}),
//! * gaussian (regression),
//! * Student's-t (robust regression, not log-concave).

use crate::errors::{GpError, Result};
use crate::hyperparameters::{check_hyperparameter, Hyperparameter};
use crate::utils::to_f64;
use linfa::Float;
use ndarray::{Array1, ArrayBase, Data, Ix1, Zip};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, SQRT_2};
use std::fmt;

/// Log standard deviation hyperparameter of gaussian and Student's-t likelihoods
pub const LOG_SIGMA: Hyperparameter = Hyperparameter::scalar("log_sigma");

/// Discriminator of likelihood variants
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum LikelihoodKind {
    /// Logistic likelihood
    Logit,
    /// Cumulative gaussian likelihood
    Probit,
    /// Gaussian likelihood
    Gaussian,
    /// Student's-t likelihood
    StudentsT,
}

/// Order of the derivative of `log(p(y|f))` wrt `f`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DerivativeOrder {
    /// `dlp = d log(p(y|f)) / df`
    First,
    /// `d2lp = d2 log(p(y|f)) / df2`
    Second,
    /// `d3lp = d3 log(p(y|f)) / df3`
    Third,
}

/// A trait for likelihood models used in Laplace inference
pub trait LikelihoodModel<F: Float>: Clone + fmt::Display + Sync {
    /// Likelihood variant
    fn kind(&self) -> LikelihoodKind;

    /// Degrees of freedom, only defined by Student's-t likelihood
    fn degrees_of_freedom(&self) -> Option<F> {
        None
    }

    /// Check labels are valid for this likelihood
    fn check_labels(&self, _y: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<()> {
        Ok(())
    }

    /// Compute `log(p(y|f))` elementwise
    fn log_probability(
        &self,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
        f: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F>;

    /// Compute derivatives of `log(p(y|f))` wrt `f` elementwise
    fn log_probability_derivative(
        &self,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
        f: &ArrayBase<impl Data<Elem = F>, Ix1>,
        order: DerivativeOrder,
    ) -> Array1<F>;

    /// Hyperparameters of the likelihood
    fn hyperparameters(&self) -> Vec<Hyperparameter> {
        vec![]
    }

    /// Derivative of `log(p(y|f))` wrt the given hyperparameter
    fn first_derivative(
        &self,
        _y: &ArrayBase<impl Data<Elem = F>, Ix1>,
        _f: &ArrayBase<impl Data<Elem = F>, Ix1>,
        param: &Hyperparameter,
    ) -> Result<Array1<F>> {
        Err(GpError::UnknownHyperparameter(format!(
            "{self} has no derivative wrt {param}"
        )))
    }

    /// Derivative of `dlp` wrt the given hyperparameter
    fn second_derivative(
        &self,
        _y: &ArrayBase<impl Data<Elem = F>, Ix1>,
        _f: &ArrayBase<impl Data<Elem = F>, Ix1>,
        param: &Hyperparameter,
    ) -> Result<Array1<F>> {
        Err(GpError::UnknownHyperparameter(format!(
            "{self} has no derivative wrt {param}"
        )))
    }

    /// Derivative of `d2lp` wrt the given hyperparameter
    fn third_derivative(
        &self,
        _y: &ArrayBase<impl Data<Elem = F>, Ix1>,
        _f: &ArrayBase<impl Data<Elem = F>, Ix1>,
        param: &Hyperparameter,
    ) -> Result<Array1<F>> {
        Err(GpError::UnknownHyperparameter(format!(
            "{self} has no derivative wrt {param}"
        )))
    }
}

fn check_binary_labels<F: Float>(name: &str, y: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<()> {
    if y.iter().all(|v| *v == F::one() || *v == -F::one()) {
        Ok(())
    } else {
        Err(GpError::InvalidValueError(format!(
            "{name} requires binary labels in {{-1, 1}}"
        )))
    }
}

/// Logistic likelihood `p(y|f) = 1 / (1 + exp(-y.f))`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct LogitLikelihood();

fn sigmoid<F: Float>(f: F) -> F {
    if f >= F::zero() {
        F::one() / (F::one() + (-f).exp())
    } else {
        let e = f.exp();
        e / (F::one() + e)
    }
}

fn softplus<F: Float>(x: F) -> F {
    x.max(F::zero()) + (-x.abs()).exp().ln_1p()
}

impl<F: Float> LikelihoodModel<F> for LogitLikelihood {
    fn kind(&self) -> LikelihoodKind {
        LikelihoodKind::Logit
    }

    fn check_labels(&self, y: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<()> {
        check_binary_labels("LogitLikelihood", y)
    }

    fn log_probability(
        &self,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
        f: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F> {
        Zip::from(y).and(f).map_collect(|&y, &f| -softplus(-y * f))
    }

    fn log_probability_derivative(
        &self,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
        f: &ArrayBase<impl Data<Elem = F>, Ix1>,
        order: DerivativeOrder,
    ) -> Array1<F> {
        let two = F::cast(2.);
        Zip::from(y).and(f).map_collect(|&y, &f| {
            let p = sigmoid(f);
            match order {
                DerivativeOrder::First => (y + F::one()) / two - p,
                DerivativeOrder::Second => -p * (F::one() - p),
                DerivativeOrder::Third => -p * (F::one() - p) * (F::one() - two * p),
            }
        })
    }
}

/// Cumulative gaussian likelihood `p(y|f) = Phi(y.f)`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct ProbitLikelihood();

/// Below this value `Phi(z)` is computed from its asymptotic expansion
const PROBIT_TAIL: f64 = -35.;

/// Returns `(log(Phi(z)), phi(z) / Phi(z))`
fn log_cdf_and_ratio(z: f64) -> (f64, f64) {
    if z > PROBIT_TAIL {
        let cdf = 0.5 * libm::erfc(-z / SQRT_2);
        let pdf = (-0.5 * z * z).exp() / (2. * PI).sqrt();
        (cdf.ln(), pdf / cdf)
    } else {
        // Phi(z) ~ phi(z) / (-z) * (1 - 1/z^2 + 3/z^4 - 15/z^6)
        let z2 = z * z;
        let series = 1. - 1. / z2 + 3. / (z2 * z2) - 15. / (z2 * z2 * z2);
        let lp = -0.5 * z2 - 0.5 * (2. * PI).ln() - (-z).ln() + series.ln();
        (lp, -z / series)
    }
}

impl<F: Float> LikelihoodModel<F> for ProbitLikelihood {
    fn kind(&self) -> LikelihoodKind {
        LikelihoodKind::Probit
    }

    fn check_labels(&self, y: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<()> {
        check_binary_labels("ProbitLikelihood", y)
    }

    fn log_probability(
        &self,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
        f: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F> {
        Zip::from(y)
            .and(f)
            .map_collect(|&y, &f| F::cast(log_cdf_and_ratio(to_f64(y * f)).0))
    }

    fn log_probability_derivative(
        &self,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
        f: &ArrayBase<impl Data<Elem = F>, Ix1>,
        order: DerivativeOrder,
    ) -> Array1<F> {
        Zip::from(y).and(f).map_collect(|&y, &f| {
            let z = to_f64(y * f);
            let (_, n) = log_cdf_and_ratio(z);
            let h = z + n;
            let sign = to_f64(y);
            let v = match order {
                DerivativeOrder::First => sign * n,
                DerivativeOrder::Second => -n * h,
                DerivativeOrder::Third => sign * n * (h * h + n * h - 1.),
            };
            F::cast(v)
        })
    }
}

/// Gaussian likelihood `p(y|f) = N(y; f, sigma^2)`
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct GaussianLikelihood<F: Float> {
    /// Logarithm of the noise standard deviation
    pub log_sigma: F,
}

impl<F: Float> Default for GaussianLikelihood<F> {
    fn default() -> Self {
        GaussianLikelihood {
            log_sigma: F::zero(),
        }
    }
}

impl<F: Float> GaussianLikelihood<F> {
    /// Constructor given the noise standard deviation `sigma`
    pub fn new(sigma: F) -> Self {
        GaussianLikelihood {
            log_sigma: sigma.ln(),
        }
    }
}

impl<F: Float> LikelihoodModel<F> for GaussianLikelihood<F> {
    fn kind(&self) -> LikelihoodKind {
        LikelihoodKind::Gaussian
    }

    fn log_probability(
        &self,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
        f: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F> {
        let sigma2 = (F::cast(2.) * self.log_sigma).exp();
        let cst = F::cast(0.5 * (2. * PI).ln()) + self.log_sigma;
        Zip::from(y).and(f).map_collect(|&y, &f| {
            let r = y - f;
            -r * r / (F::cast(2.) * sigma2) - cst
        })
    }

    fn log_probability_derivative(
        &self,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
        f: &ArrayBase<impl Data<Elem = F>, Ix1>,
        order: DerivativeOrder,
    ) -> Array1<F> {
        let sigma2 = (F::cast(2.) * self.log_sigma).exp();
        Zip::from(y).and(f).map_collect(|&y, &f| match order {
            DerivativeOrder::First => (y - f) / sigma2,
            DerivativeOrder::Second => -F::one() / sigma2,
            DerivativeOrder::Third => F::zero(),
        })
    }

    fn hyperparameters(&self) -> Vec<Hyperparameter> {
        vec![LOG_SIGMA]
    }

    fn first_derivative(
        &self,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
        f: &ArrayBase<impl Data<Elem = F>, Ix1>,
        param: &Hyperparameter,
    ) -> Result<Array1<F>> {
        check_hyperparameter(&self.to_string(), param, &[LOG_SIGMA])?;
        let sigma2 = (F::cast(2.) * self.log_sigma).exp();
        Ok(Zip::from(y).and(f).map_collect(|&y, &f| {
            let r = y - f;
            r * r / sigma2 - F::one()
        }))
    }

    fn second_derivative(
        &self,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
        f: &ArrayBase<impl Data<Elem = F>, Ix1>,
        param: &Hyperparameter,
    ) -> Result<Array1<F>> {
        check_hyperparameter(&self.to_string(), param, &[LOG_SIGMA])?;
        let sigma2 = (F::cast(2.) * self.log_sigma).exp();
        Ok(Zip::from(y)
            .and(f)
            .map_collect(|&y, &f| -F::cast(2.) * (y - f) / sigma2))
    }

    fn third_derivative(
        &self,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
        _f: &ArrayBase<impl Data<Elem = F>, Ix1>,
        param: &Hyperparameter,
    ) -> Result<Array1<F>> {
        check_hyperparameter(&self.to_string(), param, &[LOG_SIGMA])?;
        let sigma2 = (F::cast(2.) * self.log_sigma).exp();
        Ok(Array1::from_elem(y.len(), F::cast(2.) / sigma2))
    }
}

/// Student's-t likelihood with `df` degrees of freedom and scale `sigma`
///
/// `log(p(y|f)) = lgamma((df+1)/2) - lgamma(df/2) - log(df.pi)/2 - log(sigma)
///                - (df+1)/2 . log(1 + (y-f)^2 / (df.sigma^2))`
///
/// The likelihood is not log-concave: outliers give negative curvature `W`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct StudentsTLikelihood<F: Float> {
    /// Logarithm of the scale
    pub log_sigma: F,
    /// Degrees of freedom
    pub df: F,
}

impl<F: Float> Default for StudentsTLikelihood<F> {
    fn default() -> Self {
        StudentsTLikelihood {
            log_sigma: F::zero(),
            df: F::cast(3.),
        }
    }
}

impl<F: Float> StudentsTLikelihood<F> {
    /// Constructor given the scale `sigma` and degrees of freedom `df`
    pub fn new(sigma: F, df: F) -> Self {
        StudentsTLikelihood {
            log_sigma: sigma.ln(),
            df,
        }
    }

    fn df_sigma2(&self) -> F {
        self.df * (F::cast(2.) * self.log_sigma).exp()
    }
}

impl<F: Float> LikelihoodModel<F> for StudentsTLikelihood<F> {
    fn kind(&self) -> LikelihoodKind {
        LikelihoodKind::StudentsT
    }

    fn degrees_of_freedom(&self) -> Option<F> {
        Some(self.df)
    }

    fn log_probability(
        &self,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
        f: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F> {
        let df = to_f64(self.df);
        let cst = F::cast(
            libm::lgamma((df + 1.) / 2.) - libm::lgamma(df / 2.) - 0.5 * (df * PI).ln(),
        ) - self.log_sigma;
        let half_df1 = (self.df + F::one()) / F::cast(2.);
        let df_sigma2 = self.df_sigma2();
        Zip::from(y).and(f).map_collect(|&y, &f| {
            let r = y - f;
            cst - half_df1 * (r * r / df_sigma2).ln_1p()
        })
    }

    fn log_probability_derivative(
        &self,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
        f: &ArrayBase<impl Data<Elem = F>, Ix1>,
        order: DerivativeOrder,
    ) -> Array1<F> {
        let df1 = self.df + F::one();
        let df_sigma2 = self.df_sigma2();
        Zip::from(y).and(f).map_collect(|&y, &f| {
            let r = y - f;
            let r2 = r * r;
            let a = r2 + df_sigma2;
            match order {
                DerivativeOrder::First => df1 * r / a,
                DerivativeOrder::Second => df1 * (r2 - df_sigma2) / (a * a),
                DerivativeOrder::Third => {
                    F::cast(2.) * df1 * r * (r2 - F::cast(3.) * df_sigma2) / (a * a * a)
                }
            }
        })
    }

    fn hyperparameters(&self) -> Vec<Hyperparameter> {
        vec![LOG_SIGMA]
    }

    fn first_derivative(
        &self,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
        f: &ArrayBase<impl Data<Elem = F>, Ix1>,
        param: &Hyperparameter,
    ) -> Result<Array1<F>> {
        check_hyperparameter(&self.to_string(), param, &[LOG_SIGMA])?;
        let df1 = self.df + F::one();
        let df_sigma2 = self.df_sigma2();
        Ok(Zip::from(y).and(f).map_collect(|&y, &f| {
            let r2 = (y - f) * (y - f);
            df1 * r2 / (r2 + df_sigma2) - F::one()
        }))
    }

    fn second_derivative(
        &self,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
        f: &ArrayBase<impl Data<Elem = F>, Ix1>,
        param: &Hyperparameter,
    ) -> Result<Array1<F>> {
        check_hyperparameter(&self.to_string(), param, &[LOG_SIGMA])?;
        let df1 = self.df + F::one();
        let df_sigma2 = self.df_sigma2();
        Ok(Zip::from(y).and(f).map_collect(|&y, &f| {
            let r = y - f;
            let a = r * r + df_sigma2;
            -F::cast(2.) * df1 * r * df_sigma2 / (a * a)
        }))
    }

    fn third_derivative(
        &self,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
        f: &ArrayBase<impl Data<Elem = F>, Ix1>,
        param: &Hyperparameter,
    ) -> Result<Array1<F>> {
        check_hyperparameter(&self.to_string(), param, &[LOG_SIGMA])?;
        let df1 = self.df + F::one();
        let df_sigma2 = self.df_sigma2();
        Ok(Zip::from(y).and(f).map_collect(|&y, &f| {
            let r2 = (y - f) * (y - f);
            let a = r2 + df_sigma2;
            -F::cast(2.) * df1 * df_sigma2 * (F::cast(3.) * r2 - df_sigma2) / (a * a * a)
        }))
    }
}

impl fmt::Display for LogitLikelihood {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "LogitLikelihood")
    }
}

impl fmt::Display for ProbitLikelihood {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ProbitLikelihood")
    }
}

impl<F: Float> fmt::Display for GaussianLikelihood<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "GaussianLikelihood(log_sigma={})", self.log_sigma)
    }
}

impl<F: Float> fmt::Display for StudentsTLikelihood<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "StudentsTLikelihood(log_sigma={}, df={})",
            self.log_sigma, self.df
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1};
    use paste::paste;

    fn labels() -> (Array1<f64>, Array1<f64>) {
        (
            array![1., -1., 1., 1., -1., -1.],
            array![-2.5, -0.3, 0.0, 0.7, 1.9, -40.],
        )
    }

    fn targets() -> (Array1<f64>, Array1<f64>) {
        (
            array![0.3, -1.2, 4.5, 0.0, 2.2, -0.7],
            array![-0.5, -0.3, 0.1, 0.7, 2.0, 1.5],
        )
    }

    macro_rules! test_likelihood_derivatives {
        ($lik:ident, $model:expr, $data:ident) => {
            paste! {
                #[test]
                fn [<test_ $lik:snake _derivatives>]() {
                    let lik = $model;
                    let (y, f) = $data();
                    let e = 1e-5;
                    let fp = &f + e;
                    let fm = &f - e;

                    let lp = |f: &Array1<f64>| lik.log_probability(&y, f);
                    let d = |f: &Array1<f64>, o| lik.log_probability_derivative(&y, f, o);

                    let fdiff = (lp(&fp) - lp(&fm)) / (2. * e);
                    assert_abs_diff_eq!(fdiff, d(&f, DerivativeOrder::First), epsilon = 1e-5);
                    let fdiff = (d(&fp, DerivativeOrder::First) - d(&fm, DerivativeOrder::First)) / (2. * e);
                    assert_abs_diff_eq!(fdiff, d(&f, DerivativeOrder::Second), epsilon = 1e-5);
                    let fdiff = (d(&fp, DerivativeOrder::Second) - d(&fm, DerivativeOrder::Second)) / (2. * e);
                    assert_abs_diff_eq!(fdiff, d(&f, DerivativeOrder::Third), epsilon = 1e-5);
                    assert!(lp(&f).iter().all(|v| v.is_finite()));
                }
            }
        };
    }

    test_likelihood_derivatives!(Logit, LogitLikelihood(), labels);
    test_likelihood_derivatives!(Probit, ProbitLikelihood(), labels);
    test_likelihood_derivatives!(Gaussian, GaussianLikelihood::new(0.8), targets);
    test_likelihood_derivatives!(StudentsT, StudentsTLikelihood::new(0.5, 3.), targets);

    macro_rules! test_likelihood_hyper_derivatives {
        ($lik:ident $(, $field:ident = $val:expr)*) => {
            paste! {
                #[test]
                fn [<test_ $lik:snake _log_sigma_derivatives>]() {
                    let (y, f) = targets();
                    let log_sigma: f64 = 0.3;
                    let e = 1e-6;
                    let lik = [<$lik Likelihood>] { log_sigma $(, $field: $val)* };
                    let likp = [<$lik Likelihood>] { log_sigma: log_sigma + e $(, $field: $val)* };
                    let likm = [<$lik Likelihood>] { log_sigma: log_sigma - e $(, $field: $val)* };

                    let fdiff = (likp.log_probability(&y, &f) - likm.log_probability(&y, &f)) / (2. * e);
                    assert_abs_diff_eq!(fdiff, lik.first_derivative(&y, &f, &LOG_SIGMA).unwrap(), epsilon = 1e-6);

                    for (order, deriv) in [
                        (DerivativeOrder::First, lik.second_derivative(&y, &f, &LOG_SIGMA).unwrap()),
                        (DerivativeOrder::Second, lik.third_derivative(&y, &f, &LOG_SIGMA).unwrap()),
                    ] {
                        let fdiff = (likp.log_probability_derivative(&y, &f, order)
                            - likm.log_probability_derivative(&y, &f, order))
                            / (2. * e);
                        assert_abs_diff_eq!(fdiff, deriv, epsilon = 1e-6);
                    }
                }
            }
        };
    }

    test_likelihood_hyper_derivatives!(Gaussian);
    test_likelihood_hyper_derivatives!(StudentsT, df = 4.);

    #[test]
    fn test_gaussian_log_probability() {
        let lik = GaussianLikelihood::new(1.);
        let lp = lik.log_probability(&array![1.], &array![0.]);
        assert_abs_diff_eq!(-0.5 - 0.5 * (2. * PI).ln(), lp[0], epsilon = 1e-12);
    }

    #[test]
    fn test_students_t_log_probability() {
        // Cauchy density at 0 is 1/pi
        let lik = StudentsTLikelihood::new(1., 1.);
        let lp = lik.log_probability(&array![0.], &array![0.]);
        assert_abs_diff_eq!(-PI.ln(), lp[0], epsilon = 1e-12);
        assert_eq!(Some(1.), lik.degrees_of_freedom());
        let w = lik.log_probability_derivative(&array![5.], &array![0.], DerivativeOrder::Second);
        assert!(w[0] > 0., "outlier gives negative curvature W = -d2lp");
    }

    #[test]
    fn test_probit_tail() {
        let (lp, ratio) = log_cdf_and_ratio(-40.);
        let (lp_near, ratio_near) = log_cdf_and_ratio(-34.9);
        assert!(lp.is_finite() && lp < lp_near);
        assert!(ratio > ratio_near && ratio > 39.9);
        assert_abs_diff_eq!(0.5f64.ln(), log_cdf_and_ratio(0.).0, epsilon = 1e-12);
    }

    #[test]
    fn test_binary_labels() {
        let lik = LogitLikelihood();
        assert!(LikelihoodModel::<f64>::check_labels(&lik, &array![1., -1.]).is_ok());
        assert!(matches!(
            LikelihoodModel::<f64>::check_labels(&lik, &array![1., 0.]),
            Err(GpError::InvalidValueError(_))
        ));
        let err = LikelihoodModel::<f64>::first_derivative(
            &lik,
            &array![1.],
            &array![0.],
            &LOG_SIGMA,
        );
        assert!(matches!(err, Err(GpError::UnknownHyperparameter(_))));
    }
}
