use gpinfer_gp::{
    kernel_models::*, likelihood_models::*, mean_models::*, SingleLaplaceInference, LOG_SCALE,
};
use linfa::prelude::*;
use ndarray::{arr2, Array1, Axis};

fn main() {
    env_logger::init();

    let xt: ndarray::Array2<f64> = arr2(&[
        [-2.5], [-2.0], [-1.4], [-0.9], [-0.3], [0.1], [0.6], [1.2], [1.7], [2.4],
    ]);
    let yt: Array1<f64> = xt.map_axis(Axis(1), |x| if x[0].sin() > 0. { 1. } else { -1. });

    println!("Laplace approximation of a probit classifier at {}", xt.column(0));
    let mut laplace = SingleLaplaceInference::params(
        SquaredExponentialKernel::new(Array1::from_elem(1, 1.)),
        ZeroMean(),
        ProbitLikelihood(),
    )
    .fit(&Dataset::new(xt, yt))
    .expect("Laplace approximation");

    // crude gradient descent on the kernel scale and length scale
    let theta = laplace.kernel().hyperparameters()[0];
    let step = 0.05;
    for iter in 0..50 {
        let nlz = laplace.negative_log_marginal_likelihood().expect("nlZ");
        let dscale = laplace
            .derivative_wrt_inference_method(&LOG_SCALE)
            .expect("log_scale derivative");
        let dtheta = laplace.derivative_wrt_kernel(&theta).expect("theta derivative");
        if iter % 10 == 0 {
            println!("iter {iter:>2}: nlZ = {nlz:.6}, dlog_scale = {}, dtheta = {}", dscale[0], dtheta);
        }

        let log_scale = laplace.log_scale() - step * dscale[0];
        laplace.set_log_scale(log_scale).expect("valid log_scale");
        let kernel = laplace.kernel_mut();
        kernel.theta = (&kernel.theta - &(dtheta * step)).mapv(|v| v.max(1e-3));
    }

    println!("{laplace}");
    println!(
        "nlZ = {}",
        laplace.negative_log_marginal_likelihood().expect("nlZ")
    );
    println!("latent mode = {}", laplace.latent_mode().expect("mode"));
    println!(
        "posterior variances = {}",
        laplace
            .posterior_covariance()
            .expect("covariance")
            .diag()
    );
}
