use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gpinfer_gp::kernel_models::SquaredExponentialKernel;
use gpinfer_gp::likelihood_models::{LogitLikelihood, StudentsTLikelihood};
use gpinfer_gp::mean_models::ZeroMean;
use gpinfer_gp::{LaplaceMinimizer, SingleLaplaceInference, LOG_SCALE};
use linfa::prelude::{Dataset, Fit};
use ndarray::{array, Array1, Array2, Axis};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;

fn training_data(nt: usize, dim: usize) -> (Array2<f64>, Array1<f64>, Array1<f64>) {
    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    let xt = Array2::random_using((nt, dim), Uniform::new(-3., 3.), &mut rng);
    let smooth = xt.map_axis(Axis(1), |x| x.mapv(|v| v.sin()).sum());
    let labels = smooth.mapv(|v| if v > 0. { 1. } else { -1. });
    let mut targets = smooth;
    for i in (0..nt).step_by(17) {
        targets[i] += 5.;
    }
    (xt, labels, targets)
}

fn criterion_laplace(c: &mut Criterion) {
    let dim = 3;
    let nts = [50, 100, 200];

    let mut group = c.benchmark_group("laplace");
    group.sample_size(20);
    for nt in nts {
        let (xt, labels, targets) = training_data(nt, dim);

        for minimizer in ["Newton", "Lbfgs"] {
            let minimizer = LaplaceMinimizer::try_from(minimizer).expect("known minimizer");
            group.bench_function(format!("logit {minimizer} {nt}"), |b| {
                b.iter(|| {
                    black_box(
                        SingleLaplaceInference::params(
                            SquaredExponentialKernel::new(array![0.5]),
                            ZeroMean(),
                            LogitLikelihood(),
                        )
                        .minimizer(minimizer)
                        .fit(&Dataset::new(xt.to_owned(), labels.to_owned()))
                        .expect("Laplace fit error"),
                    )
                });
            });
        }

        group.bench_function(format!("student-t gradients {nt}"), |b| {
            b.iter(|| {
                let mut laplace = SingleLaplaceInference::params(
                    SquaredExponentialKernel::new(array![0.5]),
                    ZeroMean(),
                    StudentsTLikelihood::new(0.2, 3.),
                )
                .fit(&Dataset::new(xt.to_owned(), targets.to_owned()))
                .expect("Laplace fit error");
                black_box(
                    laplace
                        .derivative_wrt_inference_method(&LOG_SCALE)
                        .expect("log_scale derivative"),
                )
            });
        });
    }
    group.finish();
}

criterion_group!(benches, criterion_laplace);
criterion_main!(benches);
