use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use distance_core::{
    fn_fitter, CovariateFormula, DetectionFunction, DetectionFunctionModel, DetectionRecord,
    FitConfig, FitRequest, LikelihoodRegistry, SiteRecord, SurveyGeometry,
};
use distance_stats::{estimate, AbundanceBootstrap};
use rand::prelude::*;

/// Simulated line-transect survey with half-normal distances
fn generate_survey(
    n_sites: usize,
    per_site: usize,
    sigma: f64,
    seed: u64,
) -> (Vec<SiteRecord>, Vec<DetectionRecord>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let sites = (0..n_sites)
        .map(|i| SiteRecord::line(format!("T{i}"), rng.gen_range(50.0..150.0)))
        .collect();
    let detections = (0..n_sites * per_site)
        .map(|i| {
            // |N(0, sigma)| by Box-Muller
            let u1: f64 = 1.0 - rng.gen::<f64>();
            let u2: f64 = rng.gen();
            let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
            let distance = (sigma * z).abs();
            DetectionRecord::new(format!("T{}", i % n_sites), rng.gen_range(1..4) as f64, distance)
                .with_covariate("observer", rng.gen_range(0..2) as f64)
        })
        .collect();
    (sites, detections)
}

fn bench_estimator(c: &mut Criterion) {
    let mut group = c.benchmark_group("Estimator");
    let registry = LikelihoodRegistry::with_builtins();
    let (sites, detections) = generate_survey(20, 10, 15.0, 42);

    let closed = DetectionFunctionModel::builder(
        FitConfig::new("halfnorm", 60.0, SurveyGeometry::Line),
        vec![15.0],
    )
    .build(&registry)
        .unwrap();
    let covariate = DetectionFunctionModel::builder(
        FitConfig::new("halfnorm", 60.0, SurveyGeometry::Line),
        vec![15.0f64.ln(), 0.1],
    )
    .formula(CovariateFormula::with_covariates(["observer"]))
    .reference_detections(&detections)
    .unwrap()
    .build(&registry)
    .unwrap();

    group.bench_function("closed_form", |b| {
        b.iter(|| estimate(&closed, black_box(&detections), black_box(&sites), 1.0))
    });
    group.bench_function("covariate", |b| {
        b.iter(|| estimate(&covariate, black_box(&detections), black_box(&sites), 1.0))
    });
    group.finish();
}

fn bench_bootstrap(c: &mut Criterion) {
    let mut group = c.benchmark_group("Bootstrap");
    group.sample_size(10);
    let registry = LikelihoodRegistry::with_builtins();
    let model = DetectionFunctionModel::builder(
        FitConfig::new("hazrate", 60.0, SurveyGeometry::Line),
        vec![12.0, 2.5],
    )
    .build(&registry)
    .unwrap();
    let fitter = fn_fitter(|request: &FitRequest<'_>| {
        DetectionFunctionModel::builder(request.config.clone(), vec![12.0, 2.5]).build(&registry)
    });
    let (sites, detections) = generate_survey(20, 10, 15.0, 7);
    assert!(model.effective_strip_width().is_ok());

    for &n_resamples in &[50usize, 200] {
        let bootstrap = AbundanceBootstrap::default().with_resamples(n_resamples).with_seed(1);
        group.bench_with_input(
            BenchmarkId::new("sequential", n_resamples),
            &bootstrap,
            |b, bootstrap| {
                b.iter(|| {
                    bootstrap.run(&model, black_box(&detections), black_box(&sites), 1.0, &fitter)
                })
            },
        );

        let parallel = bootstrap.clone().with_parallel(true);
        group.bench_with_input(
            BenchmarkId::new("parallel", n_resamples),
            &parallel,
            |b, bootstrap| {
                b.iter(|| {
                    bootstrap.run(&model, black_box(&detections), black_box(&sites), 1.0, &fitter)
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_estimator, bench_bootstrap);
criterion_main!(benches);
