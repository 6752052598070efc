//! Fit the four-parameter logistic curve to simulated data and print the
//! posterior summary and convergence diagnostics.
//!
//! Set `RUST_LOG=cop_mcmc=debug` to see the sampler's log output.

use cop_mcmc::{
    response_probability, sample_replicates, summarize, ConvergenceThresholds, Data, ParamKind,
    ParallelTempering, Params, Priors, TemperingSettings,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let truth = Params::new(0.05, 0.9, 1.5, 2.);
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let titre: Vec<f64> = (0..200).map(|_| rng.random_range(-1.0..4.0)).collect();
    let outcome = titre
        .iter()
        .map(|&t| rng.random::<f64>() < response_probability(t, &truth))
        .collect();
    let data = Data::new(titre, outcome)?;

    let priors = Priors {
        floor_alpha: 1.,
        floor_beta: 5.,
        ceiling_alpha: 5.,
        ceiling_beta: 1.,
        ec50_mean: 1.,
        ec50_sd: 2.,
        slope_mean: 1.5,
        slope_sd: 2.,
    };
    let settings = TemperingSettings {
        seed: 2024,
        ..Default::default()
    };
    let warmup = 5_000;

    let mut sampler = ParallelTempering::new(data.clone(), priors, settings)?;
    sampler.run(10_000);
    let diagnostics = sampler.check_convergence(warmup, &ConvergenceThresholds::default());
    let summary = summarize(&sampler.samples()[warmup..]);

    println!("parameter      truth     mean       sd     2.5%    97.5%    R-hat      ESS");
    for param in ParamKind::ALL {
        let s = summary[param.index()];
        println!(
            "{:<10} {:>8.3} {:>8.3} {:>8.3} {:>8.3} {:>8.3} {:>8.3} {:>8.1}",
            param.name(),
            truth.get(param),
            s.mean,
            s.sd,
            s.q025,
            s.q975,
            diagnostics.rhat[param.index()],
            diagnostics.ess[param.index()],
        );
    }
    println!("swap rate: {:.3}", diagnostics.swap_rate);
    println!("acceptance rates: {:.3?}", diagnostics.acceptance_rates);

    let report = sample_replicates(data, priors, settings, 4, 10_000, warmup)?;
    println!("multi-replicate R-hat: {:.3?}", report.rhat);
    Ok(())
}
