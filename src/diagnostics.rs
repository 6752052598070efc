//! Convergence diagnostics and posterior summaries computed from sample traces.

use std::fmt;

use itertools::Itertools;

use crate::math::{mean, sample_variance};
use crate::model::{ParamKind, Params};

/// Below this many post-warmup draws R-hat and ESS are not computed.
pub const MIN_DIAGNOSTIC_SAMPLES: usize = 100;

/// Largest autocorrelation lag used by the ESS estimate.
const MAX_ESS_LAG: usize = 100;

/// Per-parameter convergence diagnostics of the cold chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostics {
    /// Split R-hat, in `ParamKind::ALL` order.
    pub rhat: [f64; 4],
    /// Effective sample size, in `ParamKind::ALL` order.
    pub ess: [f64; 4],
    pub swap_rate: f64,
    /// Move acceptance rate of every chain, coldest first.
    pub acceptance_rates: Vec<f64>,
    /// Number of post-warmup draws the diagnostics were computed from.
    pub num_samples: usize,
}

/// Limits used to decide whether a run has converged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceThresholds {
    pub max_rhat: f64,
    pub min_ess: f64,
}

impl Default for ConvergenceThresholds {
    fn default() -> Self {
        ConvergenceThresholds {
            max_rhat: 1.05,
            min_ess: 400.,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConvergenceWarning {
    HighRhat { param: ParamKind, value: f64, limit: f64 },
    LowEss { param: ParamKind, value: f64, limit: f64 },
}

impl fmt::Display for ConvergenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvergenceWarning::HighRhat { param, value, limit } => {
                write!(f, "R-hat of {param} is {value:.3}, above {limit}")
            }
            ConvergenceWarning::LowEss { param, value, limit } => {
                write!(f, "effective sample size of {param} is {value:.1}, below {limit}")
            }
        }
    }
}

impl Diagnostics {
    pub fn warnings(&self, thresholds: &ConvergenceThresholds) -> Vec<ConvergenceWarning> {
        let mut warnings = Vec::new();
        for param in ParamKind::ALL {
            let rhat = self.rhat[param.index()];
            // NaN counts as not converged.
            if !(rhat <= thresholds.max_rhat) {
                warnings.push(ConvergenceWarning::HighRhat {
                    param,
                    value: rhat,
                    limit: thresholds.max_rhat,
                });
            }
            let ess = self.ess[param.index()];
            if !(ess >= thresholds.min_ess) {
                warnings.push(ConvergenceWarning::LowEss {
                    param,
                    value: ess,
                    limit: thresholds.min_ess,
                });
            }
        }
        warnings
    }

    pub fn is_converged(&self, thresholds: &ConvergenceThresholds) -> bool {
        self.warnings(thresholds).is_empty()
    }
}

/// Values of one parameter across a trace.
pub fn column(samples: &[Params], param: ParamKind) -> Vec<f64> {
    samples.iter().map(|p| p.get(param)).collect_vec()
}

/// Gelman-Rubin statistic across independent chains of one parameter.
///
/// Chain means and variances use each chain's full length, `n` is the
/// length of the shortest chain. Returns `1.0` when the within- and
/// between-chain variances are both zero and `+inf` when only the
/// within-chain variance is.
pub fn gelman_rubin(chains: &[&[f64]]) -> f64 {
    let m = chains.len();
    let n = match chains.iter().map(|c| c.len()).min() {
        Some(n) if m >= 2 && n >= 2 => n as f64,
        _ => return 1.,
    };

    let means = chains.iter().map(|c| mean(c)).collect_vec();
    let within = chains
        .iter()
        .zip(&means)
        .map(|(c, &mu)| sample_variance(c, mu))
        .sum::<f64>()
        / m as f64;
    let grand_mean = mean(&means);
    let between = n * means
        .iter()
        .map(|&mu| (mu - grand_mean) * (mu - grand_mean))
        .sum::<f64>()
        / (m - 1) as f64;

    if within <= 0. {
        return if between <= 0. { 1. } else { f64::INFINITY };
    }
    let var_plus = (n - 1.) / n * within + between / n;
    (var_plus / within).sqrt()
}

/// R-hat of a single post-warmup series split into two contiguous halves.
pub fn split_rhat(series: &[f64]) -> f64 {
    if series.len() < MIN_DIAGNOSTIC_SAMPLES {
        return 1.;
    }
    let (first, second) = series.split_at(series.len() / 2);
    gelman_rubin(&[first, second])
}

/// Effective sample size from the initial positive autocorrelation sequence.
///
/// Lags run from 1 up to `min(100, n / 2)`, exclusive. The sum stops at the
/// first negative autocorrelation, which is left out, so the result lies in
/// `(0, n]` for any series with positive variance.
pub fn effective_sample_size(series: &[f64]) -> f64 {
    let n = series.len();
    if n < MIN_DIAGNOSTIC_SAMPLES {
        return 0.;
    }
    let mu = mean(series);
    let variance = sample_variance(series, mu);
    if variance <= 0. {
        return 0.;
    }

    let mut acf_sum = 0.;
    for lag in 1..MAX_ESS_LAG.min(n / 2) {
        let cov: f64 = series[lag..]
            .iter()
            .zip(series)
            .map(|(&x, &y)| (x - mu) * (y - mu))
            .sum();
        let rho = cov / ((n - lag) as f64 * variance);
        if rho < 0. {
            break;
        }
        acf_sum += rho;
    }
    n as f64 / (1. + 2. * acf_sum)
}

/// Split R-hat of every parameter after discarding `warmup` draws.
pub fn rhat(samples: &[Params], warmup: usize) -> [f64; 4] {
    let kept = samples.get(warmup..).unwrap_or(&[]);
    ParamKind::ALL.map(|param| split_rhat(&column(kept, param)))
}

/// ESS of every parameter after discarding `warmup` draws.
pub fn ess(samples: &[Params], warmup: usize) -> [f64; 4] {
    let kept = samples.get(warmup..).unwrap_or(&[]);
    ParamKind::ALL.map(|param| effective_sample_size(&column(kept, param)))
}

/// Multi-chain R-hat of every parameter across independent post-warmup traces.
///
/// Falls back to `1.0` with fewer than two traces or when the shortest one
/// has fewer than `MIN_DIAGNOSTIC_SAMPLES` draws.
pub fn multi_chain_rhat(traces: &[&[Params]]) -> [f64; 4] {
    let shortest = traces.iter().map(|t| t.len()).min().unwrap_or(0);
    if traces.len() < 2 || shortest < MIN_DIAGNOSTIC_SAMPLES {
        return [1.; 4];
    }
    ParamKind::ALL.map(|param| {
        let columns = traces
            .iter()
            .map(|t| column(&t[..shortest], param))
            .collect_vec();
        let views = columns.iter().map(Vec::as_slice).collect_vec();
        gelman_rubin(&views)
    })
}

/// Posterior summary of one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParamSummary {
    pub mean: f64,
    pub sd: f64,
    pub q025: f64,
    pub median: f64,
    pub q975: f64,
}

/// Mean, standard deviation and central quantiles of every parameter.
pub fn summarize(samples: &[Params]) -> [ParamSummary; 4] {
    ParamKind::ALL.map(|param| {
        let mut values = column(samples, param);
        if values.is_empty() {
            return ParamSummary::default();
        }
        let mu = mean(&values);
        let sd = sample_variance(&values, mu).sqrt();
        values.sort_by(f64::total_cmp);
        ParamSummary {
            mean: mu,
            sd,
            q025: quantile_sorted(&values, 0.025),
            median: quantile_sorted(&values, 0.5),
            q975: quantile_sorted(&values, 0.975),
        }
    })
}

/// Linear-interpolation quantile of an ascending, non-empty slice.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
