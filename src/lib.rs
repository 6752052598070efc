//! Bayesian estimation of a four-parameter logistic correlate-of-protection
//! curve with a parallel-tempering Metropolis sampler.
//!
//! ```no_run
//! use cop_mcmc::{Data, ParallelTempering, Priors, TemperingSettings};
//!
//! let data = Data::from_indicators(vec![-1.0, 0.5, 2.0, 3.5], &[1, 1, 0, 0])?;
//! let mut sampler = ParallelTempering::new(data, Priors::default(), TemperingSettings::default())?;
//! sampler.run(10_000);
//! let diagnostics = sampler.diagnostics(5_000);
//! println!("R-hat: {:?}, ESS: {:?}", diagnostics.rhat, diagnostics.ess);
//! # Ok::<(), cop_mcmc::SamplerError>(())
//! ```

pub(crate) mod chain;
pub(crate) mod diagnostics;
pub(crate) mod math;
pub(crate) mod model;
pub(crate) mod proposal;
pub(crate) mod replicates;
pub(crate) mod sampler;
pub(crate) mod trace;

pub use chain::MetropolisChain;
pub use diagnostics::{
    column, effective_sample_size, gelman_rubin, multi_chain_rhat, split_rhat, summarize,
    ConvergenceThresholds, ConvergenceWarning, Diagnostics, ParamSummary, MIN_DIAGNOSTIC_SAMPLES,
};
pub use math::{log_bernoulli, log_beta, log_normal, log_truncated_normal, sigmoid};
pub use model::{
    log_likelihood, log_posterior_tempered, log_prior, response_probability, Data, ParamKind,
    Params, Priors,
};
pub use proposal::{ProposalDistribution, ProposalSettings};
pub use replicates::{sample_replicates, ReplicateReport};
pub use sampler::{
    swap_log_ratio, temperature_ladder, ParallelTempering, Result, SamplerError, SamplerState,
    TemperingSettings,
};
pub use trace::TraceBuilder;
