use std::sync::Arc;

use arrow::array::StructArray;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::{
    chain::MetropolisChain,
    diagnostics::{self, ConvergenceThresholds, Diagnostics},
    model::{Data, Params, Priors},
    proposal::ProposalSettings,
    trace::TraceBuilder,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SamplerError {
    #[error("the dataset contains no observations")]
    EmptyData,
    #[error("titre has {titre} entries but outcome has {outcome}")]
    LengthMismatch { titre: usize, outcome: usize },
    #[error("outcome {index} is {value}, expected 0 or 1")]
    InvalidOutcome { index: usize, value: u8 },
    #[error("at least one chain is required")]
    NoChains,
    #[error("maximum temperature must be a positive finite number, got {0}")]
    InvalidMaxTemperature(f64),
    #[error("swap interval must be at least 1")]
    InvalidSwapInterval,
    #[error("adapt interval must be at least 1")]
    InvalidAdaptInterval,
    #[error("at least one replicate is required")]
    NoReplicates,
}

pub type Result<T> = std::result::Result<T, SamplerError>;

/// Settings for the parallel tempering sampler
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperingSettings {
    /// Number of chains in the temperature ladder, the first one is the cold chain.
    pub num_chains: usize,
    /// Temperature of the hottest chain.
    pub max_temperature: f64,
    /// A replica exchange is attempted every `swap_interval` iterations.
    pub swap_interval: u64,
    pub seed: u64,
    pub proposal: ProposalSettings,
}

impl Default for TemperingSettings {
    fn default() -> Self {
        TemperingSettings {
            num_chains: 10,
            max_temperature: 10.,
            swap_interval: 10,
            seed: 0,
            proposal: ProposalSettings::default(),
        }
    }
}

impl TemperingSettings {
    fn validate(&self) -> Result<()> {
        if self.num_chains < 1 {
            return Err(SamplerError::NoChains);
        }
        if !(self.max_temperature > 0. && self.max_temperature.is_finite()) {
            return Err(SamplerError::InvalidMaxTemperature(self.max_temperature));
        }
        if self.swap_interval < 1 {
            return Err(SamplerError::InvalidSwapInterval);
        }
        if self.proposal.adapt_interval < 1 {
            return Err(SamplerError::InvalidAdaptInterval);
        }
        Ok(())
    }
}

/// Lifecycle of a sampler. There is no way back to `Constructed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    Constructed,
    Running,
    Completed,
}

/// Geometric temperature ladder from `1` to `max_temperature`.
pub fn temperature_ladder(num_chains: usize, max_temperature: f64) -> Vec<f64> {
    if num_chains == 1 {
        return vec![1.];
    }
    (0..num_chains)
        .map(|i| max_temperature.powf(i as f64 / (num_chains - 1) as f64))
        .collect()
}

/// Log acceptance ratio for exchanging the states of two chains.
///
/// `logp_i` and `logp_j` are the tempered log-posteriors of each chain's
/// current state, evaluated at that chain's own temperature.
#[inline]
pub fn swap_log_ratio(logp_i: f64, logp_j: f64, temperature_i: f64, temperature_j: f64) -> f64 {
    (logp_i - logp_j) * (1. / temperature_j - 1. / temperature_i)
}

/// Upper bound on the draws reserved up front by a single `run` call.
const MAX_RESERVED_DRAWS: usize = 1 << 20;

fn trace_reservation(n_iterations: u64) -> usize {
    usize::try_from(n_iterations)
        .unwrap_or(usize::MAX)
        .min(MAX_RESERVED_DRAWS)
}

/// Draw a starting point from broad uniform ranges inside the support.
fn random_start<R: Rng + ?Sized>(rng: &mut R) -> Params {
    Params {
        floor: rng.random_range(0.01..0.5),
        ceiling: rng.random_range(0.1..0.9),
        ec50: rng.random_range(-2.0..2.0),
        slope: rng.random_range(0.1..3.0),
    }
}

/// Parallel tempering over a ladder of Metropolis chains.
///
/// Every iteration advances each chain by one step. Every `swap_interval`
/// iterations one adjacent pair of chains is picked at random and offered a
/// state exchange. Diagnostics and samples always refer to the cold chain.
pub struct ParallelTempering {
    chains: Vec<MetropolisChain>,
    temperatures: Vec<f64>,
    data: Arc<Data>,
    priors: Priors,
    settings: TemperingSettings,
    rng: ChaCha8Rng,
    swap_accepted: u64,
    swap_total: u64,
    iterations: u64,
    state: SamplerState,
}

impl ParallelTempering {
    pub fn new(data: Data, priors: Priors, settings: TemperingSettings) -> Result<Self> {
        Self::with_stream(Arc::new(data), priors, settings, 0)
    }

    /// Build a sampler whose random numbers come from stream `stream` of the
    /// generator seeded with `settings.seed`.
    ///
    /// Samplers on distinct streams are independent and reproducible.
    pub fn with_stream(
        data: Arc<Data>,
        priors: Priors,
        settings: TemperingSettings,
        stream: u64,
    ) -> Result<Self> {
        settings.validate()?;
        if data.is_empty() {
            return Err(SamplerError::EmptyData);
        }

        let mut rng = ChaCha8Rng::seed_from_u64(settings.seed);
        rng.set_stream(stream);

        let temperatures = temperature_ladder(settings.num_chains, settings.max_temperature);
        let chains = temperatures
            .iter()
            .map(|&temperature| {
                let init = random_start(&mut rng);
                MetropolisChain::new(temperature, init, &data, &priors, settings.proposal)
            })
            .collect();

        debug!(
            num_chains = settings.num_chains,
            max_temperature = settings.max_temperature,
            seed = settings.seed,
            stream,
            observations = data.len(),
            "constructed parallel tempering sampler"
        );

        Ok(ParallelTempering {
            chains,
            temperatures,
            data,
            priors,
            settings,
            rng,
            swap_accepted: 0,
            swap_total: 0,
            iterations: 0,
            state: SamplerState::Constructed,
        })
    }

    /// Replace the random number generator with one seeded from `seed`.
    ///
    /// The stream chosen at construction is kept.
    pub fn reseed(&mut self, seed: u64) {
        let stream = self.rng.get_stream();
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self.rng.set_stream(stream);
    }

    /// Run `n_iterations` more iterations, blocking until they are done.
    ///
    /// Calling `run` again continues from the current state, and the swap
    /// schedule follows the total number of iterations so far.
    pub fn run(&mut self, n_iterations: u64) {
        self.state = SamplerState::Running;
        debug!(
            n_iterations,
            completed = self.iterations,
            "starting parallel tempering run"
        );

        if let Some(cold) = self.chains.first_mut() {
            cold.reserve(trace_reservation(n_iterations));
        }

        for _ in 0..n_iterations {
            for chain in self.chains.iter_mut() {
                chain.step(&self.data, &self.priors, &mut self.rng);
            }
            if self.chains.len() > 1 && self.iterations % self.settings.swap_interval == 0 {
                self.attempt_swap();
            }
            self.iterations += 1;
        }

        self.state = SamplerState::Completed;
        info!(
            iterations = self.iterations,
            swap_rate = self.swap_rate(),
            "parallel tempering run finished"
        );
    }

    fn attempt_swap(&mut self) {
        let i = self.rng.random_range(0..self.chains.len() - 1);
        let j = i + 1;

        let log_ratio = swap_log_ratio(
            self.chains[i].log_posterior(),
            self.chains[j].log_posterior(),
            self.temperatures[i],
            self.temperatures[j],
        );
        self.swap_total += 1;

        let accept = self.rng.random::<f64>().ln() < log_ratio;
        if accept {
            let state_i = *self.chains[i].current();
            let state_j = *self.chains[j].current();
            self.chains[i].set_current(state_j, &self.data, &self.priors);
            self.chains[j].set_current(state_i, &self.data, &self.priors);
            self.swap_accepted += 1;
        }
        trace!(
            iteration = self.iterations,
            pair = i,
            log_ratio,
            accept,
            "replica exchange"
        );
    }

    /// Trace of the cold chain, one entry per iteration.
    pub fn samples(&self) -> &[Params] {
        self.chains[0].trace()
    }

    /// Split R-hat of every parameter of the cold chain after `warmup` draws.
    pub fn rhat(&self, warmup: usize) -> [f64; 4] {
        diagnostics::rhat(self.samples(), warmup)
    }

    /// Effective sample size of every parameter of the cold chain after `warmup` draws.
    pub fn ess(&self, warmup: usize) -> [f64; 4] {
        diagnostics::ess(self.samples(), warmup)
    }

    pub fn swap_rate(&self) -> f64 {
        if self.swap_total == 0 {
            return 0.;
        }
        self.swap_accepted as f64 / self.swap_total as f64
    }

    /// Move acceptance rate of every chain, coldest first.
    pub fn acceptance_rates(&self) -> Vec<f64> {
        self.chains.iter().map(|c| c.acceptance_rate()).collect()
    }

    pub fn diagnostics(&self, warmup: usize) -> Diagnostics {
        Diagnostics {
            rhat: self.rhat(warmup),
            ess: self.ess(warmup),
            swap_rate: self.swap_rate(),
            acceptance_rates: self.acceptance_rates(),
            num_samples: self.samples().len().saturating_sub(warmup),
        }
    }

    /// Diagnostics, logging a warning for every threshold that is not met.
    pub fn check_convergence(
        &self,
        warmup: usize,
        thresholds: &ConvergenceThresholds,
    ) -> Diagnostics {
        let diagnostics = self.diagnostics(warmup);
        for warning in diagnostics.warnings(thresholds) {
            warn!(iterations = self.iterations, "{warning}");
        }
        diagnostics
    }

    /// Cold-chain trace as an arrow struct array.
    pub fn trace(&self) -> StructArray {
        let mut builder = TraceBuilder::with_capacity(self.samples().len());
        for params in self.samples() {
            builder.append_value(params);
        }
        builder.finalize()
    }

    pub fn temperatures(&self) -> &[f64] {
        &self.temperatures
    }

    pub fn num_chains(&self) -> usize {
        self.chains.len()
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn state(&self) -> SamplerState {
        self.state
    }

    pub fn swap_counts(&self) -> (u64, u64) {
        (self.swap_accepted, self.swap_total)
    }

    /// Current state of every chain, coldest first.
    pub fn chain_states(&self) -> Vec<Params> {
        self.chains.iter().map(|c| *c.current()).collect()
    }

    /// Current proposal step sizes of every chain, coldest first.
    pub fn step_sizes(&self) -> Vec<[f64; 4]> {
        self.chains.iter().map(|c| c.step_sizes()).collect()
    }

    pub fn settings(&self) -> &TemperingSettings {
        &self.settings
    }

    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn priors(&self) -> &Priors {
        &self.priors
    }
}
