use rand::Rng;

use crate::{
    model::{log_posterior_tempered, Data, Params, Priors},
    proposal::{ProposalDistribution, ProposalSettings},
};

/// A random-walk Metropolis chain targeting the posterior raised to `1 / temperature`.
///
/// The chain records its current state after every step, so the trace has
/// exactly one entry per step.
#[derive(Debug, Clone)]
pub struct MetropolisChain {
    current: Params,
    current_logp: f64,
    temperature: f64,
    proposal: ProposalDistribution,
    accepted: u64,
    total: u64,
    trace: Vec<Params>,
}

impl MetropolisChain {
    pub fn new(
        temperature: f64,
        init: Params,
        data: &Data,
        priors: &Priors,
        settings: ProposalSettings,
    ) -> Self {
        MetropolisChain {
            current: init,
            current_logp: log_posterior_tempered(&init, data, priors, temperature),
            temperature,
            proposal: ProposalDistribution::new(settings),
            accepted: 0,
            total: 0,
            trace: Vec::new(),
        }
    }

    /// Perform one Metropolis step and append the resulting state to the trace.
    ///
    /// Returns whether the proposal was accepted.
    pub fn step<R: Rng + ?Sized>(&mut self, data: &Data, priors: &Priors, rng: &mut R) -> bool {
        let proposed = self.proposal.propose(&self.current, rng);
        let proposed_logp = log_posterior_tempered(&proposed, data, priors, self.temperature);

        let log_alpha = proposed_logp - self.current_logp;
        let accept = rng.random::<f64>().ln() < log_alpha;
        if accept {
            self.current = proposed;
            self.current_logp = proposed_logp;
            self.accepted += 1;
        }
        self.total += 1;
        self.trace.push(self.current);

        if self.total % self.proposal.settings().adapt_interval.max(1) == 0 {
            self.proposal.adapt(self.total, self.acceptance_rate());
        }
        accept
    }

    pub fn current(&self) -> &Params {
        &self.current
    }

    /// Replace the current state and re-evaluate it at this chain's temperature.
    ///
    /// The trace is left untouched.
    pub fn set_current(&mut self, params: Params, data: &Data, priors: &Priors) {
        self.current = params;
        self.current_logp = log_posterior_tempered(&params, data, priors, self.temperature);
    }

    /// Cached tempered log-posterior of the current state.
    pub fn log_posterior(&self) -> f64 {
        self.current_logp
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn acceptance_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.;
        }
        self.accepted as f64 / self.total as f64
    }

    pub fn num_steps(&self) -> u64 {
        self.total
    }

    pub fn step_sizes(&self) -> [f64; 4] {
        self.proposal.step_sizes()
    }

    pub fn trace(&self) -> &[Params] {
        &self.trace
    }

    pub(crate) fn reserve(&mut self, additional: usize) {
        self.trace.reserve(additional);
    }
}
