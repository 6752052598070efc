//! Independent replicates of the whole tempering sampler.
//!
//! Each replicate runs its own ladder from its own random starting points on
//! a separate random stream, so the cold chains can be compared with the
//! multi-chain Gelman-Rubin statistic.

use std::sync::Arc;

use itertools::Itertools;
use rayon::prelude::*;
use tracing::debug;

use crate::{
    diagnostics::{multi_chain_rhat, Diagnostics},
    model::{Data, Params, Priors},
    sampler::{ParallelTempering, Result, SamplerError, TemperingSettings},
};

#[derive(Debug, Clone)]
pub struct ReplicateReport {
    /// Single-sampler diagnostics of every replicate.
    pub diagnostics: Vec<Diagnostics>,
    /// Gelman-Rubin statistic across the replicates' post-warmup cold chains.
    pub rhat: [f64; 4],
    /// Post-warmup cold-chain draws of all replicates, in replicate order.
    pub samples: Vec<Params>,
}

/// Run `num_replicates` samplers for `n_iterations` each on the rayon thread pool.
///
/// Replicate `k` draws from stream `k` of the generator seeded with
/// `settings.seed`, so the result does not depend on thread scheduling.
pub fn sample_replicates(
    data: Data,
    priors: Priors,
    settings: TemperingSettings,
    num_replicates: usize,
    n_iterations: u64,
    warmup: usize,
) -> Result<ReplicateReport> {
    if num_replicates == 0 {
        return Err(SamplerError::NoReplicates);
    }
    let data = Arc::new(data);
    let mut samplers = (0..num_replicates)
        .map(|k| ParallelTempering::with_stream(data.clone(), priors, settings, k as u64))
        .collect::<Result<Vec<_>>>()?;

    debug!(num_replicates, n_iterations, "running replicates");
    samplers
        .par_iter_mut()
        .for_each(|sampler| sampler.run(n_iterations));

    let traces = samplers
        .iter()
        .map(|s| s.samples().get(warmup..).unwrap_or(&[]))
        .collect_vec();

    Ok(ReplicateReport {
        diagnostics: samplers.iter().map(|s| s.diagnostics(warmup)).collect(),
        rhat: multi_chain_rhat(&traces),
        samples: traces.concat(),
    })
}
