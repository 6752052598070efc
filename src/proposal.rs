use rand::Rng;
use rand_distr::StandardNormal;

use crate::model::Params;

/// Settings for the adaptive random-walk proposal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProposalSettings {
    /// Starting step size of every parameter.
    pub initial_step_size: f64,
    /// Step sizes are rescaled once every `adapt_interval` steps.
    pub adapt_interval: u64,
    /// Acceptance rate the adaptation steers towards.
    pub target_accept: f64,
    /// Factor applied when the acceptance rate is above the target.
    pub grow_factor: f64,
    /// Factor applied when the acceptance rate is at or below the target.
    pub shrink_factor: f64,
    pub min_step_size: f64,
    pub max_step_size: f64,
    /// Stop adapting once the chain has taken this many steps.
    ///
    /// The last update happens at the last adapt interval strictly before
    /// this step count. `None` adapts for the whole run.
    pub adapt_until: Option<u64>,
}

impl Default for ProposalSettings {
    fn default() -> Self {
        ProposalSettings {
            initial_step_size: 0.1,
            adapt_interval: 50,
            target_accept: 0.234,
            grow_factor: 1.01,
            shrink_factor: 0.99,
            min_step_size: 0.001,
            max_step_size: 1.,
            adapt_until: None,
        }
    }
}

/// Gaussian random walk with one step size per parameter.
///
/// `floor` and `ceiling` are reflected back into `(0, 1)` and `slope` is
/// reflected at zero, which keeps the proposal symmetric on the bounded
/// support.
#[derive(Debug, Clone)]
pub struct ProposalDistribution {
    step_sizes: [f64; 4],
    settings: ProposalSettings,
}

impl ProposalDistribution {
    pub fn new(settings: ProposalSettings) -> Self {
        ProposalDistribution {
            step_sizes: [settings.initial_step_size; 4],
            settings,
        }
    }

    /// A proposal with explicit step sizes, ignoring `initial_step_size`.
    pub fn with_step_sizes(settings: ProposalSettings, step_sizes: [f64; 4]) -> Self {
        ProposalDistribution {
            step_sizes,
            settings,
        }
    }

    pub fn step_sizes(&self) -> [f64; 4] {
        self.step_sizes
    }

    pub fn settings(&self) -> &ProposalSettings {
        &self.settings
    }

    pub fn propose<R: Rng + ?Sized>(&self, current: &Params, rng: &mut R) -> Params {
        let [floor_step, ceiling_step, ec50_step, slope_step] = self.step_sizes;

        let floor: f64 = current.floor + floor_step * rng.sample::<f64, _>(StandardNormal);
        let ceiling: f64 = current.ceiling + ceiling_step * rng.sample::<f64, _>(StandardNormal);
        let ec50: f64 = current.ec50 + ec50_step * rng.sample::<f64, _>(StandardNormal);
        let slope: f64 = current.slope + slope_step * rng.sample::<f64, _>(StandardNormal);

        Params {
            floor: reflect_unit(floor, current.floor),
            ceiling: reflect_unit(ceiling, current.ceiling),
            ec50,
            slope: reflect_positive(slope, current.slope),
        }
    }

    /// Rescale all step sizes from the running acceptance rate.
    ///
    /// Only acts when `iteration` is a multiple of the adapt interval and
    /// adaptation has not been frozen.
    pub fn adapt(&mut self, iteration: u64, acceptance_rate: f64) {
        if iteration.checked_rem(self.settings.adapt_interval) != Some(0) {
            return;
        }
        if let Some(limit) = self.settings.adapt_until {
            if iteration >= limit {
                return;
            }
        }
        let scale = if acceptance_rate > self.settings.target_accept {
            self.settings.grow_factor
        } else {
            self.settings.shrink_factor
        };
        for step in self.step_sizes.iter_mut() {
            *step = (*step * scale).clamp(self.settings.min_step_size, self.settings.max_step_size);
        }
    }
}

/// Fold `value` into `(0, 1)` by repeated reflection at both boundaries.
///
/// Reflection at 0 and 1 is periodic with period 2, so the fold is computed
/// directly. A value that still lands on a boundary is replaced by `fallback`.
fn reflect_unit(value: f64, fallback: f64) -> f64 {
    let folded = value.rem_euclid(2.);
    let folded = if folded > 1. { 2. - folded } else { folded };
    if folded > 0. && folded < 1. {
        folded
    } else {
        fallback
    }
}

/// Reflect `value` at zero. Zero itself is replaced by `fallback`.
fn reflect_positive(value: f64, fallback: f64) -> f64 {
    let reflected = value.abs();
    if reflected > 0. && reflected.is_finite() {
        reflected
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn reflection_folds_into_unit_interval() {
        assert_relative_eq!(reflect_unit(-0.25, 0.5), 0.25);
        assert_relative_eq!(reflect_unit(1.25, 0.5), 0.75);
        assert_relative_eq!(reflect_unit(2.25, 0.5), 0.25);
        assert_relative_eq!(reflect_unit(-1.25, 0.5), 0.75);
        assert_relative_eq!(reflect_unit(0.4, 0.5), 0.4);
        assert_eq!(reflect_unit(0., 0.5), 0.5);
        assert_eq!(reflect_unit(1., 0.5), 0.5);
        assert_eq!(reflect_unit(4., 0.5), 0.5);
        assert_eq!(reflect_unit(f64::NAN, 0.5), 0.5);
    }

    #[test]
    fn reflection_at_zero() {
        assert_eq!(reflect_positive(-1.5, 2.), 1.5);
        assert_eq!(reflect_positive(1.5, 2.), 1.5);
        assert_eq!(reflect_positive(0., 2.), 2.);
        assert_eq!(reflect_positive(f64::NEG_INFINITY, 2.), 2.);
    }

    #[test]
    fn propose_stays_in_support() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let settings = ProposalSettings::default();
        for i in 0..100_000u32 {
            let step = 10f64.powf(rng.random_range(-3.0..2.0));
            let proposal = ProposalDistribution::with_step_sizes(settings, [step; 4]);
            let current = Params::new(
                rng.random_range(0.001..0.999),
                rng.random_range(0.001..0.999),
                rng.random_range(-5.0..5.0),
                rng.random_range(0.001..10.0),
            );
            let proposed = proposal.propose(&current, &mut rng);
            assert!(proposed.in_support(), "draw {i}: {proposed:?}");
        }
    }

    #[test]
    fn proposal_is_centered_away_from_boundaries() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let proposal = ProposalDistribution::new(ProposalSettings {
            initial_step_size: 0.01,
            ..Default::default()
        });
        let current = Params::new(0.5, 0.5, 1., 5.);
        let n = 50_000;
        let mut sums = [0f64; 4];
        let mut third_moments = [0f64; 4];
        for _ in 0..n {
            let proposed = proposal.propose(&current, &mut rng).to_array();
            for (k, (&value, &center)) in proposed.iter().zip(&current.to_array()).enumerate() {
                let diff = value - center;
                sums[k] += diff;
                third_moments[k] += diff * diff * diff;
            }
        }
        for k in 0..4 {
            let mean_shift = sums[k] / n as f64;
            // Standard error of the mean is 0.01 / sqrt(n) ≈ 4.5e-5.
            assert!(mean_shift.abs() < 3e-4, "param {k}: {mean_shift}");
            let skew = third_moments[k] / n as f64 / 1e-6;
            assert!(skew.abs() < 0.1, "param {k}: {skew}");
        }
    }

    #[test]
    fn adapt_grows_and_shrinks() {
        let mut proposal = ProposalDistribution::new(ProposalSettings::default());
        proposal.adapt(50, 0.5);
        assert_relative_eq!(proposal.step_sizes()[0], 0.101, epsilon = 1e-12);
        proposal.adapt(100, 0.1);
        assert_relative_eq!(proposal.step_sizes()[3], 0.101 * 0.99, epsilon = 1e-12);
    }

    #[test]
    fn adapt_only_on_interval() {
        let mut proposal = ProposalDistribution::new(ProposalSettings::default());
        proposal.adapt(49, 0.9);
        assert_eq!(proposal.step_sizes(), [0.1; 4]);
    }

    #[test]
    fn adapt_clamps_step_sizes() {
        let settings = ProposalSettings::default();
        let mut proposal = ProposalDistribution::with_step_sizes(settings, [1.; 4]);
        proposal.adapt(50, 1.);
        assert_eq!(proposal.step_sizes(), [1.; 4]);

        let mut proposal = ProposalDistribution::with_step_sizes(settings, [0.001; 4]);
        proposal.adapt(50, 0.);
        assert_eq!(proposal.step_sizes(), [0.001; 4]);
    }

    #[test]
    fn adapt_freezes_after_limit() {
        let mut proposal = ProposalDistribution::new(ProposalSettings {
            adapt_until: Some(100),
            ..Default::default()
        });
        proposal.adapt(50, 0.9);
        let frozen = proposal.step_sizes();
        assert_relative_eq!(frozen[0], 0.101, epsilon = 1e-12);
        proposal.adapt(100, 0.9);
        assert_eq!(proposal.step_sizes(), frozen);
        proposal.adapt(150, 0.9);
        proposal.adapt(200, 0.0);
        assert_eq!(proposal.step_sizes(), frozen);
    }

    #[test]
    fn zero_interval_never_adapts() {
        let mut proposal = ProposalDistribution::new(ProposalSettings {
            adapt_interval: 0,
            ..Default::default()
        });
        proposal.adapt(0, 0.9);
        assert_eq!(proposal.step_sizes(), [0.1; 4]);
    }

    proptest! {
        #[test]
        fn unit_reflection_in_range(value in -1e6f64..1e6) {
            let folded = reflect_unit(value, 0.5);
            prop_assert!(folded > 0. && folded < 1.);
        }
    }
}
