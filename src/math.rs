//! Closed-form log-densities used by the posterior.
//!
//! Every density returns `f64::NEG_INFINITY` outside its support instead of
//! an error, so callers can treat an out-of-support proposal as a point of
//! zero posterior density.

use std::f64::consts::SQRT_2;

use statrs::function::erf::erfc;

/// `0.5 * ln(2π)`
const HALF_LN_TWO_PI: f64 = 0.918_938_533_204_672_8;

#[inline]
pub fn sigmoid(x: f64) -> f64 {
    1. / (1. + (-x).exp())
}

/// Unnormalized Beta log-density.
///
/// The normalizing constant is dropped, it cancels in every Metropolis ratio.
#[inline]
pub fn log_beta(x: f64, alpha: f64, beta: f64) -> f64 {
    if !(x > 0. && x < 1.) {
        return f64::NEG_INFINITY;
    }
    (alpha - 1.) * x.ln() + (beta - 1.) * (-x).ln_1p()
}

#[inline]
pub fn log_normal(x: f64, mean: f64, sd: f64) -> f64 {
    let z = (x - mean) / sd;
    -0.5 * z * z - sd.ln() - HALF_LN_TWO_PI
}

/// Normal log-density truncated to `(0, ∞)`.
///
/// The normalizer is the upper-tail mass `P(X > 0) = erfc(-mean / (sd√2)) / 2`.
#[inline]
pub fn log_truncated_normal(x: f64, mean: f64, sd: f64) -> f64 {
    if !(x > 0.) {
        return f64::NEG_INFINITY;
    }
    let upper_mass = 0.5 * erfc(-mean / (sd * SQRT_2));
    let log_mass = upper_mass.ln();
    if !log_mass.is_finite() {
        return f64::NEG_INFINITY;
    }
    log_normal(x, mean, sd) - log_mass
}

#[inline]
pub fn log_bernoulli(outcome: bool, p: f64) -> f64 {
    if !(p > 0. && p < 1.) {
        return f64::NEG_INFINITY;
    }
    if outcome {
        p.ln()
    } else {
        (-p).ln_1p()
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance with the `n - 1` denominator.
pub(crate) fn sample_variance(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.;
    }
    let sum_sq: f64 = values.iter().map(|&x| (x - mean) * (x - mean)).sum();
    sum_sq / (values.len() - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::f64::consts::PI;

    #[test]
    fn half_ln_two_pi_constant() {
        assert_relative_eq!(HALF_LN_TWO_PI, 0.5 * (2. * PI).ln(), epsilon = 1e-15);
    }

    #[test]
    fn beta_outside_support() {
        for x in [0., 1., -1e-12, 1. + 1e-12, -3., 7., f64::NAN] {
            assert_eq!(log_beta(x, 2., 3.), f64::NEG_INFINITY);
        }
        for x in [1e-12, 0.5, 1. - 1e-12] {
            assert!(log_beta(x, 2., 3.).is_finite());
        }
    }

    #[test]
    fn beta_matches_closed_form() {
        let x: f64 = 0.3;
        let expected = 1. * x.ln() + 2. * (1. - x).ln();
        assert_relative_eq!(log_beta(x, 2., 3.), expected, epsilon = 1e-12);
        assert_eq!(log_beta(0.7, 1., 1.), 0.);
    }

    #[test]
    fn normal_standard_values() {
        assert_relative_eq!(log_normal(0., 0., 1.), -HALF_LN_TWO_PI, epsilon = 1e-12);
        assert_relative_eq!(
            log_normal(3., 1., 2.),
            -0.5 - 2f64.ln() - HALF_LN_TWO_PI,
            epsilon = 1e-12
        );
    }

    #[test]
    fn truncated_normal_outside_support() {
        for x in [0., -1e-300, -1., f64::NAN] {
            assert_eq!(log_truncated_normal(x, 1., 1.), f64::NEG_INFINITY);
        }
        for x in [1e-300, 1e-12, 0.5, 10.] {
            assert!(log_truncated_normal(x, 1., 1.).is_finite());
        }
    }

    #[test]
    fn truncated_normal_at_zero_mean_doubles_density() {
        // Half of the mass lies above zero when the mean is zero.
        let x = 0.8;
        assert_relative_eq!(
            log_truncated_normal(x, 0., 1.5),
            log_normal(x, 0., 1.5) + 2f64.ln(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn bernoulli_probabilities() {
        assert_relative_eq!(log_bernoulli(true, 0.25), 0.25f64.ln(), epsilon = 1e-15);
        assert_relative_eq!(log_bernoulli(false, 0.25), 0.75f64.ln(), epsilon = 1e-15);
        for p in [0., 1., -0.1, 1.1, f64::NAN] {
            assert_eq!(log_bernoulli(true, p), f64::NEG_INFINITY);
            assert_eq!(log_bernoulli(false, p), f64::NEG_INFINITY);
        }
    }

    #[test]
    fn variance_of_short_series() {
        assert_eq!(sample_variance(&[], 0.), 0.);
        assert_eq!(sample_variance(&[3.], 3.), 0.);
        assert_relative_eq!(sample_variance(&[1., 2., 3., 4.], 2.5), 5. / 3., epsilon = 1e-12);
    }

    proptest! {
        #[test]
        fn sigmoid_is_bounded(x in -700f64..700f64) {
            let s = sigmoid(x);
            prop_assert!((0.0..=1.0).contains(&s));
            prop_assert!((s + sigmoid(-x) - 1.).abs() < 1e-12);
        }

        #[test]
        fn beta_finite_inside(x in 1e-9f64..(1. - 1e-9), a in 0.1f64..20., b in 0.1f64..20.) {
            prop_assert!(log_beta(x, a, b).is_finite());
        }
    }
}
