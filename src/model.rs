//! The four-parameter logistic model, its priors and the observed data.
//!
//! The posterior is fixed: Beta priors on `floor` and `ceiling`, a Normal
//! prior on `ec50`, a Normal prior truncated at zero on `slope`, and a
//! Bernoulli likelihood for each observed outcome.

use std::fmt;

use itertools::izip;

use crate::math::{log_bernoulli, log_beta, log_normal, log_truncated_normal, sigmoid};
use crate::sampler::{Result, SamplerError};

/// Identifies one of the four model parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Floor,
    Ceiling,
    Ec50,
    Slope,
}

impl ParamKind {
    /// All parameters, in the order used by every `[f64; 4]` in this crate.
    pub const ALL: [ParamKind; 4] = [
        ParamKind::Floor,
        ParamKind::Ceiling,
        ParamKind::Ec50,
        ParamKind::Slope,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ParamKind::Floor => "floor",
            ParamKind::Ceiling => "ceiling",
            ParamKind::Ec50 => "ec50",
            ParamKind::Slope => "slope",
        }
    }

    pub fn index(self) -> usize {
        match self {
            ParamKind::Floor => 0,
            ParamKind::Ceiling => 1,
            ParamKind::Ec50 => 2,
            ParamKind::Slope => 3,
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One point in parameter space: a posterior draw or a chain's current state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Params {
    /// Fraction of the maximum risk that remains at high titre, in `(0, 1)`.
    pub floor: f64,
    /// Maximum infection probability at low titre, in `(0, 1)`.
    pub ceiling: f64,
    /// Titre at the inflection point of the curve.
    pub ec50: f64,
    /// Steepness of the curve, positive.
    pub slope: f64,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            floor: 0.5,
            ceiling: 0.5,
            ec50: 0.,
            slope: 1.,
        }
    }
}

impl Params {
    pub fn new(floor: f64, ceiling: f64, ec50: f64, slope: f64) -> Self {
        Params {
            floor,
            ceiling,
            ec50,
            slope,
        }
    }

    pub fn get(&self, kind: ParamKind) -> f64 {
        match kind {
            ParamKind::Floor => self.floor,
            ParamKind::Ceiling => self.ceiling,
            ParamKind::Ec50 => self.ec50,
            ParamKind::Slope => self.slope,
        }
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.floor, self.ceiling, self.ec50, self.slope]
    }

    pub fn from_array(values: [f64; 4]) -> Self {
        let [floor, ceiling, ec50, slope] = values;
        Params::new(floor, ceiling, ec50, slope)
    }

    /// Whether the point lies in the open support of the model.
    pub fn in_support(&self) -> bool {
        self.floor > 0.
            && self.floor < 1.
            && self.ceiling > 0.
            && self.ceiling < 1.
            && self.ec50.is_finite()
            && self.slope > 0.
            && self.slope.is_finite()
    }
}

/// Prior hyperparameters. Set once per run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Priors {
    pub floor_alpha: f64,
    pub floor_beta: f64,
    pub ceiling_alpha: f64,
    pub ceiling_beta: f64,
    pub ec50_mean: f64,
    pub ec50_sd: f64,
    /// Location of the Normal prior on `slope` before truncation at zero.
    pub slope_mean: f64,
    pub slope_sd: f64,
}

impl Default for Priors {
    fn default() -> Self {
        Priors {
            floor_alpha: 1.,
            floor_beta: 1.,
            ceiling_alpha: 1.,
            ceiling_beta: 1.,
            ec50_mean: 0.,
            ec50_sd: 1.,
            slope_mean: 1.,
            slope_sd: 1.,
        }
    }
}

/// Observed titres and binary outcomes.
///
/// The two columns always have the same, non-zero length.
#[derive(Debug, Clone, PartialEq)]
pub struct Data {
    titre: Vec<f64>,
    outcome: Vec<bool>,
}

impl Data {
    pub fn new(titre: Vec<f64>, outcome: Vec<bool>) -> Result<Self> {
        if titre.len() != outcome.len() {
            return Err(SamplerError::LengthMismatch {
                titre: titre.len(),
                outcome: outcome.len(),
            });
        }
        if titre.is_empty() {
            return Err(SamplerError::EmptyData);
        }
        Ok(Data { titre, outcome })
    }

    /// Build a dataset from 0/1 outcome indicators.
    pub fn from_indicators(titre: Vec<f64>, outcome: &[u8]) -> Result<Self> {
        let outcome = outcome
            .iter()
            .enumerate()
            .map(|(index, &value)| match value {
                0 => Ok(false),
                1 => Ok(true),
                _ => Err(SamplerError::InvalidOutcome { index, value }),
            })
            .collect::<Result<Vec<_>>>()?;
        Data::new(titre, outcome)
    }

    pub fn len(&self) -> usize {
        self.titre.len()
    }

    /// Always false, empty datasets are rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.titre.is_empty()
    }

    pub fn titre(&self) -> &[f64] {
        &self.titre
    }

    pub fn outcome(&self) -> &[bool] {
        &self.outcome
    }
}

/// Infection probability at `titre` under the four-parameter logistic curve.
#[inline]
pub fn response_probability(titre: f64, params: &Params) -> f64 {
    let decay = sigmoid(-params.slope * (titre - params.ec50));
    params.ceiling * (decay * (1. - params.floor) + params.floor)
}

/// Sum of the four prior log-densities, `-inf` as soon as one term is.
pub fn log_prior(params: &Params, priors: &Priors) -> f64 {
    let terms = [
        log_beta(params.floor, priors.floor_alpha, priors.floor_beta),
        log_beta(params.ceiling, priors.ceiling_alpha, priors.ceiling_beta),
        log_normal(params.ec50, priors.ec50_mean, priors.ec50_sd),
        log_truncated_normal(params.slope, priors.slope_mean, priors.slope_sd),
    ];
    let mut total = 0.;
    for term in terms {
        if !term.is_finite() {
            return f64::NEG_INFINITY;
        }
        total += term;
    }
    total
}

pub fn log_likelihood(params: &Params, data: &Data) -> f64 {
    let mut total = 0.;
    for (&titre, &outcome) in izip!(data.titre(), data.outcome()) {
        total += log_bernoulli(outcome, response_probability(titre, params));
        if !total.is_finite() {
            return f64::NEG_INFINITY;
        }
    }
    total
}

/// `log_prior + log_likelihood / temperature`.
///
/// The likelihood is not evaluated when the prior already rejects the point.
pub fn log_posterior_tempered(
    params: &Params,
    data: &Data,
    priors: &Priors,
    temperature: f64,
) -> f64 {
    let prior = log_prior(params, priors);
    if !prior.is_finite() {
        return f64::NEG_INFINITY;
    }
    let likelihood = log_likelihood(params, data);
    if !likelihood.is_finite() {
        return f64::NEG_INFINITY;
    }
    prior + likelihood / temperature
}
