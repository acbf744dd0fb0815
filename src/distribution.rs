//! Probability distributions attached to elements, and the uncertainty
//! mappings that derive them from a nominal value.
//!
//! An [`UncertaintyMapping`] is a recipe: given a base value `v` it produces
//! distribution parameters `const[i] + v * lin[i]`, then builds the
//! [`Distribution`] of its type from them. Decision variables and function
//! outputs carry such recipes in the problem; evaluation samples from the
//! resulting distribution.
use crate::element::Element;
use crate::error::{check_size, Result};
use rand::Rng;
use rand_distr::{ChiSquared, Distribution as _, Normal};
use serde::{Deserialize, Serialize};

/// Smallest width given to a degenerate interval.
pub const MIN_INTERVAL: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistributionType {
    Uniform,
    Normal,
    ChiSquared,
    Linear,
}

impl DistributionType {
    /// Number of parameters the distribution is built from.
    pub fn n_parameters(self) -> usize {
        match self {
            DistributionType::ChiSquared => 1,
            DistributionType::Uniform | DistributionType::Normal => 2,
            DistributionType::Linear => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "DistributionRecord", from = "DistributionRecord")]
pub enum Distribution {
    Uniform { lb: f64, ub: f64 },
    Normal { mean: f64, std: f64 },
    /// Chi-squared with `dof` degrees of freedom, mirrored when `negated`.
    ChiSquared { dof: f64, negated: bool },
    /// Density rising linearly from `lb` to `ub` (or falling when not `ascend`).
    Linear { lb: f64, ub: f64, ascend: bool },
}

#[derive(Serialize, Deserialize)]
struct DistributionRecord {
    #[serde(rename = "type")]
    kind: DistributionType,
    parameters: Vec<f64>,
}

impl From<Distribution> for DistributionRecord {
    fn from(dist: Distribution) -> Self {
        Self {
            kind: dist.distribution_type(),
            parameters: dist.parameters(),
        }
    }
}

impl From<DistributionRecord> for Distribution {
    fn from(record: DistributionRecord) -> Self {
        Distribution::from_parameters(record.kind, &record.parameters)
    }
}

impl Distribution {
    pub fn uniform(lb: f64, ub: f64) -> Self {
        Self::from_parameters(DistributionType::Uniform, &[lb, ub])
    }

    pub fn normal(mean: f64, std: f64) -> Self {
        Self::from_parameters(DistributionType::Normal, &[mean, std])
    }

    pub fn chi_squared(dof: f64) -> Self {
        Self::from_parameters(DistributionType::ChiSquared, &[dof])
    }

    pub fn linear(lb: f64, ub: f64, ascend: bool) -> Self {
        let dir = if ascend { 1.0 } else { -1.0 };
        Self::from_parameters(DistributionType::Linear, &[lb, ub, dir])
    }

    /// Build a distribution from a raw parameter list, repairing invalid
    /// values instead of failing.
    pub fn from_parameters(kind: DistributionType, params: &[f64]) -> Self {
        let p = |i: usize| params.get(i).copied();
        match kind {
            DistributionType::Uniform => {
                let lb = p(0).unwrap_or(0.0);
                let ub = match p(1) {
                    Some(ub) if ub > lb => ub,
                    _ => lb + MIN_INTERVAL,
                };
                Distribution::Uniform { lb, ub }
            }
            DistributionType::Normal => {
                let mean = p(0).unwrap_or(0.0);
                let std = p(1).filter(|s| *s > 0.0).unwrap_or(1.0);
                Distribution::Normal { mean, std }
            }
            DistributionType::ChiSquared => {
                let dof = p(0).filter(|k| *k > 0.0).unwrap_or(1.0);
                let negated = p(1).is_some_and(|s| s < 0.0);
                Distribution::ChiSquared { dof, negated }
            }
            DistributionType::Linear => {
                let lb = p(0).unwrap_or(0.0);
                let (ub, ascend) = match p(1) {
                    Some(ub) if ub > lb => (ub, !p(2).is_some_and(|d| d < 0.0)),
                    _ => (lb + MIN_INTERVAL, true),
                };
                Distribution::Linear { lb, ub, ascend }
            }
        }
    }

    pub fn distribution_type(&self) -> DistributionType {
        match self {
            Distribution::Uniform { .. } => DistributionType::Uniform,
            Distribution::Normal { .. } => DistributionType::Normal,
            Distribution::ChiSquared { .. } => DistributionType::ChiSquared,
            Distribution::Linear { .. } => DistributionType::Linear,
        }
    }

    pub fn parameters(&self) -> Vec<f64> {
        match *self {
            Distribution::Uniform { lb, ub } => vec![lb, ub],
            Distribution::Normal { mean, std } => vec![mean, std],
            Distribution::ChiSquared { dof, negated } => {
                if negated {
                    vec![dof, -1.0]
                } else {
                    vec![dof]
                }
            }
            Distribution::Linear { lb, ub, ascend } => {
                vec![lb, ub, if ascend { 1.0 } else { -1.0 }]
            }
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            Distribution::Uniform { lb, ub } => {
                if ub > lb {
                    rng.random_range(lb..ub)
                } else {
                    lb
                }
            }
            Distribution::Normal { mean, std } => match Normal::new(mean, std) {
                Ok(normal) => normal.sample(rng),
                Err(_) => mean,
            },
            Distribution::ChiSquared { dof, negated } => {
                let s = match ChiSquared::new(dof) {
                    Ok(chi) => chi.sample(rng),
                    Err(_) => dof,
                };
                if negated {
                    -s
                } else {
                    s
                }
            }
            Distribution::Linear { lb, ub, ascend } => {
                let r: f64 = rng.random();
                if ascend {
                    lb + r.sqrt() * (ub - lb)
                } else {
                    ub - (1.0 - r).sqrt() * (ub - lb)
                }
            }
        }
    }

    pub fn mean(&self) -> f64 {
        match *self {
            Distribution::Uniform { lb, ub } => 0.5 * (lb + ub),
            Distribution::Normal { mean, .. } => mean,
            Distribution::ChiSquared { dof, negated } => {
                if negated {
                    -dof
                } else {
                    dof
                }
            }
            Distribution::Linear { lb, ub, ascend } => {
                if ascend {
                    lb + 2.0 * (ub - lb) / 3.0
                } else {
                    lb + (ub - lb) / 3.0
                }
            }
        }
    }

    /// Practical support of the distribution.
    pub fn bounds(&self) -> (f64, f64) {
        match *self {
            Distribution::Uniform { lb, ub } | Distribution::Linear { lb, ub, .. } => (lb, ub),
            Distribution::Normal { mean, std } => (mean - 6.0 * std, mean + 6.0 * std),
            Distribution::ChiSquared { dof, negated } => {
                // Mean plus six standard deviations covers the bulk of the tail.
                let ub = dof + 6.0 * (2.0 * dof).sqrt();
                if negated {
                    (-ub, 0.0)
                } else {
                    (0.0, ub)
                }
            }
        }
    }

    pub fn lower_bound(&self) -> f64 {
        self.bounds().0
    }

    pub fn upper_bound(&self) -> f64 {
        self.bounds().1
    }

    /// Mirror the distribution around zero.
    pub fn negate(&mut self) {
        *self = match *self {
            Distribution::Uniform { lb, ub } => Distribution::Uniform { lb: -ub, ub: -lb },
            Distribution::Normal { mean, std } => Distribution::Normal { mean: -mean, std },
            Distribution::ChiSquared { dof, negated } => Distribution::ChiSquared {
                dof,
                negated: !negated,
            },
            Distribution::Linear { lb, ub, ascend } => Distribution::Linear {
                lb: -ub,
                ub: -lb,
                ascend: !ascend,
            },
        };
    }
}

/// Rule producing a distribution from a nominal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UncertaintyMapping {
    distribution_type: DistributionType,
    const_terms: Vec<f64>,
    #[serde(default)]
    linear_terms: Vec<f64>,
}

impl UncertaintyMapping {
    /// A mapping with all constant terms at zero and no linear terms.
    pub fn new(distribution_type: DistributionType) -> Self {
        Self {
            distribution_type,
            const_terms: vec![0.0; distribution_type.n_parameters()],
            linear_terms: Vec::new(),
        }
    }

    /// Convenience for a mapping with both term vectors set.
    pub fn with_terms(
        distribution_type: DistributionType,
        const_terms: Vec<f64>,
        linear_terms: Vec<f64>,
    ) -> Result<Self> {
        let mut umap = Self::new(distribution_type);
        umap.define_const_terms(const_terms)?;
        umap.define_linear_terms(linear_terms)?;
        Ok(umap)
    }

    pub fn distribution_type(&self) -> DistributionType {
        self.distribution_type
    }

    /// Changing the type resets the terms.
    pub fn define_distribution_type(&mut self, distribution_type: DistributionType) {
        *self = Self::new(distribution_type);
    }

    pub fn n_parameters(&self) -> usize {
        self.distribution_type.n_parameters()
    }

    pub fn const_terms(&self) -> &[f64] {
        &self.const_terms
    }

    pub fn linear_terms(&self) -> &[f64] {
        &self.linear_terms
    }

    pub fn define_const_terms(&mut self, terms: Vec<f64>) -> Result<()> {
        check_size("uncertainty constant terms", self.n_parameters(), terms.len())?;
        self.const_terms = terms;
        Ok(())
    }

    pub fn define_linear_terms(&mut self, terms: Vec<f64>) -> Result<()> {
        check_size("uncertainty linear terms", self.n_parameters(), terms.len())?;
        self.linear_terms = terms;
        Ok(())
    }

    pub fn parameters(&self, value: f64) -> Vec<f64> {
        self.const_terms
            .iter()
            .enumerate()
            .map(|(i, c)| c + value * self.linear_terms.get(i).copied().unwrap_or(0.0))
            .collect()
    }

    pub fn distribution_for(&self, value: f64) -> Distribution {
        Distribution::from_parameters(self.distribution_type, &self.parameters(value))
    }

    /// Attach the distribution derived from the element's value.
    pub fn evaluate_uncertainty(&self, element: &mut Element) {
        let dist = self.distribution_for(element.value());
        element.define_distribution(Some(dist));
    }
}
