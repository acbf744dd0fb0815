use crate::distribution::Distribution;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Value domain of an element. Everything but `Real` is stored truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ElementType {
    #[default]
    Real,
    Integer,
    Ordinal,
    Nominal,
}

impl ElementType {
    /// Coerce a raw value into this domain.
    pub fn enforce(self, value: f64) -> f64 {
        match self {
            ElementType::Real => value,
            ElementType::Integer | ElementType::Ordinal | ElementType::Nominal => value.trunc(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OptimizationType {
    #[default]
    Minimization,
    Maximization,
    NonOptimization,
}

/// Descriptive metadata of one input or output.
///
/// The `id` is what ties function inputs and outputs together across the
/// problem: two functions whose inputs share an id read the same decision
/// variable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementProperties {
    #[serde(rename = "idx")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub element_type: ElementType,
    #[serde(rename = "optimizationType", default)]
    pub optimization_type: OptimizationType,
    #[serde(default)]
    pub unit: String,
}

impl ElementProperties {
    /// Properties whose name defaults to the id.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_type(mut self, element_type: ElementType) -> Self {
        self.element_type = element_type;
        self
    }

    pub fn with_optimization(mut self, optimization_type: OptimizationType) -> Self {
        self.optimization_type = optimization_type;
        self
    }

    pub fn is_maximization(&self) -> bool {
        self.optimization_type == OptimizationType::Maximization
    }
}

/// A typed scalar with an optional probability distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(rename = "type", default)]
    element_type: ElementType,
    value: f64,
    #[serde(rename = "dist", default)]
    distribution: Option<Distribution>,
}

impl Default for Element {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl From<f64> for Element {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl Element {
    pub fn new(value: f64) -> Self {
        Self {
            element_type: ElementType::Real,
            value,
            distribution: None,
        }
    }

    pub fn typed(element_type: ElementType, value: f64) -> Self {
        Self {
            element_type,
            value: element_type.enforce(value),
            distribution: None,
        }
    }

    /// The lowest representable value. Used as the "unset" marker for goals.
    pub fn lowest(element_type: ElementType) -> Self {
        Self::typed(element_type, f64::MIN)
    }

    pub fn highest(element_type: ElementType) -> Self {
        Self::typed(element_type, f64::MAX)
    }

    pub fn with_distribution(mut self, distribution: Distribution) -> Self {
        self.distribution = Some(distribution);
        self
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn define_value(&mut self, value: f64) {
        self.value = self.element_type.enforce(value);
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn define_type(&mut self, element_type: ElementType) {
        self.element_type = element_type;
        self.value = element_type.enforce(self.value);
    }

    pub fn distribution(&self) -> Option<&Distribution> {
        self.distribution.as_ref()
    }

    pub fn define_distribution(&mut self, distribution: Option<Distribution>) {
        self.distribution = distribution;
    }

    pub fn is_lowest(&self) -> bool {
        self.value <= f64::MIN
    }

    pub fn is_highest(&self) -> bool {
        self.value >= f64::MAX
    }

    /// Draw from the attached distribution, or return the value itself.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match &self.distribution {
            Some(dist) => self.element_type.enforce(dist.sample(rng)),
            None => self.value,
        }
    }

    /// Flip the sign of the value and of the distribution.
    pub fn negate(&mut self) {
        self.value = -self.value;
        if let Some(dist) = &mut self.distribution {
            dist.negate();
        }
    }
}

/// Plain values of a slice of elements.
pub fn values(elements: &[Element]) -> Vec<f64> {
    elements.iter().map(Element::value).collect()
}
