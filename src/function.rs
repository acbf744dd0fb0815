use crate::element::{Element, ElementProperties};
use crate::error::{check_index, check_size, FunctionError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lower and upper bounds over a vector of variables.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoxConstraints {
    lower: Vec<Element>,
    upper: Vec<Element>,
}

impl BoxConstraints {
    pub fn new(lower: Vec<Element>, upper: Vec<Element>) -> Result<Self> {
        check_size("box constraint upper bounds", lower.len(), upper.len())?;
        Ok(Self { lower, upper })
    }

    /// Unit bounds `[0, 1]` typed after each property.
    pub fn from_properties(props: &[ElementProperties]) -> Self {
        Self {
            lower: props
                .iter()
                .map(|p| Element::typed(p.element_type, 0.0))
                .collect(),
            upper: props
                .iter()
                .map(|p| Element::typed(p.element_type, 1.0))
                .collect(),
        }
    }

    pub fn from_values(lower: &[f64], upper: &[f64]) -> Result<Self> {
        Self::new(
            lower.iter().copied().map(Element::new).collect(),
            upper.iter().copied().map(Element::new).collect(),
        )
    }

    pub fn size(&self) -> usize {
        self.lower.len()
    }

    pub fn lower_bounds(&self) -> &[Element] {
        &self.lower
    }

    pub fn upper_bounds(&self) -> &[Element] {
        &self.upper
    }

    pub fn lower_bound(&self, idx: usize) -> Option<&Element> {
        self.lower.get(idx)
    }

    pub fn upper_bound(&self, idx: usize) -> Option<&Element> {
        self.upper.get(idx)
    }

    pub fn define_lower_bound(&mut self, idx: usize, bound: Element) -> Result<()> {
        check_index("lower bound", idx, self.lower.len())?;
        self.lower[idx] = bound;
        Ok(())
    }

    pub fn define_upper_bound(&mut self, idx: usize, bound: Element) -> Result<()> {
        check_index("upper bound", idx, self.upper.len())?;
        self.upper[idx] = bound;
        Ok(())
    }

    pub fn define_lower_bounds(&mut self, bounds: Vec<Element>) -> Result<()> {
        check_size("lower bounds", self.upper.len(), bounds.len())?;
        self.lower = bounds;
        Ok(())
    }

    pub fn define_upper_bounds(&mut self, bounds: Vec<Element>) -> Result<()> {
        check_size("upper bounds", self.lower.len(), bounds.len())?;
        self.upper = bounds;
        Ok(())
    }

    /// Re-type every bound after the matching property.
    pub fn retype(&mut self, props: &[ElementProperties]) {
        for (bound, p) in self.lower.iter_mut().zip(props) {
            bound.define_type(p.element_type);
        }
        for (bound, p) in self.upper.iter_mut().zip(props) {
            bound.define_type(p.element_type);
        }
    }

    /// Clamp `value` into the bounds of variable `idx`. Out-of-range indices
    /// leave the value untouched.
    pub fn truncate(&self, idx: usize, value: f64) -> f64 {
        match (self.lower.get(idx), self.upper.get(idx)) {
            (Some(lb), Some(ub)) => value.max(lb.value()).min(ub.value()),
            _ => value,
        }
    }

    pub fn midpoint(&self, idx: usize) -> Option<f64> {
        Some(0.5 * (self.lower.get(idx)?.value() + self.upper.get(idx)?.value()))
    }
}

/// A black-box evaluation supplied from outside the core.
///
/// Implementors declare their inputs and outputs through properties. The
/// problem wires them into the unified spaces by property id.
pub trait Function: Send + Sync {
    /// Kind used to recreate the function when importing a problem.
    fn type_name(&self) -> &str;

    fn path(&self) -> &str {
        ""
    }

    /// Free-form properties exported alongside the function.
    fn properties(&self) -> Map<String, Value> {
        Map::new()
    }

    fn input_properties(&self) -> &[ElementProperties];
    fn output_properties(&self) -> &[ElementProperties];

    fn n_inputs(&self) -> usize {
        self.input_properties().len()
    }

    fn n_outputs(&self) -> usize {
        self.output_properties().len()
    }

    /// The function's own bounds, one per input.
    fn bounds(&self) -> &BoxConstraints;

    /// Whether the function may run concurrently with other evaluations.
    fn parallel_safe(&self) -> bool {
        true
    }

    fn evaluate(&self, inputs: &[f64], outputs: &mut [f64]) -> std::result::Result<(), FunctionError>;
}

/// [`Function`] backed by a closure.
pub struct ClosureFunction<F> {
    type_name: String,
    path: String,
    properties: Map<String, Value>,
    inputs: Vec<ElementProperties>,
    outputs: Vec<ElementProperties>,
    bounds: BoxConstraints,
    parallel_safe: bool,
    f: F,
}

impl<F> ClosureFunction<F>
where
    F: Fn(&[f64], &mut [f64]) -> std::result::Result<(), FunctionError> + Send + Sync,
{
    pub fn new(
        type_name: impl Into<String>,
        inputs: Vec<ElementProperties>,
        outputs: Vec<ElementProperties>,
        f: F,
    ) -> Self {
        let bounds = BoxConstraints::from_properties(&inputs);
        Self {
            type_name: type_name.into(),
            path: String::new(),
            properties: Map::new(),
            inputs,
            outputs,
            bounds,
            parallel_safe: true,
            f,
        }
    }

    pub fn with_bounds(mut self, bounds: BoxConstraints) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_properties(mut self, properties: Map<String, Value>) -> Self {
        self.properties = properties;
        self
    }

    pub fn serial_only(mut self) -> Self {
        self.parallel_safe = false;
        self
    }
}

impl<F> Function for ClosureFunction<F>
where
    F: Fn(&[f64], &mut [f64]) -> std::result::Result<(), FunctionError> + Send + Sync,
{
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn properties(&self) -> Map<String, Value> {
        self.properties.clone()
    }

    fn input_properties(&self) -> &[ElementProperties] {
        &self.inputs
    }

    fn output_properties(&self) -> &[ElementProperties] {
        &self.outputs
    }

    fn bounds(&self) -> &BoxConstraints {
        &self.bounds
    }

    fn parallel_safe(&self) -> bool {
        self.parallel_safe
    }

    fn evaluate(&self, inputs: &[f64], outputs: &mut [f64]) -> std::result::Result<(), FunctionError> {
        (self.f)(inputs, outputs)
    }
}
