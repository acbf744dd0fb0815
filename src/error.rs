use crate::element::ElementType;
use thiserror::Error;

/// Reason a problem failed validation. One variant per validation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum DefinitionError {
    #[error("the problem has no functions")]
    FunctionVec,
    #[error("decision variable maps are inconsistent")]
    DVecMaps,
    #[error("objective maps are inconsistent")]
    OVecMaps,
    #[error("parameter maps are inconsistent")]
    PVecMaps,
    #[error("constraint maps are inconsistent")]
    CVecMaps,
    #[error("unused output maps are inconsistent")]
    UVecMaps,
    #[error("box constraints do not match the decision space")]
    BoxConstraints,
    #[error("ideal vector does not match the objective space")]
    IdealVec,
    #[error("anti-ideal vector does not match the objective space")]
    AntiIdealVec,
    #[error("nadir vector does not match the objective space")]
    NadirVec,
    #[error("set-goal flags do not match the objective space")]
    SetGoalVec,
    #[error("goal vector does not match the objective space")]
    GoalVec,
    #[error("priority vector does not match the objective space")]
    PriorityVec,
    #[error("threshold vector does not match the constraint space")]
    ThresholdVec,
    #[error("decision variable uncertainties do not match the decision space")]
    UncertaintyVec,
    #[error("function output uncertainties do not match the function outputs")]
    FuncOutUncertaintyVec,
    #[error("parameter vector does not match the parameter space")]
    ParameterVec,
    #[error("external parameter links form a cycle")]
    ExternalParameters,
}

/// Errors signalling misuse of an otherwise well-formed model.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{what} index {index} is out of range (len {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("{what}: expected {expected} values, got {actual}")]
    SizeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("element type mismatch: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        expected: ElementType,
        actual: ElementType,
    },

    #[error("problem is not fully defined (status {0:?})")]
    ProblemNotDefined(crate::problem::ProblemStatus),

    #[error("inputs or outputs of function {function} could not be resolved")]
    InputOutputSizeMismatch { function: usize },

    #[error("no solution set with id {0}")]
    UnknownSet(crate::pset::SetId),

    #[error("unknown function type `{0}`")]
    UnknownFunction(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by an external function while evaluating.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("function evaluation failed: {0}")]
pub struct FunctionError(pub String);

impl FunctionError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

pub(crate) fn check_index(what: &'static str, index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(Error::IndexOutOfRange { what, index, len })
    }
}

pub(crate) fn check_size(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::SizeMismatch {
            what,
            expected,
            actual,
        })
    }
}
