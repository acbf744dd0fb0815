pub mod config;
pub mod distribution;
pub mod dominance;
pub mod element;
pub mod error;
pub mod exchange;
pub mod function;
pub mod mapping;
pub mod problem;
pub mod pset;
pub mod sampler;
pub mod set;

pub use config::RunConfig;
pub use distribution::{Distribution, DistributionType, UncertaintyMapping};
pub use dominance::Dominance;
pub use element::{Element, ElementProperties, ElementType, OptimizationType};
pub use error::{DefinitionError, Error, FunctionError, Result};
pub use function::{BoxConstraints, ClosureFunction, Function};
pub use mapping::{Mapping, MappingRef};
pub use problem::{Maps, Problem, ProblemStatus, Space};
pub use pset::{ArchiveUpdate, PSet, SetId};
pub use sampler::Sampler;
pub use set::SolutionSet;
