use serde::{Deserialize, Serialize};

/// Run-level settings handed to a [`PSet`](crate::pset::PSet) and its
/// [`Sampler`](crate::sampler::Sampler).
///
/// A zero `budget` or `max_iterations` means "no limit on that axis"; with
/// both at zero a run is considered terminated from the start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub budget: usize,
    pub max_iterations: usize,
    pub keep_archive: bool,
    pub seed: u64,
    /// Prefer `parallel_evaluate` over `evaluate` when driving mappings.
    pub parallel: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            budget: 0,
            max_iterations: 0,
            keep_archive: true,
            seed: 42,
            parallel: cfg!(feature = "parallel"),
        }
    }
}

impl RunConfig {
    pub fn from_json_str(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
