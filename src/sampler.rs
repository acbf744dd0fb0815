use crate::element::Element;
use parking_lot::{Mutex, MutexGuard};
use rand::prelude::SeedableRng;
use rand_pcg::Pcg64;
use std::sync::OnceLock;

/// The one lock every evaluation shares.
///
/// Holding the guard serializes distribution sampling, execution of functions
/// that are not parallel-safe and the bookkeeping that follows a parallel
/// evaluation. Every evaluation entry point takes a `&Sampler`, so the
/// critical section is visible at each call site.
pub struct Sampler {
    rng: Mutex<Pcg64>,
}

impl Sampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(Pcg64::seed_from_u64(seed)),
        }
    }

    pub fn from_config(config: &crate::config::RunConfig) -> Self {
        Self::new(config.seed)
    }

    /// Process-wide sampler, seeded once.
    pub fn global() -> &'static Sampler {
        static GLOBAL: OnceLock<Sampler> = OnceLock::new();
        GLOBAL.get_or_init(|| Sampler::new(0x5eed))
    }

    pub fn lock(&self) -> MutexGuard<'_, Pcg64> {
        self.rng.lock()
    }

    /// Draw once from an element under the lock.
    pub fn sample(&self, element: &Element) -> f64 {
        let mut rng = self.lock();
        element.sample(&mut *rng)
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new(0)
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler").finish_non_exhaustive()
    }
}
