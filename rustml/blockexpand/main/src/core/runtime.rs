use crate::api::error::{BlockExpandError, BlockExpandResult};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Element count at which expand/accumulate switch from sequential to
/// per-example parallel (rayon).
pub(crate) static EXPAND_PAR_THRESHOLD: AtomicUsize = AtomicUsize::new(4096);

pub(crate) fn expand_par_threshold() -> usize {
    EXPAND_PAR_THRESHOLD.load(Ordering::Relaxed)
}

/// Runtime configuration for parallelism and thread management.
/// Must be applied (via `apply()`) before any computation to take effect.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Number of rayon threads. 0 keeps rayon's default (all cores).
    pub num_threads: usize,
    /// Expanded-matrix element count below which the sequential path is used (default 4096).
    pub expand_par_threshold: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            num_threads: 0,
            expand_par_threshold: 4096,
        }
    }
}

impl RuntimeConfig {
    /// Apply this runtime configuration globally.
    ///
    /// Builds rayon's global thread pool when `num_threads` is set; that can
    /// only happen once per process.
    pub fn apply(&self) -> BlockExpandResult<()> {
        if self.num_threads > 0 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(self.num_threads)
                .build_global()
                .map_err(|e| {
                    BlockExpandError::InvalidConfig(format!("Failed to set rayon thread pool: {}", e))
                })?;
        }

        EXPAND_PAR_THRESHOLD.store(self.expand_par_threshold, Ordering::Relaxed);

        log::info!(
            "[runtime] rayon threads: {}, expand parallel threshold: {}",
            rayon::current_num_threads(),
            self.expand_par_threshold
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threshold() {
        let config = RuntimeConfig::default();
        assert_eq!(config.num_threads, 0);
        assert_eq!(config.expand_par_threshold, 4096);
    }

    #[test]
    fn test_apply_sets_threshold() {
        let config = RuntimeConfig::default();
        config.apply().unwrap();
        assert_eq!(expand_par_threshold(), 4096);
    }
}
