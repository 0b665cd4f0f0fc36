//! Thread-pool configuration for the algebra kernel.
//!
//! Kernels never read hidden global state: they receive a [`KernelConfig`]
//! at call time. [`KernelConfig::global`] is the process-wide default,
//! resolved once on first use (one worker per logical CPU with the `rayon`
//! feature, serial otherwise).

use crate::error::KError;
use std::sync::OnceLock;
#[cfg(feature = "rayon")]
use std::sync::Arc;

/// Operands shorter than this stay on the calling thread.
pub const DEFAULT_MIN_PARALLEL_LEN: usize = 4096;

/// Worker pool and splitting threshold handed to every kernel call.
#[derive(Clone, Debug)]
pub struct KernelConfig {
    #[cfg(feature = "rayon")]
    pool: Option<Arc<rayon::ThreadPool>>,
    threads: usize,
    /// Minimum operand length before work is split across the pool.
    pub min_parallel_len: usize,
}

static GLOBAL: OnceLock<KernelConfig> = OnceLock::new();

impl KernelConfig {
    /// Single-threaded configuration.
    pub fn serial() -> Self {
        Self {
            #[cfg(feature = "rayon")]
            pool: None,
            threads: 1,
            min_parallel_len: DEFAULT_MIN_PARALLEL_LEN,
        }
    }

    /// Configuration backed by a dedicated pool of `threads` workers.
    #[cfg(feature = "rayon")]
    pub fn with_threads(threads: usize) -> Result<Self, KError> {
        if threads <= 1 {
            return Ok(Self::serial());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| KError::ThreadPool(e.to_string()))?;
        Ok(Self {
            pool: Some(Arc::new(pool)),
            threads,
            min_parallel_len: DEFAULT_MIN_PARALLEL_LEN,
        })
    }

    /// Without the `rayon` feature every configuration is serial.
    #[cfg(not(feature = "rayon"))]
    pub fn with_threads(threads: usize) -> Result<Self, KError> {
        if threads > 1 {
            log::debug!("rayon feature disabled, ignoring request for {} threads", threads);
        }
        Ok(Self::serial())
    }

    /// Process-wide default, built on first call and never mutated afterwards.
    pub fn global() -> &'static KernelConfig {
        GLOBAL.get_or_init(Self::detect)
    }

    #[cfg(feature = "rayon")]
    fn detect() -> Self {
        let threads = num_cpus::get();
        Self::with_threads(threads).unwrap_or_else(|e| {
            log::warn!("falling back to serial kernels: {}", e);
            Self::serial()
        })
    }

    #[cfg(not(feature = "rayon"))]
    fn detect() -> Self {
        Self::serial()
    }

    /// Override the splitting threshold.
    pub fn with_min_parallel_len(mut self, len: usize) -> Self {
        self.min_parallel_len = len;
        self
    }

    /// Number of workers kernels may use.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Pool to run an operation of length `len` on, if it is worth splitting.
    #[cfg(feature = "rayon")]
    pub(crate) fn pool_for(&self, len: usize) -> Option<&rayon::ThreadPool> {
        if len >= self.min_parallel_len {
            self.pool.as_deref()
        } else {
            None
        }
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::global().clone()
    }
}
