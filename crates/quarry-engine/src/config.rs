//! Database configuration.

use std::fmt;

use quarry_common::utils::error::Error;
use quarry_core::execution::{DEFAULT_VECTOR_SIZE, MAX_VECTOR_SIZE};
use quarry_core::execution::parallel::DEFAULT_MIN_GRAIN_SIZE;
use quarry_core::storage::DEFAULT_BLOCK_SIZE;

/// Errors from [`Config::validate()`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Memory limit must be greater than zero.
    ZeroMemoryLimit,
    /// Thread count must be greater than zero.
    ZeroThreads,
    /// Vector size must be greater than zero.
    ZeroVectorSize,
    /// Vector size is above the supported maximum.
    VectorSizeTooLarge(usize),
    /// Minimum grain size must be greater than zero.
    ZeroGrainSize,
    /// Block size must be greater than zero.
    ZeroBlockSize,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroMemoryLimit => write!(f, "memory_limit must be greater than zero"),
            Self::ZeroThreads => write!(f, "threads must be greater than zero"),
            Self::ZeroVectorSize => write!(f, "vector_size must be greater than zero"),
            Self::VectorSizeTooLarge(size) => {
                write!(f, "vector_size {size} exceeds the maximum of {MAX_VECTOR_SIZE}")
            }
            Self::ZeroGrainSize => write!(f, "min_grain_size must be greater than zero"),
            Self::ZeroBlockSize => write!(f, "block_size must be greater than zero"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}

/// Database configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of worker threads for parallel scans.
    pub threads: usize,

    /// Maximum rows per scan batch.
    pub vector_size: usize,

    /// Minimum number of blocks per parallel scan partition.
    pub min_grain_size: usize,

    /// Derive the grain from table size and thread count.
    ///
    /// When enabled, the grain is `max(min_grain_size, blocks / (threads * 4))`,
    /// giving every worker a few partitions regardless of table size.
    pub adaptive_grain: bool,

    /// Tuple slots per storage block.
    pub block_size: u32,

    /// Memory limit in bytes for scan buffers (None for unlimited).
    pub memory_limit: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threads: num_cpus::get(),
            vector_size: DEFAULT_VECTOR_SIZE,
            min_grain_size: DEFAULT_MIN_GRAIN_SIZE,
            adaptive_grain: false,
            block_size: DEFAULT_BLOCK_SIZE,
            memory_limit: None,
        }
    }
}

impl Config {
    /// Creates a new configuration with default settings.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Sets the memory limit.
    #[must_use]
    pub fn with_memory_limit(mut self, limit: usize) -> Self {
        self.memory_limit = Some(limit);
        self
    }

    /// Sets the number of worker threads.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Sets the batch capacity.
    #[must_use]
    pub fn with_vector_size(mut self, vector_size: usize) -> Self {
        self.vector_size = vector_size;
        self
    }

    /// Sets the minimum grain size.
    #[must_use]
    pub fn with_min_grain_size(mut self, grain: usize) -> Self {
        self.min_grain_size = grain;
        self
    }

    /// Enables grain derivation from table size and thread count.
    #[must_use]
    pub fn with_adaptive_grain(mut self) -> Self {
        self.adaptive_grain = true;
        self
    }

    /// Sets the number of tuple slots per block.
    #[must_use]
    pub fn with_block_size(mut self, block_size: u32) -> Self {
        self.block_size = block_size;
        self
    }

    /// Validates the configuration.
    ///
    /// Called automatically by [`Database::new()`](crate::Database::new).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any setting is invalid.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if let Some(limit) = self.memory_limit
            && limit == 0
        {
            return Err(ConfigError::ZeroMemoryLimit);
        }

        if self.threads == 0 {
            return Err(ConfigError::ZeroThreads);
        }

        if self.vector_size == 0 {
            return Err(ConfigError::ZeroVectorSize);
        }

        if self.vector_size > MAX_VECTOR_SIZE {
            return Err(ConfigError::VectorSizeTooLarge(self.vector_size));
        }

        if self.min_grain_size == 0 {
            return Err(ConfigError::ZeroGrainSize);
        }

        if self.block_size == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }

        Ok(())
    }
}

/// Helper function to get CPU count (fallback implementation).
mod num_cpus {
    pub fn get() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.threads > 0);
        assert_eq!(config.vector_size, 2048);
        assert_eq!(config.min_grain_size, 3);
        assert_eq!(config.block_size, 1024);
        assert!(config.memory_limit.is_none());
        assert!(!config.adaptive_grain);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builders() {
        let config = Config::in_memory()
            .with_threads(8)
            .with_vector_size(512)
            .with_min_grain_size(2)
            .with_block_size(64)
            .with_memory_limit(1024 * 1024)
            .with_adaptive_grain();

        assert_eq!(config.threads, 8);
        assert_eq!(config.vector_size, 512);
        assert_eq!(config.min_grain_size, 2);
        assert_eq!(config.block_size, 64);
        assert_eq!(config.memory_limit, Some(1024 * 1024));
        assert!(config.adaptive_grain);
    }

    #[test]
    fn test_validate_zero_memory_limit() {
        let config = Config::in_memory().with_memory_limit(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroMemoryLimit));
    }

    #[test]
    fn test_validate_zero_threads() {
        let config = Config::in_memory().with_threads(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroThreads));
    }

    #[test]
    fn test_validate_zero_sizes() {
        assert_eq!(
            Config::in_memory().with_vector_size(0).validate(),
            Err(ConfigError::ZeroVectorSize)
        );
        assert_eq!(
            Config::in_memory().with_min_grain_size(0).validate(),
            Err(ConfigError::ZeroGrainSize)
        );
        assert_eq!(
            Config::in_memory().with_block_size(0).validate(),
            Err(ConfigError::ZeroBlockSize)
        );
    }

    #[test]
    fn test_validate_vector_size_upper_bound() {
        assert!(Config::in_memory().with_vector_size(MAX_VECTOR_SIZE).validate().is_ok());
        assert_eq!(
            Config::in_memory().with_vector_size(MAX_VECTOR_SIZE + 1).validate(),
            Err(ConfigError::VectorSizeTooLarge(MAX_VECTOR_SIZE + 1))
        );
        assert_eq!(
            Config::in_memory().with_vector_size(usize::MAX).validate(),
            Err(ConfigError::VectorSizeTooLarge(usize::MAX))
        );
    }

    #[test]
    fn test_config_error_display() {
        assert_eq!(
            ConfigError::ZeroThreads.to_string(),
            "threads must be greater than zero"
        );
        let err: Error = ConfigError::ZeroBlockSize.into();
        assert_eq!(
            err.to_string(),
            "invalid configuration: block_size must be greater than zero"
        );
    }
}
