use crate::error::{CompileError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for a compilation
///
/// The numeric bounds are tuning parameters, not correctness requirements:
/// exceeding a depth bound degrades to the conservative answer, and the
/// group cap only controls partition granularity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Maximum operation-usage-set cardinality for a dedicated group;
    /// shapes used more widely fall back to the base group
    pub max_group_operations: usize,

    /// Recursion bound for trait-relevance reachability
    pub relevance_depth_limit: usize,

    /// Recursion bound for container reference classification; exceeding
    /// it converts a "compact" decision into "needs reference"
    pub container_depth_limit: usize,

    /// Minimum length of a common phrase mined for multi-operation group
    /// names
    pub min_phrase_len: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_group_operations: 12,
            relevance_depth_limit: 20,
            container_depth_limit: 10,
            min_phrase_len: 3,
        }
    }
}

impl CompilerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_group_operations == 0 {
            return Err(CompileError::invalid_config(
                "max_group_operations must be > 0",
            ));
        }
        if self.relevance_depth_limit == 0 {
            return Err(CompileError::invalid_config(
                "relevance_depth_limit must be > 0",
            ));
        }
        if self.container_depth_limit == 0 {
            return Err(CompileError::invalid_config(
                "container_depth_limit must be > 0",
            ));
        }
        if self.min_phrase_len == 0 {
            return Err(CompileError::invalid_config("min_phrase_len must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = CompilerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_group_operations, 12);
        assert_eq!(config.relevance_depth_limit, 20);
        assert_eq!(config.container_depth_limit, 10);
    }

    #[test]
    fn test_config_validation() {
        let mut config = CompilerConfig::default();
        config.max_group_operations = 0;
        assert!(config.validate().is_err());

        config = CompilerConfig::default();
        config.relevance_depth_limit = 0;
        assert!(config.validate().is_err());

        config = CompilerConfig::default();
        config.min_phrase_len = 0;
        assert!(config.validate().is_err());
    }
}
