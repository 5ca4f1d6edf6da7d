use crate::error::AdaptdbError;

/// Runtime configuration for an adaptdb instance.
#[derive(Debug, Clone)]
pub struct AdaptdbConfig {
    /// Fixed capacity of every tile group allocated by a table.
    pub tuples_per_tile_group: usize,
    /// When true, a key-bound predicate the index cannot serve fails the scan
    /// instead of degrading to a full brute-force pass.
    pub strict_index_predicates: bool,
    /// Sleep between builder rounds once the builder has caught up with the
    /// table's tile-group count.
    pub builder_idle_backoff_ms: u64,
    /// Slots in each per-worker log buffer ring.
    pub log_buffer_queue_size: usize,
    /// Byte capacity of a freshly allocated log buffer.
    pub log_buffer_capacity_bytes: usize,
}

impl Default for AdaptdbConfig {
    fn default() -> Self {
        Self {
            tuples_per_tile_group: 1000,
            strict_index_predicates: false,
            builder_idle_backoff_ms: 1,
            log_buffer_queue_size: 16,
            log_buffer_capacity_bytes: 4096,
        }
    }
}

impl AdaptdbConfig {
    /// Profile for analytical sessions that would rather see a query error
    /// than silently pay for a table-wide scan.
    pub fn strict() -> Self {
        Self {
            strict_index_predicates: true,
            ..Self::default()
        }
    }

    pub fn with_tuples_per_tile_group(mut self, capacity: usize) -> Self {
        self.tuples_per_tile_group = capacity;
        self
    }

    pub fn validate(&self) -> Result<(), AdaptdbError> {
        if self.tuples_per_tile_group == 0 {
            return Err(AdaptdbError::InvalidConfig {
                message: "tuples_per_tile_group must be at least 1".into(),
            });
        }
        if self.log_buffer_queue_size == 0 {
            return Err(AdaptdbError::InvalidConfig {
                message: "log_buffer_queue_size must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::AdaptdbConfig;
    use crate::error::AdaptdbErrorCode;

    #[test]
    fn default_config_is_valid() {
        let config = AdaptdbConfig::default();
        config.validate().expect("default config");
        assert_eq!(config.tuples_per_tile_group, 1000);
        assert!(!config.strict_index_predicates);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let config = AdaptdbConfig::default().with_tuples_per_tile_group(0);
        let err = config.validate().expect_err("zero capacity");
        assert_eq!(err.code(), AdaptdbErrorCode::InvalidConfig);
    }
}
