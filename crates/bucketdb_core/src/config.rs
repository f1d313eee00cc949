//! Store configuration.

/// Largest key accepted by default, in bytes.
pub const DEFAULT_MAX_KEY_SIZE: usize = 32768;

/// Largest value accepted by default, in bytes.
pub const DEFAULT_MAX_VALUE_SIZE: usize = (1 << 31) - 2;

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct Config {
    /// ID handed to the first write transaction.
    pub initial_tx_id: u64,

    /// Maximum key (and bucket name) length in bytes.
    pub max_key_size: usize,

    /// Maximum value length in bytes.
    pub max_value_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_tx_id: 1,
            max_key_size: DEFAULT_MAX_KEY_SIZE,
            max_value_size: DEFAULT_MAX_VALUE_SIZE,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the ID of the first write transaction.
    #[must_use]
    pub const fn initial_tx_id(mut self, id: u64) -> Self {
        self.initial_tx_id = id;
        self
    }

    /// Sets the maximum key size.
    #[must_use]
    pub const fn max_key_size(mut self, size: usize) -> Self {
        self.max_key_size = size;
        self
    }

    /// Sets the maximum value size.
    #[must_use]
    pub const fn max_value_size(mut self, size: usize) -> Self {
        self.max_value_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.initial_tx_id, 1);
        assert_eq!(config.max_key_size, 32768);
        assert_eq!(config.max_value_size, 2_147_483_646);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .initial_tx_id(10)
            .max_key_size(8)
            .max_value_size(16);

        assert_eq!(config.initial_tx_id, 10);
        assert_eq!(config.max_key_size, 8);
        assert_eq!(config.max_value_size, 16);
    }
}
