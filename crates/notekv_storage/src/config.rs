//! Store configuration.

/// Key the allocator's high-water mark is stored under unless configured
/// otherwise. It is shorter than any partition-scoped key, so no scan ever
/// visits it.
pub const DEFAULT_ALLOCATOR_KEY: &[u8] = &[0];

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the store file if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to sync the commit log after every commit (safer but slower).
    pub sync_on_commit: bool,

    /// Key holding the persisted allocator high-water mark.
    pub allocator_key: Vec<u8>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_commit: true,
            allocator_key: DEFAULT_ALLOCATOR_KEY.to_vec(),
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the store if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to sync the commit log on every commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets the key the allocator persists its mark under.
    #[must_use]
    pub fn allocator_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.allocator_key = key.into();
        self
    }
}
