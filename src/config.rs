//! Server Configuration
//!
//! Central configuration for KVMemo. The struct carries explicit defaults
//! that are safe for development, and `validate()` is called once during
//! startup before any component is constructed. There is no global mutable
//! state; the config is passed explicitly to the engine and the server.

use crate::error::{KvError, KvResult};

/// How keys are chosen for eviction when the memory budget is exceeded.
///
/// TTL expiry is not an eviction policy; it is separate expiration logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicyKind {
    /// Evict the least recently used key first.
    #[default]
    Lru,
    /// Never evict. Under sustained pressure the engine logs and keeps
    /// accepting writes.
    None,
}

impl EvictionPolicyKind {
    /// Parses a policy name as given on the command line.
    pub fn parse(name: &str) -> KvResult<Self> {
        match name {
            "lru" => Ok(EvictionPolicyKind::Lru),
            "none" => Ok(EvictionPolicyKind::None),
            other => Err(KvError::invalid_argument(format!(
                "unknown eviction policy '{other}' (expected 'lru' or 'none')"
            ))),
        }
    }
}

/// Central configuration object for KVMemo.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host the TCP server binds to.
    pub listen_host: String,

    /// Port the TCP server listens on.
    pub listen_port: u16,

    /// Number of independent shards for the in-memory store. Must be a
    /// power of two so shard selection can use bit masking.
    pub shard_count: usize,

    /// Maximum number of entries a single shard holds. Exceeding it evicts
    /// the shard's least recently used key.
    pub shard_capacity: usize,

    /// Global memory budget in bytes across all shards. When exceeded,
    /// eviction is triggered based on the configured policy.
    pub max_memory_bytes: usize,

    /// Maximum size of a single stored value in bytes. Protects against
    /// pathological payloads; oversized values are rejected.
    pub max_value_bytes: usize,

    /// Soft limit on simultaneous client connections; excess connections
    /// are rejected at accept time.
    pub max_connections: usize,

    /// Enables TTL support. When disabled, a `SET ... PX` is rejected and
    /// no sweeper runs.
    pub enable_ttl: bool,

    /// Interval in milliseconds between TTL expiry sweeps.
    pub ttl_sweep_interval_ms: u64,

    /// Eviction policy used when the memory budget is exceeded.
    pub eviction_policy: EvictionPolicyKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_host: "127.0.0.1".to_string(),
            listen_port: 8080,
            shard_count: 64,
            shard_capacity: 1024,
            max_memory_bytes: 256 * 1024 * 1024,
            max_value_bytes: 8 * 1024 * 1024,
            max_connections: 4096,
            enable_ttl: true,
            ttl_sweep_interval_ms: 250,
            eviction_policy: EvictionPolicyKind::Lru,
        }
    }
}

impl Config {
    /// Validates the configuration.
    ///
    /// Must be called once during startup before constructing components.
    pub fn validate(&self) -> KvResult<()> {
        if self.shard_count == 0 {
            return Err(KvError::invalid_argument("shard_count must be > 0"));
        }

        if !self.shard_count.is_power_of_two() {
            return Err(KvError::invalid_argument(
                "shard_count must be a power of two (e.g. 16, 32, 64)",
            ));
        }

        if self.shard_capacity == 0 {
            return Err(KvError::invalid_argument("shard_capacity must be > 0"));
        }

        if self.max_memory_bytes == 0 {
            return Err(KvError::invalid_argument("max_memory_bytes must be > 0"));
        }

        if self.max_value_bytes == 0 {
            return Err(KvError::invalid_argument("max_value_bytes must be > 0"));
        }

        if self.max_value_bytes > self.max_memory_bytes {
            return Err(KvError::invalid_argument(
                "max_value_bytes must be <= max_memory_bytes",
            ));
        }

        if self.listen_port == 0 {
            return Err(KvError::invalid_argument("listen_port must be a valid port"));
        }

        if self.max_connections == 0 {
            return Err(KvError::invalid_argument("max_connections must be > 0"));
        }

        if self.enable_ttl && self.ttl_sweep_interval_ms == 0 {
            return Err(KvError::invalid_argument(
                "ttl_sweep_interval_ms must be > 0 when TTL is enabled",
            ));
        }

        Ok(())
    }

    /// Returns the bind address as `host:port`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listen_host, self.listen_port)
    }
}
