//! Configuration for the billing engine

use crate::types::{AccountId, AssetId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Billing engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Administrator account: may mutate the asset registry and toggle any
    /// plan. Compared against caller identity; there is no implicit role.
    pub administrator: String,

    /// The engine's own ledger identity, used as the spender in
    /// authorization checks for renewal pulls
    pub engine_account: String,

    /// The designated native asset: always registered, never removable,
    /// and without an authorization concept (so it cannot auto-renew)
    pub native_asset: String,

    /// Data directory for snapshots
    pub data_dir: PathBuf,

    /// Charging configuration
    pub charging: ChargingConfig,

    /// Snapshot configuration
    pub snapshot: SnapshotConfig,

    /// Event stream configuration
    pub events: EventsConfig,

    /// Actor mailbox configuration
    pub actor: ActorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "billing-core".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            administrator: "admin".to_string(),
            engine_account: "billing-engine".to_string(),
            native_asset: "NATIVE".to_string(),
            data_dir: PathBuf::from("./data/billing"),
            charging: ChargingConfig::default(),
            snapshot: SnapshotConfig::default(),
            events: EventsConfig::default(),
            actor: ActorConfig::default(),
        }
    }
}

/// Charging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargingConfig {
    /// Maximum identifiers accepted by a single batch charge
    pub max_batch_size: usize,

    /// Minimum plan interval in seconds (default: 1 day)
    pub min_interval_seconds: u64,
}

impl Default for ChargingConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            min_interval_seconds: 86_400, // 1 day
        }
    }
}

/// Snapshot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Write a snapshot on shutdown
    pub save_on_shutdown: bool,

    /// Snapshot file name inside `data_dir`
    pub file_name: String,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            save_on_shutdown: true,
            file_name: "billing.snapshot".to_string(),
        }
    }
}

/// Event stream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Broadcast channel capacity before slow subscribers lag
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}

/// Actor mailbox configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorConfig {
    /// Bounded mailbox capacity (backpressure on mutating callers)
    pub mailbox_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1000,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("BILLING_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(admin) = std::env::var("BILLING_ADMINISTRATOR") {
            config.administrator = admin;
        }

        if let Ok(native) = std::env::var("BILLING_NATIVE_ASSET") {
            config.native_asset = native;
        }

        if let Ok(account) = std::env::var("BILLING_ENGINE_ACCOUNT") {
            config.engine_account = account;
        }

        Ok(config)
    }

    /// Administrator as a typed account
    pub fn administrator(&self) -> AccountId {
        AccountId::new(self.administrator.clone())
    }

    /// Engine ledger identity as a typed account
    pub fn engine_account(&self) -> AccountId {
        AccountId::new(self.engine_account.clone())
    }

    /// Native asset as a typed asset ID
    pub fn native_asset(&self) -> AssetId {
        AssetId::new(self.native_asset.clone())
    }
}
