//! Asset registry
//!
//! Tracks which asset identifiers are accepted for plans and one-time
//! payments. The configured native asset is seeded at construction and can
//! never be removed.

use crate::types::AssetId;
use crate::{Error, Result};

/// Registry of accepted assets, in insertion order
#[derive(Debug, Clone)]
pub struct AssetRegistry {
    native: AssetId,
    assets: Vec<AssetId>,
}

impl AssetRegistry {
    /// Create a registry with the native asset pre-registered
    pub fn new(native: AssetId) -> Self {
        Self {
            assets: vec![native.clone()],
            native,
        }
    }

    /// The designated native asset
    pub fn native(&self) -> &AssetId {
        &self.native
    }

    /// Register an asset; fails if already present
    pub fn add(&mut self, asset: AssetId) -> Result<()> {
        if self.is_supported(&asset) {
            return Err(Error::Validation(format!(
                "asset {} already registered",
                asset
            )));
        }
        self.assets.push(asset);
        Ok(())
    }

    /// Deregister an asset; fails for the native asset or when absent
    pub fn remove(&mut self, asset: &AssetId) -> Result<()> {
        if *asset == self.native {
            return Err(Error::Validation(format!(
                "native asset {} cannot be removed",
                asset
            )));
        }
        let position = self
            .assets
            .iter()
            .position(|a| a == asset)
            .ok_or_else(|| Error::NotFound(format!("asset {} not registered", asset)))?;
        self.assets.remove(position);
        Ok(())
    }

    /// Whether an asset is currently accepted
    pub fn is_supported(&self, asset: &AssetId) -> bool {
        self.assets.iter().any(|a| a == asset)
    }

    /// Accepted assets in insertion order
    pub fn list(&self) -> Vec<AssetId> {
        self.assets.clone()
    }

    pub(crate) fn restore(native: AssetId, assets: Vec<AssetId>) -> Self {
        Self { native, assets }
    }
}
