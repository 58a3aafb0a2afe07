// registry.rs — The IP asset registry interface.
//
// Issuance, licensing and royalty bookkeeping live in an external registry.
// Calls into it are fire-and-forget side effects: the outcome is recorded on
// the action record but never feeds back into estate invariants.

use std::collections::BTreeMap;
use std::fmt;

use fie_types::{AssetId, Identity};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenseId(pub String);

impl fmt::Display for LicenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown asset: {0}")]
    UnknownAsset(AssetId),

    #[error("asset {0} is already in the public domain")]
    PublicDomain(AssetId),

    #[error("registry rejected the call: {0}")]
    Rejected(String),
}

pub trait AssetRegistry {
    fn mint(
        &mut self,
        owner: &Identity,
        metadata_uri: &str,
        content_hash: &str,
    ) -> Result<AssetId, RegistryError>;

    fn license(
        &mut self,
        asset: &AssetId,
        licensee: &Identity,
        royalty_bps: u16,
        duration_secs: u64,
    ) -> Result<LicenseId, RegistryError>;

    fn transition_to_public_domain(&mut self, asset: &AssetId) -> Result<(), RegistryError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintedAsset {
    pub owner: Identity,
    pub metadata_uri: String,
    pub content_hash: String,
    pub public_domain: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedLicense {
    pub license_id: LicenseId,
    pub asset: AssetId,
    pub licensee: Identity,
    pub royalty_bps: u16,
    pub duration_secs: u64,
}

/// Registry kept entirely in memory, with sequential ids.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    assets: BTreeMap<AssetId, MintedAsset>,
    licenses: Vec<IssuedLicense>,
    next_id: u64,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asset(&self, id: &AssetId) -> Option<&MintedAsset> {
        self.assets.get(id)
    }

    pub fn licenses(&self) -> &[IssuedLicense] {
        &self.licenses
    }

    fn next(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

impl AssetRegistry for InMemoryRegistry {
    fn mint(
        &mut self,
        owner: &Identity,
        metadata_uri: &str,
        content_hash: &str,
    ) -> Result<AssetId, RegistryError> {
        let id = AssetId(self.next("asset"));
        self.assets.insert(
            id.clone(),
            MintedAsset {
                owner: owner.clone(),
                metadata_uri: metadata_uri.to_string(),
                content_hash: content_hash.to_string(),
                public_domain: false,
            },
        );
        Ok(id)
    }

    fn license(
        &mut self,
        asset: &AssetId,
        licensee: &Identity,
        royalty_bps: u16,
        duration_secs: u64,
    ) -> Result<LicenseId, RegistryError> {
        match self.assets.get(asset) {
            None => return Err(RegistryError::UnknownAsset(asset.clone())),
            Some(a) if a.public_domain => return Err(RegistryError::PublicDomain(asset.clone())),
            Some(_) => {}
        }
        let license_id = LicenseId(self.next("license"));
        self.licenses.push(IssuedLicense {
            license_id: license_id.clone(),
            asset: asset.clone(),
            licensee: licensee.clone(),
            royalty_bps,
            duration_secs,
        });
        Ok(license_id)
    }

    fn transition_to_public_domain(&mut self, asset: &AssetId) -> Result<(), RegistryError> {
        let entry = self
            .assets
            .get_mut(asset)
            .ok_or_else(|| RegistryError::UnknownAsset(asset.clone()))?;
        entry.public_domain = true;
        Ok(())
    }
}

/// Registry stand-in that only logs calls and hands out random ids.
/// Used when the real registry is driven out of band.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingRegistry;

impl AssetRegistry for LoggingRegistry {
    fn mint(
        &mut self,
        owner: &Identity,
        metadata_uri: &str,
        content_hash: &str,
    ) -> Result<AssetId, RegistryError> {
        let id = AssetId(format!("asset-{}", Uuid::new_v4()));
        tracing::info!(%owner, metadata_uri, content_hash, asset = %id, "registry: mint");
        Ok(id)
    }

    fn license(
        &mut self,
        asset: &AssetId,
        licensee: &Identity,
        royalty_bps: u16,
        duration_secs: u64,
    ) -> Result<LicenseId, RegistryError> {
        let id = LicenseId(format!("license-{}", Uuid::new_v4()));
        tracing::info!(%asset, %licensee, royalty_bps, duration_secs, license = %id, "registry: license");
        Ok(id)
    }

    fn transition_to_public_domain(&mut self, asset: &AssetId) -> Result<(), RegistryError> {
        tracing::info!(%asset, "registry: transition to public domain");
        Ok(())
    }
}
