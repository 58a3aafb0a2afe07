//! # fie-types
//!
//! Pure domain types shared by every Finite Intent Executor crate: no I/O,
//! no persistence, minimal dependencies.
//!
//! - [`Identity`]: a stable principal/signer/oracle identity
//! - [`Timestamp`]: unix seconds, the only unit of time the core reasons in
//! - [`Clock`]: the single externally supplied time source
//!   ([`SystemClock`] in production, [`ManualClock`] in tests and replays)
//! - [`ErrorClass`]: the taxonomy every component error maps onto

pub mod class;
pub mod identity;
pub mod time;

pub use class::ErrorClass;
pub use identity::{EmptyIdentityError, Identity};
pub use time::{Clock, ManualClock, SystemClock, Timestamp, SECONDS_PER_DAY, SECONDS_PER_YEAR};

/// Registry-issued identifier of an IP asset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub String);

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Smallest-unit amount for funding and revenue distribution.
pub type Amount = u64;
