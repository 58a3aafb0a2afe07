// stage.rs — The sunset ordinal and post-sunset licenses.
//
// The five sunset milestones are one ordered enum instead of five booleans.
// `advance` only accepts the immediate successor, so skipping or reversing a
// stage is impossible to express without an explicit error.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SunsetError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SunsetStage {
    #[default]
    Pending,
    Initiated,
    Archived,
    Transitioned,
    Clustered,
    Completed,
}

impl SunsetStage {
    pub fn successor(self) -> Option<SunsetStage> {
        match self {
            SunsetStage::Pending => Some(SunsetStage::Initiated),
            SunsetStage::Initiated => Some(SunsetStage::Archived),
            SunsetStage::Archived => Some(SunsetStage::Transitioned),
            SunsetStage::Transitioned => Some(SunsetStage::Clustered),
            SunsetStage::Clustered => Some(SunsetStage::Completed),
            SunsetStage::Completed => None,
        }
    }

    /// Move exactly one step forward to `to`.
    pub fn advance(&mut self, to: SunsetStage) -> Result<(), SunsetError> {
        if self.successor() != Some(to) {
            return Err(SunsetError::InvariantViolation { from: *self, to });
        }
        *self = to;
        Ok(())
    }
}

impl fmt::Display for SunsetStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SunsetStage::Pending => "pending",
            SunsetStage::Initiated => "initiated",
            SunsetStage::Archived => "archived",
            SunsetStage::Transitioned => "transitioned",
            SunsetStage::Clustered => "clustered",
            SunsetStage::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// License that applies to the estate's IP after the transition.
///
/// Encoded as a stable `u8` code; `PublicDomain` (CC0) is code 0 and the
/// default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostSunsetLicense {
    #[default]
    PublicDomain,
    /// CC BY 4.0.
    Attribution,
    /// CC BY-SA 4.0.
    AttributionShareAlike,
}

impl PostSunsetLicense {
    pub fn code(self) -> u8 {
        match self {
            PostSunsetLicense::PublicDomain => 0,
            PostSunsetLicense::Attribution => 1,
            PostSunsetLicense::AttributionShareAlike => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(PostSunsetLicense::PublicDomain),
            1 => Some(PostSunsetLicense::Attribution),
            2 => Some(PostSunsetLicense::AttributionShareAlike),
            _ => None,
        }
    }
}

impl fmt::Display for PostSunsetLicense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostSunsetLicense::PublicDomain => write!(f, "CC0-1.0"),
            PostSunsetLicense::Attribution => write!(f, "CC-BY-4.0"),
            PostSunsetLicense::AttributionShareAlike => write!(f, "CC-BY-SA-4.0"),
        }
    }
}
