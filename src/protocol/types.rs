//! Threat categories shared by the wire schema, the classifier and config.
//!
//! The enums carry both representations the gateway speaks: the numeric
//! protobuf value (via `prost::Enumeration`) and the canonical JSON name
//! (via serde, `SCREAMING_SNAKE_CASE`).

use serde::{Deserialize, Serialize};

/// Type of threat a list or match refers to.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration, Serialize, Deserialize,
)]
#[repr(i32)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatType {
    #[serde(rename = "THREAT_TYPE_UNSPECIFIED")]
    Unspecified = 0,
    Malware = 1,
    SocialEngineering = 2,
    UnwantedSoftware = 3,
    PotentiallyHarmfulApplication = 4,
}

/// Platform a threat targets.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration, Serialize, Deserialize,
)]
#[repr(i32)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlatformType {
    #[serde(rename = "PLATFORM_TYPE_UNSPECIFIED")]
    Unspecified = 0,
    Windows = 1,
    Linux = 2,
    Android = 3,
    Osx = 4,
    Ios = 5,
    AnyPlatform = 6,
    AllPlatforms = 7,
    Chrome = 8,
}

/// Kind of entry a threat list contains.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration, Serialize, Deserialize,
)]
#[repr(i32)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatEntryType {
    #[serde(rename = "THREAT_ENTRY_TYPE_UNSPECIFIED")]
    Unspecified = 0,
    Url = 1,
    Executable = 2,
    IpRange = 3,
}

/// A (threat type, platform type, entry type) triple identifying one list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThreatDescriptor {
    pub threat_type: ThreatType,
    pub platform_type: PlatformType,
    pub threat_entry_type: ThreatEntryType,
}

impl ThreatDescriptor {
    pub const fn new(
        threat_type: ThreatType,
        platform_type: PlatformType,
        threat_entry_type: ThreatEntryType,
    ) -> Self {
        Self {
            threat_type,
            platform_type,
            threat_entry_type,
        }
    }

    /// True if any component is the `*_UNSPECIFIED` placeholder.
    pub fn is_unspecified(&self) -> bool {
        self.threat_type == ThreatType::Unspecified
            || self.platform_type == PlatformType::Unspecified
            || self.threat_entry_type == ThreatEntryType::Unspecified
    }
}

/// Lists served when the configuration names none, in this order.
pub const DEFAULT_THREAT_LISTS: [ThreatDescriptor; 3] = [
    ThreatDescriptor::new(ThreatType::Malware, PlatformType::AnyPlatform, ThreatEntryType::Url),
    ThreatDescriptor::new(
        ThreatType::SocialEngineering,
        PlatformType::AnyPlatform,
        ThreatEntryType::Url,
    ),
    ThreatDescriptor::new(
        ThreatType::UnwantedSoftware,
        PlatformType::AnyPlatform,
        ThreatEntryType::Url,
    ),
];
