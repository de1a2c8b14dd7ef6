//! Request and response messages of the threat-matching protocol.
//!
//! Each struct derives `prost::Message` (binary encoding) and serde
//! (structured-text encoding). JSON follows the protobuf mapping: camelCase
//! names on output, snake_case names also accepted on input, enum names
//! instead of numbers, default values omitted.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::protocol::json::{self, base64_bytes};
use crate::protocol::types::{PlatformType, ThreatDescriptor, ThreatEntryType, ThreatType};

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientInfo {
    #[prost(string, tag = "1")]
    #[serde(alias = "client_id", skip_serializing_if = "String::is_empty")]
    pub client_id: String,

    #[prost(string, tag = "2")]
    #[serde(alias = "client_version", skip_serializing_if = "String::is_empty")]
    pub client_version: String,
}

/// A single queryable item. The gateway only accepts URL-form entries.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThreatEntry {
    #[prost(bytes = "vec", tag = "1")]
    #[serde(skip_serializing_if = "Vec::is_empty", with = "base64_bytes")]
    pub hash: Vec<u8>,

    #[prost(string, tag = "2")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
}

impl ThreatEntry {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            hash: Vec::new(),
            url: url.into(),
        }
    }
}

/// Filter fields plus the entries to look up.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThreatInfo {
    #[prost(enumeration = "ThreatType", repeated, tag = "1")]
    #[serde(
        alias = "threat_types",
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "json::serialize_enums::<ThreatType, _>",
        deserialize_with = "json::deserialize_enums::<ThreatType, _>"
    )]
    pub threat_types: Vec<i32>,

    #[prost(enumeration = "PlatformType", repeated, tag = "2")]
    #[serde(
        alias = "platform_types",
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "json::serialize_enums::<PlatformType, _>",
        deserialize_with = "json::deserialize_enums::<PlatformType, _>"
    )]
    pub platform_types: Vec<i32>,

    #[prost(message, repeated, tag = "3")]
    #[serde(alias = "threat_entries", skip_serializing_if = "Vec::is_empty")]
    pub threat_entries: Vec<ThreatEntry>,

    #[prost(enumeration = "ThreatEntryType", repeated, tag = "4")]
    #[serde(
        alias = "threat_entry_types",
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "json::serialize_enums::<ThreatEntryType, _>",
        deserialize_with = "json::deserialize_enums::<ThreatEntryType, _>"
    )]
    pub threat_entry_types: Vec<i32>,
}

/// Body of `POST /v4/threatMatches:find`.
///
/// `threat_info`'s filter fields are decoded but do not narrow the matches
/// the gateway returns.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FindThreatMatchesRequest {
    #[prost(message, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientInfo>,

    #[prost(message, optional, tag = "2")]
    #[serde(alias = "threat_info", skip_serializing_if = "Option::is_none")]
    pub threat_info: Option<ThreatInfo>,
}

impl FindThreatMatchesRequest {
    /// Entries in request order; empty when `threat_info` is absent.
    pub fn threat_entries(&self) -> &[ThreatEntry] {
        self.threat_info
            .as_ref()
            .map(|info| info.threat_entries.as_slice())
            .unwrap_or_default()
    }
}

/// A signed span of time. JSON form is a decimal number of seconds with an
/// `s` suffix, e.g. `"300s"` or `"1.5s"`.
#[derive(Clone, Copy, PartialEq, Eq, prost::Message)]
pub struct Duration {
    #[prost(int64, tag = "1")]
    pub seconds: i64,

    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

impl Duration {
    pub fn from_secs(seconds: i64) -> Self {
        Self { seconds, nanos: 0 }
    }

    /// `None` for negative spans.
    pub fn to_std(self) -> Option<std::time::Duration> {
        if self.seconds < 0 || self.nanos < 0 {
            return None;
        }
        Some(std::time::Duration::new(self.seconds as u64, self.nanos as u32))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let negative = self.seconds < 0 || self.nanos < 0;
        let seconds = self.seconds.unsigned_abs();
        let nanos = self.nanos.unsigned_abs();
        if negative {
            f.write_str("-")?;
        }
        if nanos == 0 {
            return write!(f, "{}s", seconds);
        }
        // Fractions use 3, 6 or 9 digits.
        let mut fraction = format!("{:09}", nanos);
        while fraction.ends_with("000") {
            fraction.truncate(fraction.len() - 3);
        }
        write!(f, "{}.{}s", seconds, fraction)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid duration {0:?}")]
pub struct ParseDurationError(String);

impl FromStr for Duration {
    type Err = ParseDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseDurationError(s.to_string());
        let body = s.strip_suffix('s').ok_or_else(invalid)?;
        let (negative, body) = match body.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, body),
        };
        let (whole, fraction) = body.split_once('.').unwrap_or((body, ""));
        if whole.is_empty() || fraction.len() > 9 {
            return Err(invalid());
        }
        let seconds: i64 = whole.parse().map_err(|_| invalid())?;
        let nanos: i32 = if fraction.is_empty() {
            0
        } else {
            format!("{:0<9}", fraction).parse().map_err(|_| invalid())?
        };
        let sign = if negative { -1 } else { 1 };
        Ok(Self {
            seconds: sign * seconds,
            nanos: sign as i32 * nanos,
        })
    }
}

impl Serialize for Duration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

/// One (threat, threatType, platformType, threatEntryType) tuple.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThreatMatch {
    #[prost(enumeration = "ThreatType", tag = "1")]
    #[serde(
        alias = "threat_type",
        skip_serializing_if = "json::is_zero",
        serialize_with = "json::serialize_enum::<ThreatType, _>",
        deserialize_with = "json::deserialize_enum::<ThreatType, _>"
    )]
    pub threat_type: i32,

    #[prost(enumeration = "PlatformType", tag = "2")]
    #[serde(
        alias = "platform_type",
        skip_serializing_if = "json::is_zero",
        serialize_with = "json::serialize_enum::<PlatformType, _>",
        deserialize_with = "json::deserialize_enum::<PlatformType, _>"
    )]
    pub platform_type: i32,

    #[prost(message, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threat: Option<ThreatEntry>,

    #[prost(message, optional, tag = "5")]
    #[serde(alias = "cache_duration", skip_serializing_if = "Option::is_none")]
    pub cache_duration: Option<Duration>,

    #[prost(enumeration = "ThreatEntryType", tag = "6")]
    #[serde(
        alias = "threat_entry_type",
        skip_serializing_if = "json::is_zero",
        serialize_with = "json::serialize_enum::<ThreatEntryType, _>",
        deserialize_with = "json::deserialize_enum::<ThreatEntryType, _>"
    )]
    pub threat_entry_type: i32,
}

impl ThreatMatch {
    /// Match for `url` echoing the queried string as the threat entry.
    pub fn new(url: &str, descriptor: ThreatDescriptor) -> Self {
        Self {
            threat_type: descriptor.threat_type.into(),
            platform_type: descriptor.platform_type.into(),
            threat: Some(ThreatEntry::url(url)),
            cache_duration: None,
            threat_entry_type: descriptor.threat_entry_type.into(),
        }
    }

    /// Unknown enum values collapse to their `*_UNSPECIFIED` variant.
    pub fn descriptor(&self) -> ThreatDescriptor {
        ThreatDescriptor::new(
            self.threat_type(),
            self.platform_type(),
            self.threat_entry_type(),
        )
    }

    pub fn url(&self) -> Option<&str> {
        self.threat.as_ref().map(|entry| entry.url.as_str())
    }
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FindThreatMatchesResponse {
    #[prost(message, repeated, tag = "1")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<ThreatMatch>,

    #[prost(message, optional, tag = "2")]
    #[serde(alias = "negative_cache_duration", skip_serializing_if = "Option::is_none")]
    pub negative_cache_duration: Option<Duration>,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThreatListDescriptor {
    #[prost(enumeration = "ThreatType", tag = "1")]
    #[serde(
        alias = "threat_type",
        skip_serializing_if = "json::is_zero",
        serialize_with = "json::serialize_enum::<ThreatType, _>",
        deserialize_with = "json::deserialize_enum::<ThreatType, _>"
    )]
    pub threat_type: i32,

    #[prost(enumeration = "PlatformType", tag = "2")]
    #[serde(
        alias = "platform_type",
        skip_serializing_if = "json::is_zero",
        serialize_with = "json::serialize_enum::<PlatformType, _>",
        deserialize_with = "json::deserialize_enum::<PlatformType, _>"
    )]
    pub platform_type: i32,

    #[prost(enumeration = "ThreatEntryType", tag = "3")]
    #[serde(
        alias = "threat_entry_type",
        skip_serializing_if = "json::is_zero",
        serialize_with = "json::serialize_enum::<ThreatEntryType, _>",
        deserialize_with = "json::deserialize_enum::<ThreatEntryType, _>"
    )]
    pub threat_entry_type: i32,
}

impl From<ThreatDescriptor> for ThreatListDescriptor {
    fn from(descriptor: ThreatDescriptor) -> Self {
        Self {
            threat_type: descriptor.threat_type.into(),
            platform_type: descriptor.platform_type.into(),
            threat_entry_type: descriptor.threat_entry_type.into(),
        }
    }
}

/// Body of `GET /v4/threatLists`.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListThreatListsResponse {
    #[prost(message, repeated, tag = "1")]
    #[serde(alias = "threat_lists", skip_serializing_if = "Vec::is_empty")]
    pub threat_lists: Vec<ThreatListDescriptor>,
}
