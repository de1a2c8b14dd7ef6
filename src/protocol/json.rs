//! Serde helpers implementing the protobuf JSON mapping for fields whose
//! Rust representation is dictated by prost (enums stored as `i32`,
//! `bytes` stored as `Vec<u8>`).

use serde::de::DeserializeOwned;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::marker::PhantomData;

use crate::protocol::types::{PlatformType, ThreatEntryType, ThreatType};

/// Enum that is stored as `i32` on the wire structs but named in JSON.
pub trait ProtoEnum: Copy + Into<i32> + TryFrom<i32> + Serialize + DeserializeOwned {}

impl ProtoEnum for ThreatType {}
impl ProtoEnum for PlatformType {}
impl ProtoEnum for ThreatEntryType {}

/// Enum values are accepted either by name or by number.
#[derive(Deserialize)]
#[serde(untagged)]
enum EnumValue<E> {
    Name(E),
    Number(i32),
}

impl<E: ProtoEnum> EnumValue<E> {
    fn into_i32(self) -> i32 {
        match self {
            EnumValue::Name(e) => e.into(),
            EnumValue::Number(n) => n,
        }
    }
}

struct Named<E> {
    value: i32,
    _kind: PhantomData<E>,
}

impl<E: ProtoEnum> Serialize for Named<E> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_enum::<E, S>(&self.value, serializer)
    }
}

/// Unknown numeric values are written as numbers so nothing is lost.
pub fn serialize_enum<E, S>(value: &i32, serializer: S) -> Result<S::Ok, S::Error>
where
    E: ProtoEnum,
    S: Serializer,
{
    match E::try_from(*value) {
        Ok(known) => known.serialize(serializer),
        Err(_) => serializer.serialize_i32(*value),
    }
}

pub fn deserialize_enum<'de, E, D>(deserializer: D) -> Result<i32, D::Error>
where
    E: ProtoEnum,
    D: Deserializer<'de>,
{
    EnumValue::<E>::deserialize(deserializer).map(EnumValue::into_i32)
}

#[allow(clippy::ptr_arg)]
pub fn serialize_enums<E, S>(values: &Vec<i32>, serializer: S) -> Result<S::Ok, S::Error>
where
    E: ProtoEnum,
    S: Serializer,
{
    let mut seq = serializer.serialize_seq(Some(values.len()))?;
    for value in values {
        seq.serialize_element(&Named::<E> {
            value: *value,
            _kind: PhantomData,
        })?;
    }
    seq.end()
}

pub fn deserialize_enums<'de, E, D>(deserializer: D) -> Result<Vec<i32>, D::Error>
where
    E: ProtoEnum,
    D: Deserializer<'de>,
{
    let values = Vec::<EnumValue<E>>::deserialize(deserializer)?;
    Ok(values.into_iter().map(EnumValue::into_i32).collect())
}

pub fn is_zero(value: &i32) -> bool {
    *value == 0
}

/// `bytes` fields: standard base64 on output; standard or URL-safe, padded
/// or not, on input.
pub mod base64_bytes {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
    use base64::Engine;
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S: Serializer>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        [STANDARD, URL_SAFE, STANDARD_NO_PAD, URL_SAFE_NO_PAD]
            .iter()
            .find_map(|engine| engine.decode(&text).ok())
            .ok_or_else(|| de::Error::custom(format!("invalid base64 bytes: {:?}", text)))
    }
}
