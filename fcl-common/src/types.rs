//! Typed Cadence values.
//!
//! Arguments travel to the access node in the JSON-Cadence encoding, an object carrying the
//! Cadence type name next to its value (`{"type": "UInt8", "value": "42"}`). Integer and fixed
//! point values are string encoded so that 128 and 256 bit types survive JSON.
use std::{collections::BTreeMap, str::FromStr};

use num_bigint::{BigInt, Sign};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

use crate::address::{with_prefix, Address, AddressError};

/// Number of decimals carried by `Fix64` and `UFix64`.
pub const FIX64_SCALE: u32 = 8;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("{value:?} is not a valid {ty}")]
    InvalidNumber { ty: &'static str, value: String },

    #[error("{value} does not fit in {ty}")]
    OutOfRange { ty: &'static str, value: String },

    #[error("{value:?} is not a valid {ty}: more than {FIX64_SCALE} decimals")]
    TooPrecise { ty: &'static str, value: String },

    #[error("Invalid address argument: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("{0:?} is not a single character")]
    InvalidCharacter(String),

    #[error("Unknown integer type: {0}")]
    UnknownType(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: Value,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: Value,
}

/// Payload shared by structs, resources, events, contracts and enums.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Composite {
    pub id: String,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathValue {
    pub domain: String,
    pub identifier: String,
}

/// A runtime type value. The static type is kept in its raw JSON-Cadence type encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeValue {
    #[serde(rename = "staticType")]
    pub static_type: serde_json::Value,
}

/// A capability as returned by scripts. Newer access nodes identify it by `id`, older ones by
/// `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Box<Value>>,
    pub address: String,
    #[serde(rename = "borrowType")]
    pub borrow_type: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Void,
    Optional(Option<Box<Value>>),
    Bool(bool),
    String(String),
    Character(String),
    Address(String),
    Int(String),
    Int8(String),
    Int16(String),
    Int32(String),
    Int64(String),
    Int128(String),
    Int256(String),
    UInt(String),
    UInt8(String),
    UInt16(String),
    UInt32(String),
    UInt64(String),
    UInt128(String),
    UInt256(String),
    Word8(String),
    Word16(String),
    Word32(String),
    Word64(String),
    Fix64(String),
    UFix64(String),
    Array(Vec<Value>),
    Dictionary(Vec<KeyValue>),
    Struct(Composite),
    Resource(Composite),
    Event(Composite),
    Contract(Composite),
    Enum(Composite),
    Path(PathValue),
    Type(TypeValue),
    Capability(CapabilityValue),
}

/// Bounds of a Cadence integer type; `None` means unbounded in that direction.
struct IntBounds {
    signed: bool,
    bits: Option<u32>,
}

impl IntBounds {
    fn of(ty: &str) -> Option<Self> {
        let (signed, bits) = match ty {
            "Int" => (true, None),
            "UInt" => (false, None),
            "Int8" => (true, Some(8)),
            "Int16" => (true, Some(16)),
            "Int32" => (true, Some(32)),
            "Int64" => (true, Some(64)),
            "Int128" => (true, Some(128)),
            "Int256" => (true, Some(256)),
            "UInt8" | "Word8" => (false, Some(8)),
            "UInt16" | "Word16" => (false, Some(16)),
            "UInt32" | "Word32" => (false, Some(32)),
            "UInt64" | "Word64" => (false, Some(64)),
            "UInt128" => (false, Some(128)),
            "UInt256" => (false, Some(256)),
            _ => return None,
        };
        Some(Self { signed, bits })
    }

    fn contains(&self, v: &BigInt) -> bool {
        if !self.signed && v.sign() == Sign::Minus {
            return false;
        }
        match self.bits {
            None => true,
            Some(bits) if self.signed => {
                let limit = BigInt::from(1) << (bits - 1);
                *v >= -limit.clone() && *v < limit
            }
            Some(bits) => *v < (BigInt::from(1) << bits),
        }
    }
}

fn check_integer(ty: &'static str, repr: &str) -> Result<(), ArgumentError> {
    let bounds = IntBounds::of(ty).ok_or_else(|| ArgumentError::UnknownType(ty.to_string()))?;
    let parsed = BigInt::from_str(repr)
        .map_err(|_| ArgumentError::InvalidNumber { ty, value: repr.to_string() })?;
    if !bounds.contains(&parsed) {
        return Err(ArgumentError::OutOfRange { ty, value: repr.to_string() });
    }
    Ok(())
}

/// Validates a fixed point literal and returns it with exactly eight decimals.
fn normalize_fix64(ty: &'static str, repr: &str) -> Result<String, ArgumentError> {
    let invalid = || ArgumentError::InvalidNumber { ty, value: repr.to_string() };
    let (negative, body) = match repr.strip_prefix('-') {
        Some(body) if ty == "Fix64" => (true, body),
        Some(_) => return Err(ArgumentError::OutOfRange { ty, value: repr.to_string() }),
        None => (false, repr),
    };
    let (int_part, frac_part) = body
        .split_once('.')
        .unwrap_or((body, ""));
    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if frac_part.len() > FIX64_SCALE as usize {
        return Err(ArgumentError::TooPrecise { ty, value: repr.to_string() });
    }
    let frac = format!("{frac_part:0<width$}", width = FIX64_SCALE as usize);
    let scaled = BigInt::from_str(&format!("{int_part}{frac}")).map_err(|_| invalid())?;
    let scaled = if negative { -scaled } else { scaled };
    let within = if ty == "Fix64" {
        scaled >= BigInt::from(i64::MIN) && scaled <= BigInt::from(i64::MAX)
    } else {
        scaled <= BigInt::from(u64::MAX)
    };
    if !within {
        return Err(ArgumentError::OutOfRange { ty, value: repr.to_string() });
    }
    let int_part = int_part.trim_start_matches('0');
    let int_part = if int_part.is_empty() { "0" } else { int_part };
    let sign = if negative && scaled.sign() == Sign::Minus { "-" } else { "" };
    Ok(format!("{sign}{int_part}.{frac}"))
}

macro_rules! native_int_ctor {
    ($($name:ident: $native:ty => $variant:ident),* $(,)?) => {
        $(
            pub fn $name(v: $native) -> Self {
                Value::$variant(v.to_string())
            }
        )*
    };
}

impl Value {
    native_int_ctor! {
        int8: i8 => Int8,
        int16: i16 => Int16,
        int32: i32 => Int32,
        int64: i64 => Int64,
        int128: i128 => Int128,
        uint8: u8 => UInt8,
        uint16: u16 => UInt16,
        uint32: u32 => UInt32,
        uint64: u64 => UInt64,
        uint128: u128 => UInt128,
        word8: u8 => Word8,
        word16: u16 => Word16,
        word32: u32 => Word32,
        word64: u64 => Word64,
    }

    pub fn int(v: impl Into<BigInt>) -> Self {
        Value::Int(v.into().to_string())
    }

    pub fn uint(v: u128) -> Self {
        Value::UInt(v.to_string())
    }

    pub fn string(v: impl Into<String>) -> Self {
        Value::String(v.into())
    }

    pub fn bool(v: bool) -> Self {
        Value::Bool(v)
    }

    pub fn optional(v: Option<Value>) -> Self {
        Value::Optional(v.map(Box::new))
    }

    pub fn array(values: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(values.into_iter().collect())
    }

    pub fn dictionary(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Value::Dictionary(
            entries
                .into_iter()
                .map(|(key, value)| KeyValue { key, value })
                .collect(),
        )
    }

    pub fn address(v: &str) -> Result<Self, ArgumentError> {
        Ok(Value::Address(Address::from_str(v)?.to_string()))
    }

    pub fn character(v: &str) -> Result<Self, ArgumentError> {
        if v.graphemes(true).count() != 1 {
            return Err(ArgumentError::InvalidCharacter(v.to_string()));
        }
        Ok(Value::Character(v.to_string()))
    }

    pub fn ufix64(v: &str) -> Result<Self, ArgumentError> {
        Ok(Value::UFix64(normalize_fix64("UFix64", v)?))
    }

    pub fn fix64(v: &str) -> Result<Self, ArgumentError> {
        Ok(Value::Fix64(normalize_fix64("Fix64", v)?))
    }

    /// Builds an integer value of any Cadence integer type from its decimal representation.
    pub fn integer(ty: &str, repr: &str) -> Result<Self, ArgumentError> {
        let value = match ty {
            "Int" => Value::Int(repr.to_string()),
            "Int8" => Value::Int8(repr.to_string()),
            "Int16" => Value::Int16(repr.to_string()),
            "Int32" => Value::Int32(repr.to_string()),
            "Int64" => Value::Int64(repr.to_string()),
            "Int128" => Value::Int128(repr.to_string()),
            "Int256" => Value::Int256(repr.to_string()),
            "UInt" => Value::UInt(repr.to_string()),
            "UInt8" => Value::UInt8(repr.to_string()),
            "UInt16" => Value::UInt16(repr.to_string()),
            "UInt32" => Value::UInt32(repr.to_string()),
            "UInt64" => Value::UInt64(repr.to_string()),
            "UInt128" => Value::UInt128(repr.to_string()),
            "UInt256" => Value::UInt256(repr.to_string()),
            "Word8" => Value::Word8(repr.to_string()),
            "Word16" => Value::Word16(repr.to_string()),
            "Word32" => Value::Word32(repr.to_string()),
            "Word64" => Value::Word64(repr.to_string()),
            other => return Err(ArgumentError::UnknownType(other.to_string())),
        };
        value.validate()?;
        Ok(value)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Void => "Void",
            Value::Optional(_) => "Optional",
            Value::Bool(_) => "Bool",
            Value::String(_) => "String",
            Value::Character(_) => "Character",
            Value::Address(_) => "Address",
            Value::Int(_) => "Int",
            Value::Int8(_) => "Int8",
            Value::Int16(_) => "Int16",
            Value::Int32(_) => "Int32",
            Value::Int64(_) => "Int64",
            Value::Int128(_) => "Int128",
            Value::Int256(_) => "Int256",
            Value::UInt(_) => "UInt",
            Value::UInt8(_) => "UInt8",
            Value::UInt16(_) => "UInt16",
            Value::UInt32(_) => "UInt32",
            Value::UInt64(_) => "UInt64",
            Value::UInt128(_) => "UInt128",
            Value::UInt256(_) => "UInt256",
            Value::Word8(_) => "Word8",
            Value::Word16(_) => "Word16",
            Value::Word32(_) => "Word32",
            Value::Word64(_) => "Word64",
            Value::Fix64(_) => "Fix64",
            Value::UFix64(_) => "UFix64",
            Value::Array(_) => "Array",
            Value::Dictionary(_) => "Dictionary",
            Value::Struct(_) => "Struct",
            Value::Resource(_) => "Resource",
            Value::Event(_) => "Event",
            Value::Contract(_) => "Contract",
            Value::Enum(_) => "Enum",
            Value::Path(_) => "Path",
            Value::Type(_) => "Type",
            Value::Capability(_) => "Capability",
        }
    }

    fn integer_repr(&self) -> Option<&str> {
        match self {
            Value::Int(v) |
            Value::Int8(v) |
            Value::Int16(v) |
            Value::Int32(v) |
            Value::Int64(v) |
            Value::Int128(v) |
            Value::Int256(v) |
            Value::UInt(v) |
            Value::UInt8(v) |
            Value::UInt16(v) |
            Value::UInt32(v) |
            Value::UInt64(v) |
            Value::UInt128(v) |
            Value::UInt256(v) |
            Value::Word8(v) |
            Value::Word16(v) |
            Value::Word32(v) |
            Value::Word64(v) => Some(v),
            _ => None,
        }
    }

    /// Checks that every nested value is representable by its Cadence type.
    pub fn validate(&self) -> Result<(), ArgumentError> {
        if let Some(repr) = self.integer_repr() {
            return check_integer(self.type_name(), repr);
        }
        match self {
            Value::Address(a) => Address::from_str(a)
                .map(|_| ())
                .map_err(ArgumentError::from),
            Value::Character(c) if c.graphemes(true).count() != 1 => {
                Err(ArgumentError::InvalidCharacter(c.clone()))
            }
            Value::Fix64(v) => normalize_fix64("Fix64", v).map(|_| ()),
            Value::UFix64(v) => normalize_fix64("UFix64", v).map(|_| ()),
            Value::Optional(Some(inner)) => inner.validate(),
            Value::Array(items) => items.iter().try_for_each(Value::validate),
            Value::Dictionary(entries) => entries.iter().try_for_each(|kv| {
                kv.key.validate()?;
                kv.value.validate()
            }),
            Value::Struct(c) |
            Value::Resource(c) |
            Value::Event(c) |
            Value::Contract(c) |
            Value::Enum(c) => c
                .fields
                .iter()
                .try_for_each(|f| f.value.validate()),
            Value::Capability(cap) => {
                Address::from_str(&cap.address)?;
                cap.path
                    .as_deref()
                    .map_or(Ok(()), Value::validate)
            }
            _ => Ok(()),
        }
    }

    /// Converts into plain JSON, dropping the type annotations.
    ///
    /// Integers that fit into 64 bits become JSON numbers, wider ones stay strings. Fixed point
    /// numbers are always strings to keep their precision.
    pub fn to_native(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        if let Some(repr) = self.integer_repr() {
            if let Ok(v) = repr.parse::<i64>() {
                return Json::from(v);
            }
            if let Ok(v) = repr.parse::<u64>() {
                return Json::from(v);
            }
            return Json::String(repr.to_string());
        }
        match self {
            Value::Void | Value::Optional(None) => Json::Null,
            Value::Optional(Some(inner)) => inner.to_native(),
            Value::Bool(b) => Json::Bool(*b),
            Value::String(s) | Value::Character(s) | Value::Fix64(s) | Value::UFix64(s) => {
                Json::String(s.clone())
            }
            Value::Address(a) => Json::String(with_prefix(a)),
            Value::Array(items) => Json::Array(
                items
                    .iter()
                    .map(Value::to_native)
                    .collect(),
            ),
            Value::Dictionary(entries) => Json::Object(
                entries
                    .iter()
                    .map(|kv| {
                        let key = match kv.key.to_native() {
                            Json::String(s) => s,
                            other => other.to_string(),
                        };
                        (key, kv.value.to_native())
                    })
                    .collect(),
            ),
            Value::Struct(c) |
            Value::Resource(c) |
            Value::Event(c) |
            Value::Contract(c) |
            Value::Enum(c) => Json::Object(
                c.fields
                    .iter()
                    .map(|f| (f.name.clone(), f.value.to_native()))
                    .collect(),
            ),
            Value::Path(p) => {
                let mut map = serde_json::Map::new();
                map.insert("domain".to_string(), Json::String(p.domain.clone()));
                map.insert("identifier".to_string(), Json::String(p.identifier.clone()));
                Json::Object(map)
            }
            Value::Type(t) => t.static_type.clone(),
            Value::Capability(cap) => {
                let mut map = serde_json::Map::new();
                if let Some(id) = &cap.id {
                    map.insert("id".to_string(), Json::String(id.clone()));
                }
                if let Some(path) = &cap.path {
                    map.insert("path".to_string(), path.to_native());
                }
                map.insert("address".to_string(), Json::String(with_prefix(&cap.address)));
                map.insert("borrowType".to_string(), cap.borrow_type.clone());
                Json::Object(map)
            }
            // integers are handled above
            _ => Json::Null,
        }
    }
}

/// Field lookup for composite values, mostly useful when inspecting decoded events.
pub fn composite_fields(composite: &Composite) -> BTreeMap<&str, &Value> {
    composite
        .fields
        .iter()
        .map(|f| (f.name.as_str(), &f.value))
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_json_cadence_encoding() {
        let value = Value::dictionary([(Value::string("a"), Value::uint8(1))]);

        let encoded = serde_json::to_value(&value).unwrap();

        assert_eq!(
            encoded,
            json!({
                "type": "Dictionary",
                "value": [
                    {"key": {"type": "String", "value": "a"}, "value": {"type": "UInt8", "value": "1"}}
                ]
            })
        );
    }

    #[test]
    fn test_void_and_optional_encoding() {
        assert_eq!(serde_json::to_value(Value::Void).unwrap(), json!({"type": "Void"}));
        assert_eq!(
            serde_json::to_value(Value::optional(None)).unwrap(),
            json!({"type": "Optional", "value": null})
        );
        let decoded: Value = serde_json::from_value(json!({"type": "Optional", "value": {"type": "Bool", "value": true}})).unwrap();
        assert_eq!(decoded, Value::optional(Some(Value::bool(true))));
    }

    #[test]
    fn test_decode_composite() {
        let raw = json!({
            "type": "Event",
            "value": {
                "id": "A.0ae53cb6e3f42a79.FlowToken.TokensDeposited",
                "fields": [
                    {"name": "amount", "value": {"type": "UFix64", "value": "1.00000000"}},
                    {"name": "to", "value": {"type": "Optional", "value": {"type": "Address", "value": "0x01cf0e2f2f715450"}}}
                ]
            }
        });

        let value: Value = serde_json::from_value(raw).unwrap();

        assert_eq!(value.to_native(), json!({"amount": "1.00000000", "to": "0x01cf0e2f2f715450"}));
        if let Value::Event(c) = &value {
            assert_eq!(composite_fields(c)["amount"], &Value::UFix64("1.00000000".to_string()));
        } else {
            panic!("expected event");
        }
    }

    #[rstest]
    #[case::uint8_max("UInt8", "255")]
    #[case::int8_min("Int8", "-128")]
    #[case::int_unbounded("Int", "-123456789012345678901234567890")]
    #[case::uint256_max("UInt256", "115792089237316195423570985008687907853269984665640564039457584007913129639935")]
    fn test_integer_in_range(#[case] ty: &str, #[case] repr: &str) {
        assert!(Value::integer(ty, repr).is_ok());
    }

    #[rstest]
    #[case::uint8_overflow("UInt8", "256")]
    #[case::int8_underflow("Int8", "-129")]
    #[case::unsigned_negative("UInt", "-1")]
    #[case::word_overflow("Word16", "65536")]
    fn test_integer_out_of_range(#[case] ty: &str, #[case] repr: &str) {
        assert!(matches!(Value::integer(ty, repr), Err(ArgumentError::OutOfRange { .. })));
    }

    #[test]
    fn test_integer_errors() {
        assert!(matches!(Value::integer("Int", "1.5"), Err(ArgumentError::InvalidNumber { .. })));
        assert_eq!(
            Value::integer("Int512", "1"),
            Err(ArgumentError::UnknownType("Int512".to_string()))
        );
    }

    #[rstest]
    #[case("1", "1.00000000")]
    #[case("0.5", "0.50000000")]
    #[case("007.12345678", "7.12345678")]
    #[case("184467440737.09551615", "184467440737.09551615")]
    fn test_ufix64_normalization(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(Value::ufix64(input).unwrap(), Value::UFix64(expected.to_string()));
    }

    #[test]
    fn test_fix64_limits() {
        assert_eq!(Value::fix64("-1.5").unwrap(), Value::Fix64("-1.50000000".to_string()));
        assert_eq!(Value::fix64("-0").unwrap(), Value::Fix64("0.00000000".to_string()));
        assert!(matches!(Value::ufix64("-1"), Err(ArgumentError::OutOfRange { .. })));
        assert!(matches!(Value::ufix64("184467440737.09551616"), Err(ArgumentError::OutOfRange { .. })));
        assert!(matches!(Value::ufix64("1.123456789"), Err(ArgumentError::TooPrecise { .. })));
        assert!(matches!(Value::ufix64(".5"), Err(ArgumentError::InvalidNumber { .. })));
    }

    #[test]
    fn test_character() {
        assert!(Value::character("a").is_ok());
        assert!(Value::character("🇨🇭").is_ok());
        assert_eq!(Value::character("ab"), Err(ArgumentError::InvalidCharacter("ab".to_string())));
    }

    #[test]
    fn test_validate_nested() {
        let bad = Value::array([Value::uint8(1), Value::UInt8("300".to_string())]);

        assert!(matches!(bad.validate(), Err(ArgumentError::OutOfRange { ty: "UInt8", .. })));
        assert!(Value::array([Value::address("0x01").unwrap()])
            .validate()
            .is_ok());
    }

    #[test]
    fn test_to_native_wide_integers_stay_strings() {
        let value = Value::array([
            Value::uint64(u64::MAX),
            Value::int(-5),
            Value::UInt128("340282366920938463463374607431768211455".to_string()),
        ]);

        assert_eq!(
            value.to_native(),
            json!([u64::MAX, -5, "340282366920938463463374607431768211455"])
        );
    }

    #[test]
    fn test_decode_type_value() {
        let decoded: Value = serde_json::from_value(json!({
            "type": "Type",
            "value": {"staticType": {"kind": "Int"}}
        }))
        .unwrap();

        assert_eq!(decoded.type_name(), "Type");
        assert_eq!(decoded.to_native(), json!({"kind": "Int"}));
    }

    #[test]
    fn test_decode_capability_value() {
        let decoded: Value = serde_json::from_value(json!({
            "type": "Capability",
            "value": {
                "path": {"type": "Path", "value": {"domain": "public", "identifier": "flowTokenReceiver"}},
                "address": "f8d6e0586b0a20c7",
                "borrowType": {"kind": "Reference", "authorized": false, "type": {"kind": "AnyResource"}}
            }
        }))
        .unwrap();

        assert_eq!(decoded.type_name(), "Capability");
        assert!(decoded.validate().is_ok());
        assert_eq!(
            decoded.to_native(),
            json!({
                "path": {"domain": "public", "identifier": "flowTokenReceiver"},
                "address": "0xf8d6e0586b0a20c7",
                "borrowType": {"kind": "Reference", "authorized": false, "type": {"kind": "AnyResource"}}
            })
        );
    }

    #[test]
    fn test_capability_with_bad_address() {
        let decoded: Value = serde_json::from_value(json!({
            "type": "Capability",
            "value": {"id": "3", "address": "0xzz", "borrowType": "&Int"}
        }))
        .unwrap();

        assert!(matches!(decoded.validate(), Err(ArgumentError::InvalidAddress(_))));
    }
}
