//! Type codecs for value slots.
//!
//! A codec turns a [`Value`] into the canonical string stored in a value
//! slot and back. Codecs are selected by the [`TypeTag`] an attribute is
//! declared with; the built-in tags resolve to the codecs below, custom tags
//! resolve through [`CodecRegistry::register`].
//!
//! | Tag | Stored form | Decoded as |
//! |-----|-------------|------------|
//! | `string` | text as is | `String` |
//! | `boolean` | `true` / `false` | `Bool` (only `"true"` is true) |
//! | `date` | `YYYYMMDD` | `Date` |
//! | `date_time` | `YYYYMMDD HH:MM:SS+mmm` | `DateTime` (UTC) |
//! | `number` | sign, exponent and digits, order-preserving | `Decimal` |
//! | `integer` | 16 hex digits, order-preserving | `Integer` |
//! | `json` | JSON text | `Json` |
//! | `generic` | text form | `String` |
//!
//! Nulls encode to the empty string. `date`, `date_time`, `number`,
//! `integer` and `json` decode a blank string back to [`Value::Null`].
//! Accessors never hand an empty slot to a codec: an empty slot reads as
//! [`Value::Null`] for every tag, so a `string` attribute stored as `""`
//! reads back as null.
//!
//! The `number` codec is exact: integers, decimals and numeric text keep
//! every digit, and floats are stored by their shortest decimal form, so
//! `0.1` decodes to the decimal `0.1`. `generic` decodes everything as a
//! string; declare a concrete type when the value must round-trip.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use quill_core::{Error, Result, Value};

/// Declared type of an attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeTag {
    /// No declared type.
    #[default]
    Generic,
    /// Calendar date.
    Date,
    /// Timestamp with millisecond precision.
    DateTime,
    /// Arbitrary-precision number, range-searchable.
    Number,
    /// Whole number.
    Integer,
    /// Text, range-searchable by lexical order.
    String,
    /// Boolean flag.
    Boolean,
    /// Nested JSON structure.
    Json,
    /// Application-defined codec registered by name.
    Custom(String),
}

impl TypeTag {
    /// The tag's configuration name.
    pub fn name(&self) -> &str {
        match self {
            TypeTag::Generic => "generic",
            TypeTag::Date => "date",
            TypeTag::DateTime => "date_time",
            TypeTag::Number => "number",
            TypeTag::Integer => "integer",
            TypeTag::String => "string",
            TypeTag::Boolean => "boolean",
            TypeTag::Json => "json",
            TypeTag::Custom(name) => name,
        }
    }
}

impl From<&str> for TypeTag {
    fn from(name: &str) -> Self {
        match name {
            "generic" => TypeTag::Generic,
            "date" => TypeTag::Date,
            "date_time" => TypeTag::DateTime,
            "number" => TypeTag::Number,
            "integer" => TypeTag::Integer,
            "string" => TypeTag::String,
            "boolean" => TypeTag::Boolean,
            "json" => TypeTag::Json,
            other => TypeTag::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Encode/decode pair for one attribute type.
///
/// Implementations must satisfy `decode(encode(v)) == v` for the values of
/// their domain.
pub trait TypeCodec: Send + Sync {
    /// Encode a value into its stored string form.
    fn encode(&self, value: &Value) -> Result<String>;

    /// Decode a stored string.
    fn decode(&self, encoded: &str) -> Result<Value>;
}

// ============================================================================
// Built-in codecs
// ============================================================================

/// Identity codec for text.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl TypeCodec for StringCodec {
    fn encode(&self, value: &Value) -> Result<String> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Ok(other.to_text().unwrap_or_default()),
        }
    }

    fn decode(&self, encoded: &str) -> Result<Value> {
        Ok(Value::String(encoded.to_string()))
    }
}

/// `"true"` / `"false"` codec.
///
/// Decoding is case-sensitive: only the exact string `"true"` is true.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanCodec;

impl TypeCodec for BooleanCodec {
    fn encode(&self, value: &Value) -> Result<String> {
        match value {
            Value::Null => Ok(String::new()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(Error::type_mismatch("boolean", other.kind())),
        }
    }

    fn decode(&self, encoded: &str) -> Result<Value> {
        Ok(Value::Bool(encoded == "true"))
    }
}

/// `YYYYMMDD` codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateCodec;

impl TypeCodec for DateCodec {
    fn encode(&self, value: &Value) -> Result<String> {
        match value {
            Value::Null => Ok(String::new()),
            Value::Date(d) => Ok(encode_date(*d)),
            Value::DateTime(dt) => Ok(encode_date(dt.date_naive())),
            other => Err(Error::type_mismatch("date", other.kind())),
        }
    }

    fn decode(&self, encoded: &str) -> Result<Value> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Ok(Value::Null);
        }
        parse_compact_date(encoded).map(Value::Date)
    }
}

/// `YYYYMMDD HH:MM:SS+mmm` codec (UTC, millisecond precision).
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeCodec;

impl TypeCodec for DateTimeCodec {
    fn encode(&self, value: &Value) -> Result<String> {
        match value {
            Value::Null => Ok(String::new()),
            Value::DateTime(dt) => Ok(encode_date_time(dt)),
            Value::Date(d) => Ok(encode_date_time(&NaiveDateTime::new(*d, NaiveTime::MIN).and_utc())),
            other => Err(Error::type_mismatch("date_time", other.kind())),
        }
    }

    fn decode(&self, encoded: &str) -> Result<Value> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Ok(Value::Null);
        }
        parse_date_time(encoded).map(Value::DateTime)
    }
}

/// Order-preserving codec for arbitrary-precision numbers.
///
/// Accepts integers, floats, decimals, JSON numbers and numeric text.
/// Decodes to [`Value::Decimal`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberCodec;

impl TypeCodec for NumberCodec {
    fn encode(&self, value: &Value) -> Result<String> {
        let number = match value {
            Value::Null => return Ok(String::new()),
            Value::Integer(i) => BigDecimal::from(*i),
            Value::Float(f) => decimal_from_f64(*f)?,
            Value::Decimal(d) => d.clone(),
            Value::String(s) => {
                parse_number(s).ok_or_else(|| Error::type_mismatch("number", value.kind()))?
            }
            Value::Json(serde_json::Value::Number(n)) => parse_number(&n.to_string())
                .ok_or_else(|| Error::value(format!("{n} cannot be stored as a number")))?,
            other => return Err(Error::type_mismatch("number", other.kind())),
        };
        Ok(sortable_serialise(&number))
    }

    fn decode(&self, encoded: &str) -> Result<Value> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Ok(Value::Null);
        }
        sortable_unserialise(encoded).map(Value::Decimal)
    }
}

/// Parse decimal text such as `42`, `-0.5` or `1.5e3`.
pub fn parse_number(text: &str) -> Option<BigDecimal> {
    let text = text.trim();
    let numeric = text
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'));
    if text.is_empty() || !numeric || !text.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    BigDecimal::from_str(text).ok()
}

fn decimal_from_f64(value: f64) -> Result<BigDecimal> {
    if !value.is_finite() {
        return Err(Error::value(format!("{value} cannot be stored as a number")));
    }
    BigDecimal::from_str(&value.to_string()).map_err(|e| Error::value(e.to_string()))
}

/// Order-preserving codec for whole numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerCodec;

impl TypeCodec for IntegerCodec {
    fn encode(&self, value: &Value) -> Result<String> {
        match value {
            Value::Null => Ok(String::new()),
            Value::Integer(i) => Ok(sortable_serialise_i64(*i)),
            other => Err(Error::type_mismatch("integer", other.kind())),
        }
    }

    fn decode(&self, encoded: &str) -> Result<Value> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Ok(Value::Null);
        }
        sortable_unserialise_i64(encoded).map(Value::Integer)
    }
}

/// JSON text codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl TypeCodec for JsonCodec {
    fn encode(&self, value: &Value) -> Result<String> {
        match value {
            Value::Null | Value::Json(serde_json::Value::Null) => Ok(String::new()),
            other => {
                let json = to_json(other)?;
                serde_json::to_string(&json).map_err(|e| Error::value(e.to_string()))
            }
        }
    }

    fn decode(&self, encoded: &str) -> Result<Value> {
        if encoded.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(encoded)
            .map(Value::Json)
            .map_err(|e| Error::value(format!("invalid JSON '{encoded}': {e}")))
    }
}

/// Codec for untyped attributes: stores the text form, decodes to a string.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericCodec;

impl TypeCodec for GenericCodec {
    fn encode(&self, value: &Value) -> Result<String> {
        Ok(value.to_text().unwrap_or_default())
    }

    fn decode(&self, encoded: &str) -> Result<Value> {
        Ok(Value::String(encoded.to_string()))
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Resolves type tags to codecs.
///
/// Built-in tags always resolve. Custom tags must be registered first.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    custom: BTreeMap<String, Arc<dyn TypeCodec>>,
}

impl CodecRegistry {
    /// Create a registry with only the built-in codecs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a codec for `TypeTag::Custom(name)`.
    ///
    /// Replaces any codec previously registered under the same name.
    pub fn register(&mut self, name: impl Into<String>, codec: Arc<dyn TypeCodec>) {
        self.custom.insert(name.into(), codec);
    }

    /// Resolve the codec for a tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTypeTag`] for an unregistered custom tag.
    pub fn codec_for(&self, tag: &TypeTag) -> Result<Arc<dyn TypeCodec>> {
        let codec: Arc<dyn TypeCodec> = match tag {
            TypeTag::Generic => Arc::new(GenericCodec),
            TypeTag::Date => Arc::new(DateCodec),
            TypeTag::DateTime => Arc::new(DateTimeCodec),
            TypeTag::Number => Arc::new(NumberCodec),
            TypeTag::Integer => Arc::new(IntegerCodec),
            TypeTag::String => Arc::new(StringCodec),
            TypeTag::Boolean => Arc::new(BooleanCodec),
            TypeTag::Json => Arc::new(JsonCodec),
            TypeTag::Custom(name) => {
                return self
                    .custom
                    .get(name)
                    .cloned()
                    .ok_or_else(|| Error::UnknownTypeTag { tag: name.clone() });
            }
        };
        Ok(codec)
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// Sortable serialisation
// ============================================================================

const SIGN_BIT: u64 = 1 << 63;

const NEGATIVE: char = '1';
const ZERO: char = '2';
const POSITIVE: char = '3';
const NEGATIVE_END: char = '~';

/// Encode a decimal so that string order equals numeric order.
///
/// A nonzero value `0.d1d2..dn x 10^e` (with `d1 != 0` and no trailing zero
/// digit) is stored as a sign marker, the exponent `e` in the 16-digit
/// [`sortable_serialise_i64`] form, then the digits. Negative values store
/// the bitwise complement of the exponent and nine's complement digits
/// closed by `~`, which reverses their order. Zero is the single marker
/// `2`, between the negative `1` and positive `3` markers.
///
/// Equal values encode identically whatever their scale: `1.50` and `1.5`
/// share an encoding.
pub fn sortable_serialise(value: &BigDecimal) -> String {
    let (int, scale) = value.normalized().as_bigint_and_exponent();
    let int = int.to_string();
    let (negative, digits) = match int.strip_prefix('-') {
        Some(magnitude) => (true, magnitude),
        None => (false, int.as_str()),
    };
    if digits == "0" {
        return ZERO.to_string();
    }

    let exponent = digits.len() as i64 - scale;
    let mut encoded = String::with_capacity(digits.len() + 18);
    if negative {
        encoded.push(NEGATIVE);
        encoded.push_str(&sortable_serialise_i64(!exponent));
        encoded.extend(digits.bytes().map(|b| char::from(b'9' - (b - b'0'))));
        encoded.push(NEGATIVE_END);
    } else {
        encoded.push(POSITIVE);
        encoded.push_str(&sortable_serialise_i64(exponent));
        encoded.push_str(digits);
    }
    encoded
}

/// Decode a string produced by [`sortable_serialise`].
pub fn sortable_unserialise(encoded: &str) -> Result<BigDecimal> {
    let invalid = || Error::value(format!("'{encoded}' is not a sortable number encoding"));
    let mut chars = encoded.chars();
    let marker = chars.next().ok_or_else(invalid)?;
    if marker == ZERO && encoded.len() == 1 {
        return Ok(BigDecimal::from(0));
    }
    let rest = chars.as_str();
    let (exponent, digits) = match (marker, rest.get(..16), rest.get(16..)) {
        (POSITIVE | NEGATIVE, Some(exponent), Some(digits)) => (exponent, digits),
        _ => return Err(invalid()),
    };
    let exponent = sortable_unserialise_i64(exponent).map_err(|_| invalid())?;

    let (sign, exponent, digits) = if marker == NEGATIVE {
        let digits = digits.strip_suffix(NEGATIVE_END).ok_or_else(invalid)?;
        let restored: String = digits
            .bytes()
            .map(|b| char::from(b'9'.wrapping_sub(b.wrapping_sub(b'0'))))
            .collect();
        ("-", !exponent, restored)
    } else {
        ("", exponent, digits.to_string())
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let scale_shift = exponent
        .checked_sub(digits.len() as i64)
        .ok_or_else(invalid)?;
    BigDecimal::from_str(&format!("{sign}{digits}e{scale_shift}")).map_err(|_| invalid())
}

/// Encode an `i64` so that string order equals numeric order.
pub fn sortable_serialise_i64(value: i64) -> String {
    format!("{:016X}", (value as u64) ^ SIGN_BIT)
}

/// Decode a string produced by [`sortable_serialise_i64`].
pub fn sortable_unserialise_i64(encoded: &str) -> Result<i64> {
    parse_hex_key(encoded).map(|key| (key ^ SIGN_BIT) as i64)
}

fn parse_hex_key(encoded: &str) -> Result<u64> {
    if encoded.len() != 16 || !encoded.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::value(format!(
            "'{encoded}' is not a sortable number encoding"
        )));
    }
    u64::from_str_radix(encoded, 16).map_err(|e| Error::value(e.to_string()))
}

// ============================================================================
// Date helpers
// ============================================================================

fn encode_date(date: NaiveDate) -> String {
    format!("{:04}{:02}{:02}", date.year(), date.month(), date.day())
}

fn encode_date_time(dt: &DateTime<Utc>) -> String {
    format!(
        "{} {:02}:{:02}:{:02}+{:03}",
        encode_date(dt.date_naive()),
        dt.hour(),
        dt.minute(),
        dt.second(),
        dt.timestamp_subsec_millis().min(999)
    )
}

fn digits(text: &str, range: std::ops::Range<usize>) -> Option<u32> {
    let part = text.get(range)?;
    if part.bytes().all(|b| b.is_ascii_digit()) {
        part.parse().ok()
    } else {
        None
    }
}

/// Parse an 8-digit `YYYYMMDD` date.
pub(crate) fn parse_compact_date(text: &str) -> Result<NaiveDate> {
    let invalid = || Error::value(format!("'{text}' is not a valid YYYYMMDD date"));
    if text.len() != 8 {
        return Err(invalid());
    }
    let year = digits(text, 0..4).ok_or_else(invalid)?;
    let month = digits(text, 4..6).ok_or_else(invalid)?;
    let day = digits(text, 6..8).ok_or_else(invalid)?;
    NaiveDate::from_ymd_opt(year as i32, month, day).ok_or_else(invalid)
}

fn parse_date_time(text: &str) -> Result<DateTime<Utc>> {
    let invalid = || {
        Error::value(format!(
            "'{text}' is not a valid YYYYMMDD HH:MM:SS+mmm timestamp"
        ))
    };
    let bytes = text.as_bytes();
    if bytes.len() != 21
        || bytes[8] != b' '
        || bytes[11] != b':'
        || bytes[14] != b':'
        || bytes[17] != b'+'
    {
        return Err(invalid());
    }
    let date = parse_compact_date(&text[0..8]).map_err(|_| invalid())?;
    let hour = digits(text, 9..11).ok_or_else(invalid)?;
    let minute = digits(text, 12..14).ok_or_else(invalid)?;
    let second = digits(text, 15..17).ok_or_else(invalid)?;
    let milli = digits(text, 18..21).ok_or_else(invalid)?;
    let time = NaiveTime::from_hms_milli_opt(hour, minute, second, milli).ok_or_else(invalid)?;
    Ok(NaiveDateTime::new(date, time).and_utc())
}

fn to_json(value: &Value) -> Result<serde_json::Value> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Integer(i) => serde_json::Value::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .ok_or_else(|| Error::value(format!("{f} cannot be represented in JSON")))?,
        Value::Decimal(d) => serde_json::Value::String(d.to_string()),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
        Value::DateTime(dt) => serde_json::Value::String(dt.to_rfc3339()),
        Value::Json(json) => json.clone(),
        Value::List(items) => {
            serde_json::Value::Array(items.iter().map(to_json).collect::<Result<Vec<_>>>()?)
        }
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn codec(tag: TypeTag) -> Arc<dyn TypeCodec> {
        CodecRegistry::new().codec_for(&tag).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ------------------------------------------------------------------------
    // Registry tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_type_tag_from_name() {
        assert_eq!(TypeTag::from("date_time"), TypeTag::DateTime);
        assert_eq!(TypeTag::from("money"), TypeTag::Custom("money".to_string()));
        assert_eq!(TypeTag::Number.to_string(), "number");
    }

    #[test]
    fn test_unknown_custom_tag_fails() {
        let registry = CodecRegistry::new();
        let err = registry
            .codec_for(&TypeTag::Custom("money".to_string()))
            .err()
            .unwrap();
        assert!(matches!(err, Error::UnknownTypeTag { ref tag } if tag == "money"));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_custom_codec_registration() {
        struct Upper;
        impl TypeCodec for Upper {
            fn encode(&self, value: &Value) -> Result<String> {
                Ok(value.to_text().unwrap_or_default().to_uppercase())
            }
            fn decode(&self, encoded: &str) -> Result<Value> {
                Ok(Value::String(encoded.to_lowercase()))
            }
        }

        let mut registry = CodecRegistry::new();
        registry.register("upper", Arc::new(Upper));
        let codec = registry
            .codec_for(&TypeTag::Custom("upper".to_string()))
            .unwrap();
        assert_eq!(codec.encode(&Value::from("abc")).unwrap(), "ABC");
        assert_eq!(codec.decode("ABC").unwrap(), Value::from("abc"));
    }

    // ------------------------------------------------------------------------
    // String and boolean
    // ------------------------------------------------------------------------

    #[test]
    fn test_string_identity() {
        let c = codec(TypeTag::String);
        assert_eq!(c.encode(&Value::from("Grüße")).unwrap(), "Grüße");
        assert_eq!(c.decode("Grüße").unwrap(), Value::from("Grüße"));
        assert_eq!(c.encode(&Value::Null).unwrap(), "");
    }

    #[test]
    fn test_boolean_codec() {
        let c = codec(TypeTag::Boolean);
        assert_eq!(c.encode(&Value::Bool(true)).unwrap(), "true");
        assert_eq!(c.encode(&Value::Bool(false)).unwrap(), "false");
        assert_eq!(c.decode("true").unwrap(), Value::Bool(true));
        assert_eq!(c.decode("false").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_boolean_decode_is_case_sensitive() {
        let c = codec(TypeTag::Boolean);
        assert_eq!(c.decode("TRUE").unwrap(), Value::Bool(false));
        assert_eq!(c.decode("anything-else").unwrap(), Value::Bool(false));
        assert_eq!(c.decode("").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_boolean_rejects_other_types() {
        let err = codec(TypeTag::Boolean).encode(&Value::from("yes")).unwrap_err();
        assert!(matches!(err, Error::Type { expected: "boolean", .. }));
    }

    // ------------------------------------------------------------------------
    // Dates
    // ------------------------------------------------------------------------

    #[test]
    fn test_date_encode() {
        let c = codec(TypeTag::Date);
        assert_eq!(c.encode(&Value::from(date(2011, 1, 1))).unwrap(), "20110101");
    }

    #[test]
    fn test_date_decode() {
        let c = codec(TypeTag::Date);
        assert_eq!(c.decode("20110101").unwrap(), Value::from(date(2011, 1, 1)));
    }

    #[test]
    fn test_date_decode_blank_is_null() {
        let c = codec(TypeTag::Date);
        assert_eq!(c.decode(" ").unwrap(), Value::Null);
        assert_eq!(c.decode("").unwrap(), Value::Null);
    }

    #[test]
    fn test_date_decode_malformed_fails() {
        let c = codec(TypeTag::Date);
        assert!(c.decode("not a date").unwrap_err().is_value_error());
        assert!(c.decode("20111301").is_err());
        assert!(c.decode("2011010").is_err());
    }

    #[test]
    fn test_date_encode_non_date_fails() {
        let err = codec(TypeTag::Date).encode(&Value::from("2011-01-01")).unwrap_err();
        assert!(matches!(err, Error::Type { expected: "date", .. }));
    }

    #[test]
    fn test_date_null_roundtrip() {
        let c = codec(TypeTag::Date);
        let encoded = c.encode(&Value::Null).unwrap();
        assert_eq!(c.decode(&encoded).unwrap(), Value::Null);
    }

    #[test]
    fn test_date_time_format() {
        let c = codec(TypeTag::DateTime);
        let dt = Utc.with_ymd_and_hms(2011, 1, 2, 3, 4, 5).unwrap()
            + chrono::Duration::milliseconds(67);
        let encoded = c.encode(&Value::from(dt)).unwrap();
        assert_eq!(encoded, "20110102 03:04:05+067");
        assert_eq!(c.decode(&encoded).unwrap(), Value::from(dt));
    }

    #[test]
    fn test_date_time_from_date_is_midnight() {
        let c = codec(TypeTag::DateTime);
        let encoded = c.encode(&Value::from(date(2020, 2, 29))).unwrap();
        assert_eq!(encoded, "20200229 00:00:00+000");
    }

    #[test]
    fn test_date_time_decode_errors() {
        let c = codec(TypeTag::DateTime);
        assert_eq!(c.decode("  ").unwrap(), Value::Null);
        assert!(c.decode("20110102 03:04:05").is_err());
        assert!(c.decode("20110102 25:04:05+000").is_err());
        assert!(c.encode(&Value::from(5)).is_err());
    }

    // ------------------------------------------------------------------------
    // Numbers
    // ------------------------------------------------------------------------

    fn decimal(text: &str) -> BigDecimal {
        BigDecimal::from_str(text).unwrap()
    }

    #[test]
    fn test_number_roundtrip() {
        let c = codec(TypeTag::Number);
        for n in ["0", "1.5", "-1.5", "1e300", "-1e-300", "42", "0.001", "-250"] {
            let encoded = c.encode(&Value::from(decimal(n))).unwrap();
            assert_eq!(c.decode(&encoded).unwrap(), Value::Decimal(decimal(n)), "{n}");
        }
    }

    #[test]
    fn test_number_keeps_integers_beyond_f64_precision() {
        let c = codec(TypeTag::Number);
        let big = 9_007_199_254_740_993_i64;
        let encoded = c.encode(&Value::from(big)).unwrap();
        assert_eq!(c.decode(&encoded).unwrap(), Value::Decimal(BigDecimal::from(big)));
        assert_ne!(encoded, c.encode(&Value::from(big - 1)).unwrap());
        assert!(c.encode(&Value::from(big - 1)).unwrap() < encoded);
    }

    #[test]
    fn test_number_keeps_decimal_fractions() {
        let c = codec(TypeTag::Number);
        let encoded = c.encode(&Value::from(0.1)).unwrap();
        assert_eq!(c.decode(&encoded).unwrap(), Value::Decimal(decimal("0.1")));

        let precise = decimal("12345678901234567890.123456789");
        let encoded = c.encode(&Value::from(precise.clone())).unwrap();
        assert_eq!(c.decode(&encoded).unwrap(), Value::Decimal(precise));
    }

    #[test]
    fn test_number_accepts_integers_and_numeric_text() {
        let c = codec(TypeTag::Number);
        let from_int = c.encode(&Value::from(7)).unwrap();
        assert_eq!(c.decode(&from_int).unwrap(), Value::Decimal(decimal("7")));
        assert_eq!(c.encode(&Value::from("7.0")).unwrap(), from_int);
        assert_eq!(c.encode(&Value::from(7.0)).unwrap(), from_int);
        assert_eq!(
            c.encode(&Value::from(serde_json::json!(7))).unwrap(),
            from_int
        );
    }

    #[test]
    fn test_number_rejects_text() {
        let c = codec(TypeTag::Number);
        assert!(matches!(
            c.encode(&Value::from("seven")).unwrap_err(),
            Error::Type { expected: "number", .. }
        ));
        assert!(c.encode(&Value::Float(f64::NAN)).is_err());
        assert!(c.encode(&Value::Float(f64::INFINITY)).is_err());
        assert!(c.encode(&Value::from(true)).is_err());
    }

    #[test]
    fn test_number_decode_malformed_fails() {
        let c = codec(TypeTag::Number);
        assert_eq!(c.decode(" ").unwrap(), Value::Null);
        assert!(c.decode("3").unwrap_err().is_value_error());
        assert!(c.decode("C045000000000000").is_err());
        assert!(c.decode("18000000000000001").is_err());
    }

    #[test]
    fn test_zero_has_one_encoding() {
        assert_eq!(sortable_serialise(&decimal("-0.00")), sortable_serialise(&decimal("0")));
        assert_eq!(sortable_serialise(&decimal("0")), "2");
    }

    #[test]
    fn test_number_encoding_ignores_scale() {
        assert_eq!(
            sortable_serialise(&decimal("1.50")),
            sortable_serialise(&decimal("1.5"))
        );
    }

    #[test]
    fn test_negative_prefix_ordering() {
        let shorter = sortable_serialise(&decimal("-0.12"));
        let longer = sortable_serialise(&decimal("-0.123"));
        assert!(longer < shorter);
        assert!(sortable_serialise(&decimal("-1000")) < sortable_serialise(&decimal("-999")));
        assert!(sortable_serialise(&decimal("-0.001")) < sortable_serialise(&decimal("0")));
    }

    #[test]
    fn test_integer_codec() {
        let c = codec(TypeTag::Integer);
        let encoded = c.encode(&Value::from(-12)).unwrap();
        assert_eq!(encoded.len(), 16);
        assert_eq!(c.decode(&encoded).unwrap(), Value::Integer(-12));
        assert_eq!(c.decode("").unwrap(), Value::Null);
        assert!(c.decode("12").unwrap_err().is_value_error());
        assert!(c.encode(&Value::from(1.5)).is_err());
    }

    // ------------------------------------------------------------------------
    // JSON and generic
    // ------------------------------------------------------------------------

    #[test]
    fn test_json_roundtrip() {
        let c = codec(TypeTag::Json);
        let json = serde_json::json!({"tags": ["a", "b"], "n": 1});
        let encoded = c.encode(&Value::from(json.clone())).unwrap();
        assert_eq!(c.decode(&encoded).unwrap(), Value::Json(json));
    }

    #[test]
    fn test_json_null_passthrough() {
        let c = codec(TypeTag::Json);
        assert_eq!(c.encode(&Value::Null).unwrap(), "");
        assert_eq!(c.decode("").unwrap(), Value::Null);
    }

    #[test]
    fn test_json_invalid_fails() {
        let c = codec(TypeTag::Json);
        assert!(c.decode("{not json").unwrap_err().is_value_error());
        assert!(c.encode(&Value::Float(f64::INFINITY)).is_err());
    }

    #[test]
    fn test_generic_stores_text() {
        let c = codec(TypeTag::Generic);
        assert_eq!(c.encode(&Value::from(12)).unwrap(), "12");
        assert_eq!(c.decode("12").unwrap(), Value::from("12"));
    }

    // ------------------------------------------------------------------------
    // Ordering properties
    // ------------------------------------------------------------------------

    proptest! {
        #[test]
        fn test_number_encoding_preserves_order(
            a in any::<i64>(),
            b in any::<i64>(),
            a_scale in -20i64..20,
            b_scale in -20i64..20,
        ) {
            let a = BigDecimal::new(a.into(), a_scale);
            let b = BigDecimal::new(b.into(), b_scale);
            let ea = sortable_serialise(&a);
            let eb = sortable_serialise(&b);
            prop_assert_eq!(a.cmp(&b), ea.cmp(&eb));
        }

        #[test]
        fn test_integer_encoding_preserves_order(a in any::<i64>(), b in any::<i64>()) {
            let ea = sortable_serialise_i64(a);
            let eb = sortable_serialise_i64(b);
            prop_assert_eq!(a.cmp(&b), ea.cmp(&eb));
        }

        #[test]
        fn test_number_roundtrip_law(n in any::<i64>(), scale in -30i64..30) {
            let value = BigDecimal::new(n.into(), scale);
            let decoded = sortable_unserialise(&sortable_serialise(&value)).unwrap();
            prop_assert_eq!(decoded, value);
        }
    }
}
