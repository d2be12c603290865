//! Single-cell scalar codecs (spec §4.4).

use std::cmp::Ordering;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::trace;
use uuid::Uuid;

use crate::error::CodecError;
use crate::limits::POSITIVE_INTEGER_BOUND;
use crate::operator::{render_condition, FilterOp, FilterOperand};
use crate::row::Row;
use crate::slug::{decode_slug, encode_slug};
use crate::value::EntityType;

/// UTF-8 string scalar.
pub struct StringType {
    property: String,
}

impl StringType {
    pub fn new(property: impl Into<String>) -> Self {
        Self { property: property.into() }
    }
}

impl EntityType for StringType {
    type Value = String;

    fn property(&self) -> &str {
        &self.property
    }

    fn type_name(&self) -> &'static str {
        "String"
    }

    fn ordered(&self) -> bool {
        true
    }

    fn comparable(&self) -> bool {
        true
    }

    fn validate(&self, _value: &String) -> Result<(), CodecError> {
        Ok(())
    }

    fn serialize(&self, row: &mut Row, value: &String) -> Result<(), CodecError> {
        trace!(property = %self.property, type_name = self.type_name(), "serialize");
        self.validate(value)?;
        row.set_str(self.property.clone(), value.clone());
        Ok(())
    }

    fn deserialize(&self, row: &Row) -> Result<String, CodecError> {
        let value = row.expect_str(self.type_name(), &self.property, &self.property)?.to_string();
        self.validate(&value)?;
        Ok(value)
    }

    fn equal(&self, a: &String, b: &String) -> bool {
        a == b
    }

    fn clone_value(&self, value: &String) -> String {
        value.clone()
    }

    fn string(&self, value: &String) -> Result<String, CodecError> {
        Ok(value.clone())
    }

    fn filter_condition(&self, op: FilterOp, operand: &FilterOperand) -> Result<String, CodecError> {
        Ok(render_condition(&self.property, op, operand))
    }

    fn compare(&self, a: &String, b: &String) -> Result<Ordering, CodecError> {
        Ok(a.cmp(b))
    }
}

/// Boolean scalar. Not `ordered` (spec §4.4's matrix).
pub struct BooleanType {
    property: String,
}

impl BooleanType {
    pub fn new(property: impl Into<String>) -> Self {
        Self { property: property.into() }
    }
}

impl EntityType for BooleanType {
    type Value = bool;

    fn property(&self) -> &str {
        &self.property
    }

    fn type_name(&self) -> &'static str {
        "Boolean"
    }

    fn comparable(&self) -> bool {
        true
    }

    fn validate(&self, _value: &bool) -> Result<(), CodecError> {
        Ok(())
    }

    fn serialize(&self, row: &mut Row, value: &bool) -> Result<(), CodecError> {
        trace!(property = %self.property, type_name = self.type_name(), "serialize");
        row.set_bool(self.property.clone(), *value);
        Ok(())
    }

    fn deserialize(&self, row: &Row) -> Result<bool, CodecError> {
        row.expect_bool(self.type_name(), &self.property, &self.property)
    }

    fn equal(&self, a: &bool, b: &bool) -> bool {
        a == b
    }

    fn clone_value(&self, value: &bool) -> bool {
        *value
    }

    fn string(&self, value: &bool) -> Result<String, CodecError> {
        Ok(if *value { "true".to_string() } else { "false".to_string() })
    }

    fn filter_condition(&self, op: FilterOp, operand: &FilterOperand) -> Result<String, CodecError> {
        Ok(render_condition(&self.property, op, operand))
    }
}

/// Wire tag for a number serialized as a string because it overflows `i32`.
const EDM_INT64: &str = "Edm.Int64";

fn is_big_int(value: f64) -> bool {
    value.fract() == 0.0 && value.abs() >= 2f64.powi(31)
}

/// Shared number-cell wire encoding for `NumberType` and `PositiveIntegerType`
/// (spec §9's "messages should include the type-variant name" - each caller
/// passes its own `type_name` so errors never leak `NumberType`'s name for a
/// `PositiveInteger` cell).
fn encode_number_cell(row: &mut Row, property: &str, value: f64) {
    if is_big_int(value) {
        row.set_str(property.to_string(), format!("{}", value as i64));
        row.set_annotation(property, EDM_INT64);
    } else {
        row.set_num(property.to_string(), value);
    }
}

fn decode_number_cell(row: &Row, type_name: &'static str, property: &str) -> Result<f64, CodecError> {
    if row.annotation(property) == Some(EDM_INT64) {
        let raw = row.expect_str(type_name, property, property)?;
        Ok(raw
            .parse::<i64>()
            .map_err(|e| CodecError::decode_failure(type_name, property, format!("{e}")))? as f64)
    } else {
        row.expect_num(type_name, property, property)
    }
}

/// Double-precision number scalar, with big-integer overflow to a string
/// cell plus `Edm.Int64` annotation (spec §4.4).
pub struct NumberType {
    property: String,
}

impl NumberType {
    pub fn new(property: impl Into<String>) -> Self {
        Self { property: property.into() }
    }
}

impl EntityType for NumberType {
    type Value = f64;

    fn property(&self) -> &str {
        &self.property
    }

    fn type_name(&self) -> &'static str {
        "Number"
    }

    fn ordered(&self) -> bool {
        true
    }

    fn comparable(&self) -> bool {
        true
    }

    fn validate(&self, value: &f64) -> Result<(), CodecError> {
        if value.is_nan() || value.is_infinite() {
            return Err(CodecError::format_invalid(self.type_name(), &self.property, "number must be finite"));
        }
        Ok(())
    }

    fn serialize(&self, row: &mut Row, value: &f64) -> Result<(), CodecError> {
        trace!(property = %self.property, type_name = self.type_name(), "serialize");
        self.validate(value)?;
        encode_number_cell(row, &self.property, *value);
        Ok(())
    }

    fn deserialize(&self, row: &Row) -> Result<f64, CodecError> {
        let value = decode_number_cell(row, self.type_name(), &self.property)?;
        self.validate(&value)?;
        Ok(value)
    }

    fn equal(&self, a: &f64, b: &f64) -> bool {
        a == b
    }

    fn clone_value(&self, value: &f64) -> f64 {
        *value
    }

    fn string(&self, value: &f64) -> Result<String, CodecError> {
        Ok(value.to_string())
    }

    fn filter_condition(&self, op: FilterOp, operand: &FilterOperand) -> Result<String, CodecError> {
        Ok(render_condition(&self.property, op, operand))
    }

    fn compare(&self, a: &f64, b: &f64) -> Result<Ordering, CodecError> {
        a.partial_cmp(b)
            .ok_or_else(|| CodecError::format_invalid(self.type_name(), &self.property, "NaN is not orderable"))
    }
}

/// Non-negative integer scalar, `<= 2^32 - 1` (spec §4.4, §9). Shares
/// `NumberType`'s wire encoding via the free `encode_number_cell`/
/// `decode_number_cell` helpers rather than delegating to a `NumberType`
/// value, so errors report this type's own name instead of `"Number"`.
pub struct PositiveIntegerType {
    property: String,
}

impl PositiveIntegerType {
    pub fn new(property: impl Into<String>) -> Self {
        Self { property: property.into() }
    }
}

impl EntityType for PositiveIntegerType {
    type Value = u64;

    fn property(&self) -> &str {
        &self.property
    }

    fn type_name(&self) -> &'static str {
        "PositiveInteger"
    }

    fn ordered(&self) -> bool {
        true
    }

    fn comparable(&self) -> bool {
        true
    }

    fn validate(&self, value: &u64) -> Result<(), CodecError> {
        if *value >= POSITIVE_INTEGER_BOUND {
            return Err(CodecError::format_invalid(
                self.type_name(),
                self.property(),
                format!("{value} exceeds the 2^32 bound"),
            ));
        }
        Ok(())
    }

    fn serialize(&self, row: &mut Row, value: &u64) -> Result<(), CodecError> {
        trace!(property = %self.property, type_name = self.type_name(), "serialize");
        self.validate(value)?;
        encode_number_cell(row, &self.property, *value as f64);
        Ok(())
    }

    fn deserialize(&self, row: &Row) -> Result<u64, CodecError> {
        let value = decode_number_cell(row, self.type_name(), &self.property)?;
        if value < 0.0 || value.fract() != 0.0 {
            return Err(CodecError::format_invalid(self.type_name(), self.property(), "value is not a non-negative integer"));
        }
        let as_u64 = value as u64;
        self.validate(&as_u64)?;
        Ok(as_u64)
    }

    fn equal(&self, a: &u64, b: &u64) -> bool {
        a == b
    }

    fn clone_value(&self, value: &u64) -> u64 {
        *value
    }

    fn string(&self, value: &u64) -> Result<String, CodecError> {
        Ok(value.to_string())
    }

    fn filter_condition(&self, op: FilterOp, operand: &FilterOperand) -> Result<String, CodecError> {
        Ok(render_condition(self.property(), op, operand))
    }

    fn compare(&self, a: &u64, b: &u64) -> Result<Ordering, CodecError> {
        Ok(a.cmp(b))
    }
}

const EDM_DATETIME: &str = "Edm.DateTime";

/// ISO-8601 instant scalar, millisecond-precision equality (spec §4.4).
pub struct DateType {
    property: String,
}

impl DateType {
    pub fn new(property: impl Into<String>) -> Self {
        Self { property: property.into() }
    }
}

impl EntityType for DateType {
    type Value = DateTime<Utc>;

    fn property(&self) -> &str {
        &self.property
    }

    fn type_name(&self) -> &'static str {
        "Date"
    }

    fn ordered(&self) -> bool {
        true
    }

    fn comparable(&self) -> bool {
        true
    }

    fn validate(&self, _value: &DateTime<Utc>) -> Result<(), CodecError> {
        Ok(())
    }

    fn serialize(&self, row: &mut Row, value: &DateTime<Utc>) -> Result<(), CodecError> {
        trace!(property = %self.property, type_name = self.type_name(), "serialize");
        row.set_str(self.property.clone(), value.to_rfc3339_opts(SecondsFormat::Millis, true));
        row.set_annotation(&self.property, EDM_DATETIME);
        Ok(())
    }

    fn deserialize(&self, row: &Row) -> Result<DateTime<Utc>, CodecError> {
        let raw = row.expect_str(self.type_name(), &self.property, &self.property)?;
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| CodecError::format_invalid(self.type_name(), &self.property, format!("{e}")))
    }

    fn equal(&self, a: &DateTime<Utc>, b: &DateTime<Utc>) -> bool {
        a.timestamp_millis() == b.timestamp_millis()
    }

    fn clone_value(&self, value: &DateTime<Utc>) -> DateTime<Utc> {
        *value
    }

    fn string(&self, value: &DateTime<Utc>) -> Result<String, CodecError> {
        Ok(value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    fn filter_condition(&self, op: FilterOp, operand: &FilterOperand) -> Result<String, CodecError> {
        Ok(render_condition(&self.property, op, operand))
    }

    fn compare(&self, a: &DateTime<Utc>, b: &DateTime<Utc>) -> Result<Ordering, CodecError> {
        Ok(a.timestamp_millis().cmp(&b.timestamp_millis()))
    }
}

const EDM_GUID: &str = "Edm.Guid";

/// Canonical UUID scalar. `compare` is explicitly unsupported (spec §9's
/// resolution of the source's UUID/SlugId `compare` ambiguity) even though
/// the type is `ordered`/`comparable` for filter rendering purposes.
pub struct UuidType {
    property: String,
}

impl UuidType {
    pub fn new(property: impl Into<String>) -> Self {
        Self { property: property.into() }
    }
}

impl EntityType for UuidType {
    type Value = Uuid;

    fn property(&self) -> &str {
        &self.property
    }

    fn type_name(&self) -> &'static str {
        "UUID"
    }

    fn ordered(&self) -> bool {
        true
    }

    fn comparable(&self) -> bool {
        true
    }

    fn validate(&self, _value: &Uuid) -> Result<(), CodecError> {
        Ok(())
    }

    fn serialize(&self, row: &mut Row, value: &Uuid) -> Result<(), CodecError> {
        trace!(property = %self.property, type_name = self.type_name(), "serialize");
        row.set_str(self.property.clone(), value.hyphenated().to_string());
        row.set_annotation(&self.property, EDM_GUID);
        Ok(())
    }

    fn deserialize(&self, row: &Row) -> Result<Uuid, CodecError> {
        let raw = row.expect_str(self.type_name(), &self.property, &self.property)?;
        Uuid::parse_str(raw).map_err(|e| CodecError::format_invalid(self.type_name(), &self.property, format!("{e}")))
    }

    fn equal(&self, a: &Uuid, b: &Uuid) -> bool {
        a == b
    }

    fn clone_value(&self, value: &Uuid) -> Uuid {
        *value
    }

    fn string(&self, value: &Uuid) -> Result<String, CodecError> {
        Ok(value.hyphenated().to_string())
    }

    fn filter_condition(&self, op: FilterOp, operand: &FilterOperand) -> Result<String, CodecError> {
        Ok(render_condition(&self.property, op, operand))
    }

    // compare intentionally left at the trait default (NotComparable).
}

/// Identifier scalar, stored on the wire as the GUID form of its 16 raw
/// bytes (spec §4.4). `string` is defined as the slug form and `compare` is
/// explicitly unsupported (spec §9's open questions).
pub struct SlugIdType {
    property: String,
}

impl SlugIdType {
    pub fn new(property: impl Into<String>) -> Self {
        Self { property: property.into() }
    }
}

impl EntityType for SlugIdType {
    /// The domain value is the 22-character slug form.
    type Value = String;

    fn property(&self) -> &str {
        &self.property
    }

    fn type_name(&self) -> &'static str {
        "SlugId"
    }

    fn ordered(&self) -> bool {
        true
    }

    fn comparable(&self) -> bool {
        true
    }

    fn validate(&self, value: &String) -> Result<(), CodecError> {
        decode_slug(self.type_name(), &self.property, value).map(|_| ())
    }

    fn serialize(&self, row: &mut Row, value: &String) -> Result<(), CodecError> {
        trace!(property = %self.property, type_name = self.type_name(), "serialize");
        let bytes = decode_slug(self.type_name(), &self.property, value)?;
        let guid = Uuid::from_bytes(bytes);
        row.set_str(self.property.clone(), guid.hyphenated().to_string());
        row.set_annotation(&self.property, EDM_GUID);
        Ok(())
    }

    fn deserialize(&self, row: &Row) -> Result<String, CodecError> {
        let raw = row.expect_str(self.type_name(), &self.property, &self.property)?;
        let guid = Uuid::parse_str(raw).map_err(|e| CodecError::format_invalid(self.type_name(), &self.property, format!("{e}")))?;
        Ok(encode_slug(guid.as_bytes()))
    }

    fn equal(&self, a: &String, b: &String) -> bool {
        a == b
    }

    fn clone_value(&self, value: &String) -> String {
        value.clone()
    }

    fn string(&self, value: &String) -> Result<String, CodecError> {
        Ok(value.clone())
    }

    fn filter_condition(&self, op: FilterOp, operand: &FilterOperand) -> Result<String, CodecError> {
        // The operand is rendered by the caller as a Guid operand decoded
        // from the slug (spec §4.4).
        Ok(render_condition(&self.property, op, operand))
    }

    // compare intentionally left at the trait default (NotComparable).
}
