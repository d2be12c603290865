//! The chunked binary envelope (spec §4.5) and the buffer-backed codecs
//! layered on it: `Blob`, `Text`, `JSON`, `Schema`, `SlugIdArray` (spec
//! §4.6, §4.8).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use jsonschema::Validator;
use serde_json::Value as Json;
use tracing::{trace, warn};

use crate::error::CodecError;
use crate::limits::{CHUNK_SIZE_BYTES, MAX_CHUNKS, MAX_PAYLOAD_BYTES};
use crate::row::Row;
use crate::slug_array::SlugIdArray;
use crate::value::EntityType;

fn chunk_cell(property: &str, index: usize) -> String {
    format!("__buf{index}_{property}")
}

fn chunk_count_cell(property: &str) -> String {
    format!("__bufchunks_{property}")
}

/// Split `payload` into `<=64 KiB` chunks and write them as
/// `__buf<i>_<property>` cells plus a `__bufchunks_<property>` count
/// (spec §4.5). Rejects payloads over the 256 KiB cap before writing anything.
pub fn write_envelope(row: &mut Row, type_name: &'static str, property: &str, payload: &[u8]) -> Result<(), CodecError> {
    if payload.len() > MAX_PAYLOAD_BYTES {
        return Err(CodecError::size_exceeded(
            type_name,
            property,
            format!("{} bytes exceeds the {MAX_PAYLOAD_BYTES}-byte cap", payload.len()),
        ));
    }
    let chunks: Vec<&[u8]> = if payload.is_empty() {
        vec![&payload[0..0]]
    } else {
        payload.chunks(CHUNK_SIZE_BYTES).collect()
    };
    debug_assert!(chunks.len() <= MAX_CHUNKS);
    for (i, chunk) in chunks.iter().enumerate() {
        row.set_str(chunk_cell(property, i), STANDARD.encode(chunk));
    }
    row.set_num(chunk_count_cell(property), chunks.len() as f64);
    Ok(())
}

/// Reassemble the payload previously written by `write_envelope`.
pub fn read_envelope(row: &Row, type_name: &'static str, property: &str) -> Result<Vec<u8>, CodecError> {
    let count = row.expect_num(type_name, property, &chunk_count_cell(property))? as usize;
    if count == 0 || count > MAX_CHUNKS {
        warn!(%type_name, %property, count, "invalid chunk count");
        return Err(CodecError::decode_failure(type_name, property, format!("invalid chunk count {count}")));
    }
    let mut payload = Vec::new();
    for i in 0..count {
        let cell = chunk_cell(property, i);
        let encoded = row.expect_str(type_name, property, &cell)?;
        let mut decoded = STANDARD.decode(encoded).map_err(|e| {
            warn!(%type_name, %property, chunk = i, "chunk base64 decode failed");
            CodecError::decode_failure(type_name, property, format!("chunk {i} base64: {e}"))
        })?;
        payload.append(&mut decoded);
    }
    Ok(payload)
}

/// Opaque byte blob (spec §4.6).
pub struct BlobType {
    property: String,
}

impl BlobType {
    pub fn new(property: impl Into<String>) -> Self {
        Self { property: property.into() }
    }
}

impl EntityType for BlobType {
    type Value = Vec<u8>;

    fn property(&self) -> &str {
        &self.property
    }

    fn type_name(&self) -> &'static str {
        "Blob"
    }

    fn validate(&self, value: &Vec<u8>) -> Result<(), CodecError> {
        if value.len() > MAX_PAYLOAD_BYTES {
            return Err(CodecError::size_exceeded(self.type_name(), &self.property, format!("{} bytes", value.len())));
        }
        Ok(())
    }

    fn serialize(&self, row: &mut Row, value: &Vec<u8>) -> Result<(), CodecError> {
        trace!(property = %self.property, type_name = self.type_name(), "serialize");
        self.validate(value)?;
        write_envelope(row, self.type_name(), &self.property, value)
    }

    fn deserialize(&self, row: &Row) -> Result<Vec<u8>, CodecError> {
        read_envelope(row, self.type_name(), &self.property)
    }

    fn equal(&self, a: &Vec<u8>, b: &Vec<u8>) -> bool {
        a == b
    }

    fn clone_value(&self, value: &Vec<u8>) -> Vec<u8> {
        value.clone()
    }

    /// The hash of a blob is the bytes themselves (spec §4.6).
    fn hash(&self, value: &Vec<u8>) -> Result<Vec<u8>, CodecError> {
        Ok(value.clone())
    }
}

/// UTF-8 text over the buffer envelope (spec §4.6): larger than `String`'s
/// single-cell cap, still a plain scalar at the domain level.
pub struct TextType {
    property: String,
}

impl TextType {
    pub fn new(property: impl Into<String>) -> Self {
        Self { property: property.into() }
    }
}

impl EntityType for TextType {
    type Value = String;

    fn property(&self) -> &str {
        &self.property
    }

    fn type_name(&self) -> &'static str {
        "Text"
    }

    fn validate(&self, value: &String) -> Result<(), CodecError> {
        if value.len() > MAX_PAYLOAD_BYTES {
            return Err(CodecError::size_exceeded(self.type_name(), &self.property, format!("{} bytes", value.len())));
        }
        Ok(())
    }

    fn serialize(&self, row: &mut Row, value: &String) -> Result<(), CodecError> {
        trace!(property = %self.property, type_name = self.type_name(), "serialize");
        self.validate(value)?;
        write_envelope(row, self.type_name(), &self.property, value.as_bytes())
    }

    fn deserialize(&self, row: &Row) -> Result<String, CodecError> {
        let bytes = read_envelope(row, self.type_name(), &self.property)?;
        String::from_utf8(bytes).map_err(|e| CodecError::decode_failure(self.type_name(), &self.property, format!("{e}")))
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

    /// The hash of text is the string itself, as bytes (spec §4.6).
    fn hash(&self, value: &String) -> Result<Vec<u8>, CodecError> {
        Ok(value.clone().into_bytes())
    }
}

/// Arbitrary JSON document over the buffer envelope (spec §4.6). Canonical
/// stringification relies on `serde_json`'s default (non-`preserve_order`)
/// `Map`, which is `BTreeMap`-backed and so always emits sorted keys.
pub struct JsonType {
    property: String,
}

impl JsonType {
    pub fn new(property: impl Into<String>) -> Self {
        Self { property: property.into() }
    }
}

impl EntityType for JsonType {
    type Value = Json;

    fn property(&self) -> &str {
        &self.property
    }

    fn type_name(&self) -> &'static str {
        "JSON"
    }

    fn validate(&self, _value: &Json) -> Result<(), CodecError> {
        Ok(())
    }

    fn serialize(&self, row: &mut Row, value: &Json) -> Result<(), CodecError> {
        trace!(property = %self.property, type_name = self.type_name(), "serialize");
        let bytes = serde_json::to_vec(value)
            .map_err(|e| CodecError::format_invalid(self.type_name(), &self.property, format!("{e}")))?;
        write_envelope(row, self.type_name(), &self.property, &bytes)
    }

    fn deserialize(&self, row: &Row) -> Result<Json, CodecError> {
        let bytes = read_envelope(row, self.type_name(), &self.property)?;
        serde_json::from_slice(&bytes).map_err(|e| CodecError::decode_failure(self.type_name(), &self.property, format!("{e}")))
    }

    fn equal(&self, a: &Json, b: &Json) -> bool {
        a == b
    }

    fn clone_value(&self, value: &Json) -> Json {
        value.clone()
    }

    /// Canonical (sorted-key) stringification, used for key derivation.
    fn string(&self, value: &Json) -> Result<String, CodecError> {
        serde_json::to_string(value).map_err(|e| CodecError::format_invalid(self.type_name(), &self.property, format!("{e}")))
    }

    /// The hash of a JSON value is its stable (sorted-key) stringification,
    /// as bytes (spec §4.6).
    fn hash(&self, value: &Json) -> Result<Vec<u8>, CodecError> {
        Ok(self.string(value)?.into_bytes())
    }
}

/// Recursively fill `value`'s missing object keys from `schema["properties"]`
/// `"default"` entries (spec §4.6); `jsonschema` validates but does not apply
/// defaults on its own.
pub(crate) fn apply_defaults(schema: &Json, value: &mut Json) {
    let Some(properties) = schema.get("properties").and_then(Json::as_object) else {
        return;
    };
    let Json::Object(obj) = value else {
        return;
    };
    for (key, sub_schema) in properties {
        if !obj.contains_key(key) {
            if let Some(default) = sub_schema.get("default") {
                obj.insert(key.clone(), default.clone());
            }
        }
        if let Some(sub_value) = obj.get_mut(key) {
            apply_defaults(sub_schema, sub_value);
        }
    }
}

/// JSON document validated (and default-filled) against a fixed JSON Schema
/// (spec §4.6).
pub struct SchemaType {
    property: String,
    schema: Json,
    validator: Validator,
}

impl SchemaType {
    pub fn new(property: impl Into<String>, schema: Json) -> Result<Self, CodecError> {
        let property = property.into();
        let validator = jsonschema::validator_for(&schema)
            .map_err(|e| CodecError::schema_invalid("Schema", &property, vec![e.to_string()], schema.clone()))?;
        Ok(Self { property, schema, validator })
    }
}

impl EntityType for SchemaType {
    type Value = Json;

    fn property(&self) -> &str {
        &self.property
    }

    fn type_name(&self) -> &'static str {
        "Schema"
    }

    fn validate(&self, value: &Json) -> Result<(), CodecError> {
        let errors: Vec<String> = self.validator.iter_errors(value).map(|e| e.to_string()).collect();
        if !errors.is_empty() {
            return Err(CodecError::schema_invalid(self.type_name(), &self.property, errors, value.clone()));
        }
        Ok(())
    }

    fn serialize(&self, row: &mut Row, value: &Json) -> Result<(), CodecError> {
        trace!(property = %self.property, type_name = self.type_name(), "serialize");
        let mut filled = value.clone();
        apply_defaults(&self.schema, &mut filled);
        self.validate(&filled)?;
        let bytes = serde_json::to_vec(&filled)
            .map_err(|e| CodecError::format_invalid(self.type_name(), &self.property, format!("{e}")))?;
        write_envelope(row, self.type_name(), &self.property, &bytes)
    }

    fn deserialize(&self, row: &Row) -> Result<Json, CodecError> {
        let bytes = read_envelope(row, self.type_name(), &self.property)?;
        let value: Json =
            serde_json::from_slice(&bytes).map_err(|e| CodecError::decode_failure(self.type_name(), &self.property, format!("{e}")))?;
        self.validate(&value)?;
        Ok(value)
    }

    fn equal(&self, a: &Json, b: &Json) -> bool {
        a == b
    }

    fn clone_value(&self, value: &Json) -> Json {
        value.clone()
    }

    fn string(&self, value: &Json) -> Result<String, CodecError> {
        serde_json::to_string(value).map_err(|e| CodecError::format_invalid(self.type_name(), &self.property, format!("{e}")))
    }

    /// Same canonical-stringification hash as `JsonType` (spec §4.6): a
    /// schema-validated document is still a JSON value underneath.
    fn hash(&self, value: &Json) -> Result<Vec<u8>, CodecError> {
        Ok(self.string(value)?.into_bytes())
    }
}

/// Packed array of identifiers over the buffer envelope (spec §4.3, §4.6).
pub struct SlugIdArrayType {
    property: String,
}

impl SlugIdArrayType {
    pub fn new(property: impl Into<String>) -> Self {
        Self { property: property.into() }
    }
}

impl EntityType for SlugIdArrayType {
    type Value = SlugIdArray;

    fn property(&self) -> &str {
        &self.property
    }

    fn type_name(&self) -> &'static str {
        "SlugIdArrayType"
    }

    fn validate(&self, value: &SlugIdArray) -> Result<(), CodecError> {
        if value.buffer_view().len() > MAX_PAYLOAD_BYTES {
            return Err(CodecError::size_exceeded(self.type_name(), &self.property, "array buffer too large"));
        }
        Ok(())
    }

    fn serialize(&self, row: &mut Row, value: &SlugIdArray) -> Result<(), CodecError> {
        trace!(property = %self.property, type_name = self.type_name(), "serialize");
        self.validate(value)?;
        write_envelope(row, self.type_name(), &self.property, value.buffer_view())
    }

    fn deserialize(&self, row: &Row) -> Result<SlugIdArray, CodecError> {
        let bytes = read_envelope(row, self.type_name(), &self.property)?;
        SlugIdArray::from_buffer(bytes)
    }

    fn equal(&self, a: &SlugIdArray, b: &SlugIdArray) -> bool {
        a.equals(b)
    }

    fn clone_value(&self, value: &SlugIdArray) -> SlugIdArray {
        value.clone()
    }

    /// The hash of a `SlugIdArray` is its packed bytes (spec §4.6).
    fn hash(&self, value: &SlugIdArray) -> Result<Vec<u8>, CodecError> {
        Ok(value.buffer_view().to_vec())
    }
}
