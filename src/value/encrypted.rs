//! AES-256-CBC encryption envelope (spec §4.7) layered on the buffer
//! envelope: `IV || ciphertext` is written as the plaintext payload of
//! `value::buffer`'s chunked cells.

use aes::Aes256;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use serde_json::Value as Json;
use tracing::{debug, warn};

use crate::error::CodecError;
use crate::limits::{ENCRYPTION_OVERHEAD_BYTES, MAX_PAYLOAD_BYTES};
use crate::row::Row;
use crate::value::buffer::{apply_defaults, read_envelope, write_envelope};
use crate::value::EntityType;

const IV_LEN: usize = 16;

type Encryptor = cbc::Encryptor<Aes256>;
type Decryptor = cbc::Decryptor<Aes256>;

fn encrypt(key: &[u8; 32], plaintext: &[u8]) -> Vec<u8> {
    let mut iv = [0u8; IV_LEN];
    rand::rng().fill_bytes(&mut iv);
    let ciphertext = Encryptor::new(key.into(), &iv.into()).encrypt_padded_vec_mut::<cbc::cipher::block_padding::Pkcs7>(plaintext);
    let mut out = Vec::with_capacity(IV_LEN + ciphertext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    out
}

fn decrypt(type_name: &'static str, property: &str, key: &[u8; 32], payload: &[u8]) -> Result<Vec<u8>, CodecError> {
    if payload.len() < IV_LEN {
        return Err(CodecError::decode_failure(type_name, property, "payload shorter than an IV"));
    }
    let (iv, ciphertext) = payload.split_at(IV_LEN);
    Decryptor::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<cbc::cipher::block_padding::Pkcs7>(ciphertext)
        .map_err(|e| {
            warn!(%type_name, %property, "decrypt failure");
            CodecError::decode_failure(type_name, property, format!("padding/decrypt failure: {e}"))
        })
}

/// An opaque symmetric key. Callers own key management and rotation;
/// this type only carries the 32 raw bytes AES-256 needs.
#[derive(Clone)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// Encrypted opaque byte blob (spec §4.7). `hash`/`equal` operate on
/// plaintext so two ciphertexts from different IVs of the same plaintext
/// still compare equal.
pub struct EncryptedBlobType {
    property: String,
    key: EncryptionKey,
}

impl EncryptedBlobType {
    pub fn new(property: impl Into<String>, key: EncryptionKey) -> Self {
        Self { property: property.into(), key }
    }
}

impl EntityType for EncryptedBlobType {
    type Value = Vec<u8>;

    fn property(&self) -> &str {
        &self.property
    }

    fn type_name(&self) -> &'static str {
        "EncryptedBlob"
    }

    fn validate(&self, value: &Vec<u8>) -> Result<(), CodecError> {
        if value.len() > MAX_PAYLOAD_BYTES - ENCRYPTION_OVERHEAD_BYTES {
            return Err(CodecError::size_exceeded(self.type_name(), &self.property, format!("{} bytes", value.len())));
        }
        Ok(())
    }

    fn serialize(&self, row: &mut Row, value: &Vec<u8>) -> Result<(), CodecError> {
        debug!(property = %self.property, type_name = self.type_name(), "serialize");
        self.validate(value)?;
        let envelope = encrypt(&self.key.0, value);
        write_envelope(row, self.type_name(), &self.property, &envelope)
    }

    fn deserialize(&self, row: &Row) -> Result<Vec<u8>, CodecError> {
        let envelope = read_envelope(row, self.type_name(), &self.property)?;
        decrypt(self.type_name(), &self.property, &self.key.0, &envelope)
    }

    fn equal(&self, a: &Vec<u8>, b: &Vec<u8>) -> bool {
        a == b
    }

    fn clone_value(&self, value: &Vec<u8>) -> Vec<u8> {
        value.clone()
    }

    /// Hash the plaintext, not the envelope: two serializations of the same
    /// bytes carry different IVs but must hash equal (spec §4.7, §8.3).
    fn hash(&self, value: &Vec<u8>) -> Result<Vec<u8>, CodecError> {
        Ok(value.clone())
    }
}

/// Encrypted UTF-8 text (spec §4.7).
pub struct EncryptedTextType {
    property: String,
    key: EncryptionKey,
}

impl EncryptedTextType {
    pub fn new(property: impl Into<String>, key: EncryptionKey) -> Self {
        Self { property: property.into(), key }
    }
}

impl EntityType for EncryptedTextType {
    type Value = String;

    fn property(&self) -> &str {
        &self.property
    }

    fn type_name(&self) -> &'static str {
        "EncryptedText"
    }

    fn validate(&self, value: &String) -> Result<(), CodecError> {
        if value.len() > MAX_PAYLOAD_BYTES - ENCRYPTION_OVERHEAD_BYTES {
            return Err(CodecError::size_exceeded(self.type_name(), &self.property, format!("{} bytes", value.len())));
        }
        Ok(())
    }

    fn serialize(&self, row: &mut Row, value: &String) -> Result<(), CodecError> {
        debug!(property = %self.property, type_name = self.type_name(), "serialize");
        self.validate(value)?;
        let envelope = encrypt(&self.key.0, value.as_bytes());
        write_envelope(row, self.type_name(), &self.property, &envelope)
    }

    fn deserialize(&self, row: &Row) -> Result<String, CodecError> {
        let envelope = read_envelope(row, self.type_name(), &self.property)?;
        let plaintext = decrypt(self.type_name(), &self.property, &self.key.0, &envelope)?;
        String::from_utf8(plaintext).map_err(|e| CodecError::decode_failure(self.type_name(), &self.property, format!("{e}")))
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

    /// Hash over the plaintext string, as bytes (spec §4.7, §8.3).
    fn hash(&self, value: &String) -> Result<Vec<u8>, CodecError> {
        Ok(value.clone().into_bytes())
    }
}

/// Encrypted JSON document (spec §4.7).
pub struct EncryptedJsonType {
    property: String,
    key: EncryptionKey,
}

impl EncryptedJsonType {
    pub fn new(property: impl Into<String>, key: EncryptionKey) -> Self {
        Self { property: property.into(), key }
    }
}

impl EntityType for EncryptedJsonType {
    type Value = Json;

    fn property(&self) -> &str {
        &self.property
    }

    fn type_name(&self) -> &'static str {
        "EncryptedJSON"
    }

    fn validate(&self, _value: &Json) -> Result<(), CodecError> {
        Ok(())
    }

    fn serialize(&self, row: &mut Row, value: &Json) -> Result<(), CodecError> {
        debug!(property = %self.property, type_name = self.type_name(), "serialize");
        let bytes = serde_json::to_vec(value)
            .map_err(|e| CodecError::format_invalid(self.type_name(), &self.property, format!("{e}")))?;
        if bytes.len() > MAX_PAYLOAD_BYTES - ENCRYPTION_OVERHEAD_BYTES {
            return Err(CodecError::size_exceeded(self.type_name(), &self.property, format!("{} bytes", bytes.len())));
        }
        let envelope = encrypt(&self.key.0, &bytes);
        write_envelope(row, self.type_name(), &self.property, &envelope)
    }

    fn deserialize(&self, row: &Row) -> Result<Json, CodecError> {
        let envelope = read_envelope(row, self.type_name(), &self.property)?;
        let plaintext = decrypt(self.type_name(), &self.property, &self.key.0, &envelope)?;
        serde_json::from_slice(&plaintext).map_err(|e| CodecError::decode_failure(self.type_name(), &self.property, format!("{e}")))
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

    /// Hash over the plaintext's canonical stringification (spec §4.7,
    /// §8.3), same construction as the unencrypted `JsonType`.
    fn hash(&self, value: &Json) -> Result<Vec<u8>, CodecError> {
        Ok(self.string(value)?.into_bytes())
    }
}

/// Encrypted JSON document validated against a fixed JSON Schema (spec
/// §4.7). Shares `value::buffer`'s default-filling helper rather than
/// duplicating it.
pub struct EncryptedSchemaType {
    property: String,
    schema: Json,
    validator: jsonschema::Validator,
    key: EncryptionKey,
}

impl EncryptedSchemaType {
    pub fn new(property: impl Into<String>, schema: Json, key: EncryptionKey) -> Result<Self, CodecError> {
        let property = property.into();
        let validator = jsonschema::validator_for(&schema)
            .map_err(|e| CodecError::schema_invalid("EncryptedSchema", &property, vec![e.to_string()], schema.clone()))?;
        Ok(Self { property, schema, validator, key })
    }
}

impl EntityType for EncryptedSchemaType {
    type Value = Json;

    fn property(&self) -> &str {
        &self.property
    }

    fn type_name(&self) -> &'static str {
        "EncryptedSchema"
    }

    fn validate(&self, value: &Json) -> Result<(), CodecError> {
        let errors: Vec<String> = self.validator.iter_errors(value).map(|e| e.to_string()).collect();
        if !errors.is_empty() {
            return Err(CodecError::schema_invalid(self.type_name(), &self.property, errors, value.clone()));
        }
        Ok(())
    }

    fn serialize(&self, row: &mut Row, value: &Json) -> Result<(), CodecError> {
        debug!(property = %self.property, type_name = self.type_name(), "serialize");
        let mut filled = value.clone();
        apply_defaults(&self.schema, &mut filled);
        self.validate(&filled)?;
        let bytes = serde_json::to_vec(&filled)
            .map_err(|e| CodecError::format_invalid(self.type_name(), &self.property, format!("{e}")))?;
        if bytes.len() > MAX_PAYLOAD_BYTES - ENCRYPTION_OVERHEAD_BYTES {
            return Err(CodecError::size_exceeded(self.type_name(), &self.property, format!("{} bytes", bytes.len())));
        }
        let envelope = encrypt(&self.key.0, &bytes);
        write_envelope(row, self.type_name(), &self.property, &envelope)
    }

    fn deserialize(&self, row: &Row) -> Result<Json, CodecError> {
        let envelope = read_envelope(row, self.type_name(), &self.property)?;
        let plaintext = decrypt(self.type_name(), &self.property, &self.key.0, &envelope)?;
        let value: Json = serde_json::from_slice(&plaintext)
            .map_err(|e| CodecError::decode_failure(self.type_name(), &self.property, format!("{e}")))?;
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

    /// Same plaintext-stringification hash as `EncryptedJsonType` (spec
    /// §4.7, §8.3): the schema only constrains shape, not hashing.
    fn hash(&self, value: &Json) -> Result<Vec<u8>, CodecError> {
        Ok(self.string(value)?.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const KEY: [u8; 32] = [0x42; 32];

    #[test]
    fn test_encrypted_blob_round_trip_and_fresh_iv() {
        let t = EncryptedBlobType::new("payload", EncryptionKey::new(KEY));
        let mut row_a = Row::new();
        let mut row_b = Row::new();
        t.serialize(&mut row_a, &vec![1, 2, 3]).unwrap();
        t.serialize(&mut row_b, &vec![1, 2, 3]).unwrap();
        assert_ne!(row_a, row_b, "two serializations of the same plaintext must use different IVs");
        assert_eq!(t.deserialize(&row_a).unwrap(), vec![1, 2, 3]);
        assert_eq!(t.deserialize(&row_b).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_encrypted_blob_hash_is_iv_independent() {
        // Spec §8.3: two serializations of the same value, with different
        // random IVs, must still produce equal canonical hash outputs.
        let t = EncryptedBlobType::new("payload", EncryptionKey::new(KEY));
        let mut row_a = Row::new();
        let mut row_b = Row::new();
        t.serialize(&mut row_a, &vec![9, 9, 9]).unwrap();
        t.serialize(&mut row_b, &vec![9, 9, 9]).unwrap();
        assert_ne!(row_a, row_b);
        let hash_a = t.hash(&t.deserialize(&row_a).unwrap()).unwrap();
        let hash_b = t.hash(&t.deserialize(&row_b).unwrap()).unwrap();
        assert_eq!(hash_a, hash_b);
        assert_eq!(hash_a, vec![9, 9, 9]);
    }

    #[test]
    fn test_encrypted_json_hash_is_iv_independent() {
        let t = EncryptedJsonType::new("doc", EncryptionKey::new(KEY));
        let value = json!({"b": 1, "a": 2});
        let mut row_a = Row::new();
        let mut row_b = Row::new();
        t.serialize(&mut row_a, &value).unwrap();
        t.serialize(&mut row_b, &value).unwrap();
        assert_ne!(row_a, row_b);
        let hash_a = t.hash(&t.deserialize(&row_a).unwrap()).unwrap();
        let hash_b = t.hash(&t.deserialize(&row_b).unwrap()).unwrap();
        assert_eq!(hash_a, hash_b);
        assert_eq!(hash_a, br#"{"a":2,"b":1}"#.to_vec());
    }

    #[test]
    fn test_encrypted_text_round_trip() {
        let t = EncryptedTextType::new("secret", EncryptionKey::new(KEY));
        let mut row = Row::new();
        t.serialize(&mut row, &"top secret".to_string()).unwrap();
        assert_eq!(t.deserialize(&row).unwrap(), "top secret");
    }

    #[test]
    fn test_encrypted_json_round_trip() {
        let t = EncryptedJsonType::new("doc", EncryptionKey::new(KEY));
        let value = json!({"ssn": "000-00-0000"});
        let mut row = Row::new();
        t.serialize(&mut row, &value).unwrap();
        assert_eq!(t.deserialize(&row).unwrap(), value);
    }

    #[test]
    fn test_decrypt_with_wrong_payload_fails_cleanly() {
        let t = EncryptedBlobType::new("payload", EncryptionKey::new(KEY));
        let mut row = Row::new();
        row.set_str("__buf0_payload", "####");
        row.set_num("__bufchunks_payload", 1.0);
        let err = t.deserialize(&row).unwrap_err();
        assert!(matches!(err, CodecError::DecodeFailure { .. }));
    }

    #[test]
    fn test_encrypted_schema_applies_defaults_and_validates() {
        let schema = json!({
            "type": "object",
            "properties": {"level": {"type": "number", "default": 1}},
            "required": []
        });
        let t = EncryptedSchemaType::new("doc", schema, EncryptionKey::new(KEY)).unwrap();
        let mut row = Row::new();
        t.serialize(&mut row, &json!({})).unwrap();
        assert_eq!(t.deserialize(&row).unwrap(), json!({"level": 1}));
    }
}
