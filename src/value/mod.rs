//! The type-class contract (spec §3, §9).
//!
//! The source shares `serialize`/`deserialize`/`equal`/`clone` across a
//! prototype-inheritance lattice; here that becomes one trait per concern
//! (scalar vs. buffer-backed vs. encrypted) implemented by a tagged set of
//! concrete codec structs, with the buffer/encryption envelopes as
//! composable helpers rather than base classes (spec §9).

pub mod buffer;
pub mod encrypted;
pub mod scalar;

use std::cmp::Ordering;

use crate::error::CodecError;
use crate::operator::{FilterOp, FilterOperand};
use crate::row::Row;

/// Every unencrypted, single- or multi-cell codec honors this contract.
///
/// Capability flags (`ordered`, `comparable`) are fixed per type variant
/// (spec §3) and default to `false`; concrete types override only the ones
/// they support.
pub trait EntityType {
    type Value;

    fn property(&self) -> &str;
    fn type_name(&self) -> &'static str;

    fn ordered(&self) -> bool {
        false
    }

    fn comparable(&self) -> bool {
        false
    }

    fn validate(&self, value: &Self::Value) -> Result<(), CodecError>;
    fn serialize(&self, row: &mut Row, value: &Self::Value) -> Result<(), CodecError>;
    fn deserialize(&self, row: &Row) -> Result<Self::Value, CodecError>;
    fn equal(&self, a: &Self::Value, b: &Self::Value) -> bool;
    fn clone_value(&self, value: &Self::Value) -> Self::Value;

    /// Canonical stringification for key derivation. Not every type
    /// supports this (spec §9's open question on `SlugId.string`); the
    /// default is `NotImplemented`.
    fn string(&self, _value: &Self::Value) -> Result<String, CodecError> {
        Err(CodecError::not_implemented(self.type_name(), self.property()))
    }

    /// Render a server-side filter clause for this property (spec §4.1).
    /// Defaults to `NotComparable`; buffer-based and identifier types that
    /// don't support it never override this.
    fn filter_condition(&self, _op: FilterOp, _operand: &FilterOperand) -> Result<String, CodecError> {
        Err(CodecError::not_comparable(self.type_name(), self.property()))
    }

    /// In-memory two-argument comparison. Distinct from `filter_condition`:
    /// a type can be `ordered`/`comparable` for server-side filter rendering
    /// while still refusing a local `compare` (spec §9's resolution for
    /// UUID and SlugId). Defaults to `NotComparable`.
    fn compare(&self, _a: &Self::Value, _b: &Self::Value) -> Result<Ordering, CodecError> {
        Err(CodecError::not_comparable(self.type_name(), self.property()))
    }

    /// Canonical content hash for the current value (spec §4.6, §4.7):
    /// buffer-backed types hash their packed bytes or canonical string form,
    /// and encrypted variants hash the plaintext so two serializations of
    /// the same value with different IVs still hash equal. Scalars have no
    /// use for this beyond `string`/`equal`, so the default is
    /// `NotImplemented`.
    fn hash(&self, _value: &Self::Value) -> Result<Vec<u8>, CodecError> {
        Err(CodecError::not_implemented(self.type_name(), self.property()))
    }
}
