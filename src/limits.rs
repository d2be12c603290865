//! Named size limits shared by the buffer envelope and the scalar types.
//!
//! Kept as a single module so a future caller-configurable layer has one
//! place to override these constants instead of magic numbers scattered
//! through `value::buffer` and `value::encrypted`.

/// Maximum raw bytes a single buffer-typed property may hold (spec §3, §6).
pub const MAX_PAYLOAD_BYTES: usize = 256 * 1024;

/// Size of one binary envelope chunk (spec §4.5). The final chunk of a
/// payload may be shorter.
pub const CHUNK_SIZE_BYTES: usize = 64 * 1024;

/// Upper bound on chunk count implied by `MAX_PAYLOAD_BYTES / CHUNK_SIZE_BYTES`.
pub const MAX_CHUNKS: usize = MAX_PAYLOAD_BYTES.div_ceil(CHUNK_SIZE_BYTES);

/// Bytes reserved for `IV || padding` headroom inside an encrypted envelope
/// (spec §4.7): max plaintext is `MAX_PAYLOAD_BYTES - ENCRYPTION_OVERHEAD_BYTES`.
pub const ENCRYPTION_OVERHEAD_BYTES: usize = 32;

/// Exclusive upper bound for `PositiveInteger` (spec §4.4, §9): values equal
/// to this bound are rejected, `2^32 - 1` is the largest accepted value.
pub const POSITIVE_INTEGER_BOUND: u64 = 1u64 << 32;

/// Number of bytes in one raw identifier slot inside a `SlugIdArray`.
pub const SLOT_BYTES: usize = 16;

/// Initial / floor capacity of a `SlugIdArray`, in slots (spec §3).
pub const INITIAL_CAPACITY_SLOTS: usize = 32;
