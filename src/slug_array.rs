//! `SlugIdArray` (spec §3, §4.3): a packed, contiguous buffer of 16-byte
//! identifiers with amortized growth/shrink, in insertion order.

use crate::error::CodecError;
use crate::limits::{INITIAL_CAPACITY_SLOTS, SLOT_BYTES};
use crate::slug::{decode_slug, encode_slug};

const TYPE_NAME: &str = "SlugIdArray";

/// Packed dynamic array of raw 16-byte identifiers.
///
/// Invariant: `buffer.len() == (length + avail) * 16`, enforced by every
/// mutating method below.
#[derive(Debug, Clone, PartialEq)]
pub struct SlugIdArray {
    buffer: Vec<u8>,
    length: usize,
    avail: usize,
}

impl Default for SlugIdArray {
    fn default() -> Self {
        Self::new()
    }
}

impl SlugIdArray {
    pub fn new() -> Self {
        Self {
            buffer: vec![0u8; INITIAL_CAPACITY_SLOTS * SLOT_BYTES],
            length: 0,
            avail: INITIAL_CAPACITY_SLOTS,
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    fn capacity_slots(&self) -> usize {
        self.length + self.avail
    }

    fn slot(&self, index: usize) -> &[u8] {
        &self.buffer[index * SLOT_BYTES..(index + 1) * SLOT_BYTES]
    }

    fn grow(&mut self) {
        let new_capacity = self.capacity_slots().max(1) * 2;
        let mut new_buffer = vec![0u8; new_capacity * SLOT_BYTES];
        new_buffer[..self.length * SLOT_BYTES].copy_from_slice(&self.buffer[..self.length * SLOT_BYTES]);
        self.buffer = new_buffer;
        self.avail = new_capacity - self.length;
    }

    /// Halve capacity by repacking into a fresh buffer of exactly
    /// `length * 16` bytes, floored at the 32-slot minimum (spec §3).
    fn shrink_check(&mut self) {
        let capacity = self.capacity_slots();
        if self.avail > 2 * self.length && capacity > INITIAL_CAPACITY_SLOTS {
            let target_slots = self.length.max(INITIAL_CAPACITY_SLOTS);
            if target_slots < capacity {
                let mut new_buffer = vec![0u8; target_slots * SLOT_BYTES];
                new_buffer[..self.length * SLOT_BYTES].copy_from_slice(&self.buffer[..self.length * SLOT_BYTES]);
                self.buffer = new_buffer;
                self.avail = target_slots - self.length;
            }
        }
    }

    pub fn push(&mut self, slug: &str) -> Result<(), CodecError> {
        let bytes = decode_slug(TYPE_NAME, "<array>", slug)?;
        if self.avail == 0 {
            self.grow();
        }
        let offset = self.length * SLOT_BYTES;
        self.buffer[offset..offset + SLOT_BYTES].copy_from_slice(&bytes);
        self.length += 1;
        self.avail -= 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<String> {
        if self.length == 0 {
            return None;
        }
        self.length -= 1;
        let slug = encode_slug(self.slot(self.length).try_into().expect("slot is 16 bytes"));
        self.avail += 1;
        self.shrink_check();
        Some(slug)
    }

    pub fn shift(&mut self) -> Option<String> {
        if self.length == 0 {
            return None;
        }
        let slug = encode_slug(self.slot(0).try_into().expect("slot is 16 bytes"));
        if self.length > 1 {
            self.buffer.copy_within(SLOT_BYTES..self.length * SLOT_BYTES, 0);
        }
        self.length -= 1;
        self.avail += 1;
        self.shrink_check();
        Some(slug)
    }

    /// Index of `slug` in the live region, or `-1` if absent. Only scans
    /// 16-byte-aligned slots, so a coincidental byte match straddling two
    /// slots can never register as a hit.
    pub fn index_of(&self, slug: &str) -> Result<i64, CodecError> {
        let target = decode_slug(TYPE_NAME, "<array>", slug)?;
        for i in 0..self.length {
            if self.slot(i) == target {
                return Ok(i as i64);
            }
        }
        Ok(-1)
    }

    pub fn includes(&self, slug: &str) -> Result<bool, CodecError> {
        Ok(self.index_of(slug)? >= 0)
    }

    /// Removes the first occurrence of `slug`, returning whether it was found.
    pub fn remove(&mut self, slug: &str) -> Result<bool, CodecError> {
        let idx = self.index_of(slug)?;
        if idx < 0 {
            return Ok(false);
        }
        let idx = idx as usize;
        let tail_start = (idx + 1) * SLOT_BYTES;
        let tail_end = self.length * SLOT_BYTES;
        if tail_start < tail_end {
            self.buffer.copy_within(tail_start..tail_end, idx * SLOT_BYTES);
        }
        self.length -= 1;
        self.avail += 1;
        self.shrink_check();
        Ok(true)
    }

    /// Python-style slice: negative indices count from the end, `end` is
    /// clamped to `length`, `begin` defaults to 0 (spec §4.3).
    pub fn slice(&self, begin: Option<i64>, end: Option<i64>) -> Vec<String> {
        let len = self.length as i64;
        let mut begin = begin.unwrap_or(0);
        if begin < 0 {
            begin = (len + begin).max(0);
        }
        let mut end = end.unwrap_or(len);
        if end < 0 {
            end = len + end;
        }
        end = end.min(len);
        if begin >= end || begin < 0 {
            return Vec::new();
        }
        (begin as usize..end as usize)
            .map(|i| encode_slug(self.slot(i).try_into().expect("slot is 16 bytes")))
            .collect()
    }

    pub fn to_array(&self) -> Vec<String> {
        self.slice(None, None)
    }

    pub fn equals(&self, other: &SlugIdArray) -> bool {
        self.length == other.length && self.live_bytes() == other.live_bytes()
    }

    fn live_bytes(&self) -> &[u8] {
        &self.buffer[..self.length * SLOT_BYTES]
    }

    /// A borrow of the packed live region. Its validity ends at the next
    /// mutating call on this array (spec §5); callers must consume it
    /// synchronously.
    pub fn buffer_view(&self) -> &[u8] {
        self.live_bytes()
    }

    /// Adopt `raw` as the backing store: `length = raw.len() / 16`,
    /// `avail = 0` (spec §4.3). Fails if `raw.len()` is not a multiple of 16.
    pub fn from_buffer(raw: Vec<u8>) -> Result<Self, CodecError> {
        if raw.len() % SLOT_BYTES != 0 {
            return Err(CodecError::decode_failure(
                TYPE_NAME,
                "<buffer>",
                format!("buffer length {} is not a multiple of {SLOT_BYTES}", raw.len()),
            ));
        }
        let length = raw.len() / SLOT_BYTES;
        Ok(Self { buffer: raw, length, avail: 0 })
    }

    /// Total backing buffer size in bytes: `(length + avail) * 16`.
    pub fn capacity_bytes(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SLUGS: &[&str] = &[
        "T6BOh8I0SnKArC1FWM0E_g",
        "pDITmSVUQaa-sU2fkSIDew",
        "TEG9vfmnQmenPU17jqtkHg",
        "CHYQzesPQTG_EOabVlxFVQ",
        "vvUMS9GEQE-j9_vele2p5Q",
        "4rI8gTFETcG009eeJ7kn-Q",
        "035nVYD7Rd-BWPk0p37KHg",
        "pJ5E6q2fRaCKzuwJnxlAHw",
        "W2EvAfjhSmWPXB1ViN9iVQ",
        "A7OY9DZ1TB61Im3o4xaf_Q",
        "mpNUOr2eQtC2esMIxqVPpg",
        "xYz6tHSPR1yFh_BGIUACjg",
        "nghKVRb-RS-z43FoqYnOPQ",
        "XLfqZYfPSdmhH0JzxQMKiA",
        "nTHmLzT8T_6p5kIhKA85dg",
        "tyq_yDyJQTuE0iw7mizn3w",
        "B1E0dR_0SHShXpDH8vCvsg",
        "FlamFGzBThKDx-9yPq8nLA",
        "XgFuaYF0SuuzWYRe-7YrGQ",
        "e7udHCJGT02tM4v5ncnH8A",
        "iW832cf8TqG6mDrwkiylWA",
        "1zF40SHfTG-2orruNCSkZA",
        "qxRJC8pLTsuLsM4pHRe7pA",
        "f0ovk28FSHSVU0yMRqOkgg",
        "FEHdtCxcQrCd7TFmdiy2pg",
        "lFAD9WKgQmie9RB_ioZgGg",
        "VBInYSLuTYqzCpTgH9rNdQ",
        "rMmPY5i6TMK8krChtit4dA",
        "QIgGE_KIQ7KPpFwSk47vtQ",
        "-C3tt4jPRu-EV_vRunmrxw",
        "oXXu_yxyQ_aCdw_bTTeKOg",
        "nhW2bfOTS3euC2Ve5IDTlg",
        "Vc5kBzjbT8y_N-KtdDnYgw",
        "xjtBqLbfSEeYh8bBCAXXPg",
        "DisVPhTcSZGURahKSdGDUg",
        "RUUjU4hASJuSQrfdOXchLg",
        "bIsyd8HUS32qRadlBPOdOg",
        "mTLjkpfqROm5PSaVG2wCGg",
        "rpmo8_XnQESTuNO4p-IAnA",
        "HfuwBw1mQDyVDgZrVKjPgw",
    ];

    #[test]
    fn test_new_array_invariants() {
        let arr = SlugIdArray::new();
        assert_eq!(arr.len(), 0);
        assert_eq!(arr.capacity_bytes(), 32 * 16);
    }

    #[test]
    fn test_push_and_to_array() {
        let mut arr = SlugIdArray::new();
        arr.push(SLUGS[0]).unwrap();
        arr.push(SLUGS[1]).unwrap();
        assert_eq!(arr.to_array(), vec![SLUGS[0].to_string(), SLUGS[1].to_string()]);
    }

    #[test]
    fn test_push_rejects_invalid_slug() {
        let mut arr = SlugIdArray::new();
        let err = arr.push("not-a-slug").unwrap_err();
        assert!(matches!(err, CodecError::FormatInvalid { .. }));
    }

    // spec §8 S6: push 33 distinct slugs.
    #[test]
    fn test_s6_push_33_causes_one_doubling() {
        let mut arr = SlugIdArray::new();
        for slug in &SLUGS[..33] {
            arr.push(slug).unwrap();
        }
        assert_eq!(arr.len(), 33);
        assert_eq!(arr.capacity_bytes(), 64 * 16);
        assert_eq!(arr.index_of(SLUGS[17]).unwrap(), 17);
    }

    #[test]
    fn test_s6_remove_shifts_indices() {
        let mut arr = SlugIdArray::new();
        for slug in &SLUGS[..33] {
            arr.push(slug).unwrap();
        }
        assert!(arr.remove(SLUGS[0]).unwrap());
        assert_eq!(arr.len(), 32);
        assert_eq!(arr.index_of(SLUGS[1]).unwrap(), 0);
    }

    #[test]
    fn test_s6_pop_shrinks_toward_floor_not_below() {
        let mut arr = SlugIdArray::new();
        for slug in &SLUGS[..33] {
            arr.push(slug).unwrap();
        }
        arr.remove(SLUGS[0]).unwrap(); // length 32
        for _ in 0..31 {
            arr.pop().unwrap();
        }
        assert_eq!(arr.len(), 1);
        assert!(arr.capacity_bytes() >= 32 * 16);
        assert_eq!(arr.to_array(), vec![SLUGS[1].to_string()]);
    }

    #[test]
    fn test_shift_moves_remaining_to_front() {
        let mut arr = SlugIdArray::new();
        arr.push(SLUGS[0]).unwrap();
        arr.push(SLUGS[1]).unwrap();
        arr.push(SLUGS[2]).unwrap();
        assert_eq!(arr.shift().unwrap(), SLUGS[0]);
        assert_eq!(arr.to_array(), vec![SLUGS[1].to_string(), SLUGS[2].to_string()]);
    }

    #[test]
    fn test_includes_and_remove_with_duplicates() {
        let mut arr = SlugIdArray::new();
        arr.push(SLUGS[0]).unwrap();
        arr.push(SLUGS[0]).unwrap();
        assert!(arr.remove(SLUGS[0]).unwrap());
        assert!(arr.includes(SLUGS[0]).unwrap());
    }

    #[test]
    fn test_slice_negative_indices() {
        let mut arr = SlugIdArray::new();
        for slug in &SLUGS[..5] {
            arr.push(slug).unwrap();
        }
        assert_eq!(arr.slice(Some(-2), None), vec![SLUGS[3].to_string(), SLUGS[4].to_string()]);
        assert_eq!(arr.slice(None, Some(-1)), SLUGS[..4].iter().map(|s| s.to_string()).collect::<Vec<_>>());
        assert_eq!(arr.slice(Some(1), Some(3)), vec![SLUGS[1].to_string(), SLUGS[2].to_string()]);
    }

    #[test]
    fn test_slice_end_clamped_past_length() {
        let mut arr = SlugIdArray::new();
        arr.push(SLUGS[0]).unwrap();
        assert_eq!(arr.slice(Some(0), Some(100)), vec![SLUGS[0].to_string()]);
    }

    #[test]
    fn test_clone_and_equals() {
        let mut arr = SlugIdArray::new();
        arr.push(SLUGS[0]).unwrap();
        let mut clone = arr.clone();
        assert!(arr.equals(&clone));
        clone.push(SLUGS[1]).unwrap();
        assert!(!arr.equals(&clone));
    }

    #[test]
    fn test_from_buffer_round_trip() {
        let mut arr = SlugIdArray::new();
        arr.push(SLUGS[0]).unwrap();
        arr.push(SLUGS[1]).unwrap();
        let raw = arr.buffer_view().to_vec();
        let reconstructed = SlugIdArray::from_buffer(raw).unwrap();
        assert_eq!(reconstructed.len(), 2);
        assert!(arr.equals(&reconstructed));
    }

    #[test]
    fn test_from_buffer_rejects_misaligned_length() {
        let err = SlugIdArray::from_buffer(vec![0u8; 17]).unwrap_err();
        assert!(matches!(err, CodecError::DecodeFailure { .. }));
    }

    #[test]
    fn test_index_of_missing_is_negative_one() {
        let mut arr = SlugIdArray::new();
        arr.push(SLUGS[0]).unwrap();
        assert_eq!(arr.index_of(SLUGS[1]).unwrap(), -1);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Push(usize),
        Pop,
        Shift,
        Remove(usize),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..SLUGS.len()).prop_map(Op::Push),
            Just(Op::Pop),
            Just(Op::Shift),
            (0usize..SLUGS.len()).prop_map(Op::Remove),
        ]
    }

    proptest! {
        // spec §8.6: `len()`, the `capacity_bytes() % 16 == 0` / `>= len()`
        // layout invariants, and `to_array()` insertion order all hold after
        // any sequence of push/pop/shift/remove, not just the hand-picked
        // scenarios above.
        #[test]
        fn test_arbitrary_op_sequence_matches_reference_model(ops in proptest::collection::vec(arb_op(), 0..80)) {
            let mut arr = SlugIdArray::new();
            let mut model: Vec<&str> = Vec::new();

            for op in ops {
                match op {
                    Op::Push(i) => {
                        let slug = SLUGS[i % SLUGS.len()];
                        arr.push(slug).unwrap();
                        model.push(slug);
                    }
                    Op::Pop => {
                        let expected = model.pop();
                        let got = arr.pop();
                        prop_assert_eq!(got.as_deref(), expected);
                    }
                    Op::Shift => {
                        let expected = if model.is_empty() { None } else { Some(model.remove(0)) };
                        let got = arr.shift();
                        prop_assert_eq!(got.as_deref(), expected);
                    }
                    Op::Remove(i) => {
                        if !model.is_empty() {
                            let slug = model[i % model.len()];
                            let found_in_model = model.iter().position(|s| *s == slug).map(|pos| model.remove(pos)).is_some();
                            let found_in_arr = arr.remove(slug).unwrap();
                            prop_assert_eq!(found_in_arr, found_in_model);
                        }
                    }
                }

                prop_assert_eq!(arr.len(), model.len());
                prop_assert_eq!(arr.capacity_bytes() % 16, 0);
                prop_assert!(arr.capacity_bytes() / 16 >= arr.len());
                prop_assert_eq!(arr.to_array(), model.iter().map(|s| s.to_string()).collect::<Vec<_>>());
            }
        }
    }
}
