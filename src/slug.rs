//! Slug codec (spec §4.2): 22-character URL-safe base64 ⇄ 16 raw bytes.

use std::sync::LazyLock;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use regex::Regex;
use tracing::warn;

use crate::error::CodecError;
use crate::limits::SLOT_BYTES;

const SLUG_LEN: usize = 22;

static SLUG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]{8}[Q-T][A-Za-z0-9_-][CGKOSWaeimquy26-][A-Za-z0-9_-]{10}[AQgw]$")
        .expect("slug regex is a fixed, valid pattern")
});

/// Encode 16 raw bytes as a 22-character URL-safe slug (spec §4.2).
pub fn encode_slug(bytes: &[u8; SLOT_BYTES]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode a slug back into its 16 raw bytes. Rejects anything not matching
/// the slug shape (spec §4.2) with `FormatInvalid`.
pub fn decode_slug(type_name: &'static str, property: &str, slug: &str) -> Result<[u8; SLOT_BYTES], CodecError> {
    if slug.len() != SLUG_LEN || !SLUG_RE.is_match(slug) {
        warn!(%type_name, %property, "rejected malformed slug");
        return Err(CodecError::format_invalid(
            type_name,
            property,
            format!("'{slug}' is not a valid slug"),
        ));
    }
    let decoded = URL_SAFE_NO_PAD
        .decode(slug)
        .map_err(|e| CodecError::format_invalid(type_name, property, format!("slug base64 decode failed: {e}")))?;
    decoded
        .try_into()
        .map_err(|_| CodecError::format_invalid(type_name, property, "decoded slug was not 16 bytes"))
}
