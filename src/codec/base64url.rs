//! URL-safe base64 codec for wire payloads.
//!
//! Message bodies and raw outgoing messages travel base64url-encoded.
//! Encoding never emits padding; decoding accepts input with or without
//! padding, since backends are inconsistent about it.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;

const URL_SAFE_TOLERANT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encodes bytes to unpadded URL-safe base64.
pub fn encode(data: impl AsRef<[u8]>) -> String {
    URL_SAFE_TOLERANT.encode(data)
}

/// Decodes URL-safe base64, with or without trailing padding.
pub fn decode(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_TOLERANT.decode(data)
}
