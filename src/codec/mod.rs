//! Wire-format codecs shared by provider implementations.

pub mod address;
pub mod base64url;
pub mod html;
pub mod quoted_printable;
