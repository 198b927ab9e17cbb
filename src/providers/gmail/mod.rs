//! Gmail REST backend.
//!
//! Implements [`crate::providers::MailProvider`] against a Gmail-style
//! JSON/HTTPS API. Incoming messages are decoded from nested MIME part
//! trees and outgoing mail is encoded as RFC 2822 raw payloads; folders
//! are projected from the label namespace.

mod auth;
mod encode;
mod provider;
mod wire;

pub use auth::{AssertionClaims, AssertionSigner};
pub use provider::{GmailConfig, GmailProvider, DEFAULT_LIST_LIMIT};
