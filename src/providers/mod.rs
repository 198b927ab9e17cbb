//! Mail backend implementations.
//!
//! This module contains the provider trait and backend implementations:
//!
//! - [`traits`] - The [`MailProvider`] capability interface every backend satisfies
//! - [`gmail`] - The reference backend, speaking a Gmail-style JSON/REST protocol
//!
//! New backends follow the same pattern as [`gmail`]: implement
//! [`MailProvider`], translating wire payloads into domain types at the
//! boundary and classifying every failure into [`crate::error::MailError`].

pub mod gmail;
pub mod traits;

pub use gmail::{AssertionClaims, AssertionSigner, GmailConfig, GmailProvider};
pub use traits::{Capability, EmailFilter, MailProvider, WatchEvent};
