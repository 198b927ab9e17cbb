//! unimail - a provider-agnostic email client core
//!
//! This crate provides one canonical email model and a uniform operation set
//! over pluggable mail backends. [`MailClient`] layers retries, validation,
//! and capability checks over any [`providers::MailProvider`]; backends
//! translate between the canonical model and their wire format.

pub mod client;
pub mod codec;
pub mod domain;
pub mod error;
pub mod providers;
pub mod retry;
pub mod stream;
pub mod transport;

pub use client::MailClient;
pub use error::{ErrorKind, MailError, Result, Retryable};
pub use providers::EmailFilter;
pub use retry::{Backoff, RetryPolicy};
