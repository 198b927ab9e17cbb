//! Domain layer types for the mail client core.
//!
//! This module contains the canonical data model shared by every backend:
//! emails, addresses, folders, labels, and the outgoing write model.

mod email;
mod folder;
mod label;
mod outgoing;
mod types;

pub use email::{Address, AttachmentMeta, Email, EmailBody, Headers};
pub use folder::{Folder, FolderType};
pub use label::{system_labels, Label};
pub use outgoing::{OutgoingAttachment, OutgoingEmail, SendResult};
pub use types::{EmailId, FolderName, LabelId, ThreadId};
