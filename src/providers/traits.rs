//! Mail provider trait definition.
//!
//! This module defines the [`MailProvider`] trait which abstracts over
//! different email backends. All backends expose the same canonical operation
//! set; callers work with domain types and never see wire formats.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::domain::{Email, EmailId, Folder, FolderName, LabelId, OutgoingEmail, SendResult};
use crate::error::MailError;

/// Operations a backend may or may not support.
///
/// Backends declare what they support up front via
/// [`MailProvider::capabilities`]; callers check the set instead of probing
/// with calls that may fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Listing and fetching emails.
    List,
    /// Sending email.
    Send,
    /// Folder management.
    Folders,
    /// Applying and removing labels.
    Labels,
    /// Fetching attachment content.
    Attachments,
    /// Server-side query filtering.
    Search,
    /// Push-style change notification.
    Watch,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Capability::List => "list",
            Capability::Send => "send",
            Capability::Folders => "folders",
            Capability::Labels => "labels",
            Capability::Attachments => "attachments",
            Capability::Search => "search",
            Capability::Watch => "watch",
        };
        write!(f, "{}", name)
    }
}

/// A change pushed by a backend that supports [`Capability::Watch`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WatchEvent {
    /// A new email arrived in the watched folder.
    EmailReceived {
        /// The email ID assigned by the backend.
        id: EmailId,
        /// Folder the email arrived in.
        folder: FolderName,
    },
    /// An email's flags or labels changed.
    EmailUpdated {
        /// ID of the changed email.
        id: EmailId,
    },
    /// An email was removed from the watched folder.
    EmailDeleted {
        /// ID of the removed email.
        id: EmailId,
    },
}

/// Filter criteria for listing and streaming emails.
///
/// All criteria are optional and combine conjunctively. Backends translate
/// whatever they can to server-side filtering; `offset` is always applied
/// client-side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailFilter {
    /// Restrict to a single folder.
    pub folder: Option<FolderName>,
    /// Maximum number of emails to return.
    pub limit: Option<u32>,
    /// Number of matching emails to skip.
    pub offset: Option<u32>,
    /// Only unread emails.
    pub unread_only: bool,
    /// Substring match on the sender address.
    pub from: Option<String>,
    /// Substring match on recipient addresses.
    pub to: Option<String>,
    /// Substring match on the subject.
    pub subject: Option<String>,
    /// Only emails dated after this instant.
    pub after: Option<DateTime<Utc>>,
    /// Only emails dated before this instant.
    pub before: Option<DateTime<Utc>>,
    /// Require (or exclude) attachments.
    pub has_attachment: Option<bool>,
    /// Require all of these labels.
    pub labels: Vec<LabelId>,
    /// Raw provider-specific query, appended verbatim.
    pub query: Option<String>,
}

impl EmailFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts results to the given folder.
    pub fn in_folder(mut self, folder: impl Into<FolderName>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn unread_only(mut self) -> Self {
        self.unread_only = true;
        self
    }

    pub fn from_sender(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn to_recipient(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn subject_contains(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn after(mut self, after: DateTime<Utc>) -> Self {
        self.after = Some(after);
        self
    }

    pub fn before(mut self, before: DateTime<Utc>) -> Self {
        self.before = Some(before);
        self
    }

    pub fn has_attachment(mut self, has_attachment: bool) -> Self {
        self.has_attachment = Some(has_attachment);
        self
    }

    /// Adds a required label. May be called repeatedly.
    pub fn with_label(mut self, label: impl Into<LabelId>) -> Self {
        self.labels.push(label.into());
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }
}

/// Trait for mail backend implementations.
///
/// This trait abstracts over different email backends behind one canonical
/// operation set: connection lifecycle, reads (list, get, stream), send,
/// folder management, and per-email mutations. Implementations translate
/// between the canonical model and their wire format and classify every
/// failure into [`MailError`].
///
/// All methods take `&self`; implementations carry their own interior
/// mutability so one instance can serve concurrent callers.
///
/// # Example
///
/// ```ignore
/// use unimail::providers::{EmailFilter, MailProvider};
///
/// async fn unread_subjects(provider: &impl MailProvider) -> Result<(), unimail::MailError> {
///     let filter = EmailFilter::new().in_folder("INBOX").unread_only();
///     for email in provider.list_emails(&filter).await? {
///         println!("{}", email.subject);
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Returns a short name identifying the backend, used in logs and errors.
    fn name(&self) -> &str;

    /// Returns the capabilities this backend supports.
    fn capabilities(&self) -> &[Capability];

    /// Establishes or refreshes the backend session.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::Auth`] when credentials are rejected.
    async fn connect(&self) -> Result<(), MailError>;

    /// Tears down the backend session. Best-effort.
    async fn disconnect(&self) -> Result<(), MailError>;

    /// Reports whether a session is currently established.
    fn is_connected(&self) -> bool;

    /// Lists emails matching the filter, materialized as a vector.
    ///
    /// Honors `filter.limit` and `filter.offset`.
    async fn list_emails(&self, filter: &EmailFilter) -> Result<Vec<Email>, MailError>;

    /// Fetches a single email by ID.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::NotFound`] if the email does not exist.
    async fn get_email(&self, id: &EmailId) -> Result<Email, MailError>;

    /// Streams emails matching the filter, fetching pages of `batch_size`
    /// lazily as the consumer polls.
    ///
    /// The stream is finite and not restartable; dropping it stops further
    /// page fetches.
    fn stream_emails(
        &self,
        filter: EmailFilter,
        batch_size: u32,
    ) -> BoxStream<'_, Result<Email, MailError>>;

    /// Sends an email.
    ///
    /// # Returns
    ///
    /// The backend-assigned message ID, thread ID when known, and a send
    /// timestamp.
    async fn send_email(&self, email: &OutgoingEmail) -> Result<SendResult, MailError>;

    /// Lists all folders as a hierarchy in backend order.
    async fn list_folders(&self) -> Result<Vec<Folder>, MailError>;

    /// Fetches a single folder with its message counts.
    async fn get_folder(&self, name: &FolderName) -> Result<Folder, MailError>;

    /// Creates a folder. Nested paths use `/` separators.
    async fn create_folder(&self, name: &str) -> Result<Folder, MailError>;

    /// Deletes a folder.
    async fn delete_folder(&self, name: &FolderName) -> Result<(), MailError>;

    /// Marks an email as read.
    async fn mark_read(&self, id: &EmailId) -> Result<(), MailError>;

    /// Marks an email as unread.
    async fn mark_unread(&self, id: &EmailId) -> Result<(), MailError>;

    /// Stars an email.
    async fn star(&self, id: &EmailId) -> Result<(), MailError>;

    /// Removes the star from an email.
    async fn unstar(&self, id: &EmailId) -> Result<(), MailError>;

    /// Moves an email to another folder.
    ///
    /// Mutually exclusive folder anchors are swapped; non-exclusive custom
    /// folders are added without disturbing other custom labels.
    async fn move_to_folder(&self, id: &EmailId, folder: &FolderName) -> Result<(), MailError>;

    /// Deletes an email (recoverable trash, not permanent removal).
    async fn delete_email(&self, id: &EmailId) -> Result<(), MailError>;

    /// Applies a label to an email.
    async fn add_label(&self, id: &EmailId, label: &LabelId) -> Result<(), MailError>;

    /// Removes a label from an email.
    async fn remove_label(&self, id: &EmailId, label: &LabelId) -> Result<(), MailError>;

    /// Fetches the raw content of an attachment.
    ///
    /// Listing and fetching return [`crate::domain::AttachmentMeta`] only;
    /// content is loaded on demand through this method.
    async fn fetch_attachment(
        &self,
        email_id: &EmailId,
        attachment_id: &str,
    ) -> Result<Vec<u8>, MailError>;

    /// Subscribes to change notifications for a folder.
    ///
    /// Optional capability. The default implementation reports
    /// [`Capability::Watch`] as unsupported.
    async fn watch(
        &self,
        folder: &FolderName,
    ) -> Result<BoxStream<'static, Result<WatchEvent, MailError>>, MailError> {
        let _ = folder;
        Err(MailError::Unsupported {
            capability: Capability::Watch,
        })
    }
}
