//! Provider-agnostic mail client.
//!
//! [`MailClient`] wraps any [`MailProvider`] and layers the crate's
//! resilience policy on top: operations run under a [`RetryPolicy`],
//! outgoing mail is validated before it reaches the backend, and optional
//! capabilities are checked up front so unsupported calls fail fast.

use std::sync::Arc;

use futures::stream::BoxStream;

use crate::domain::{Email, EmailId, Folder, FolderName, LabelId, OutgoingEmail, SendResult};
use crate::error::MailError;
use crate::providers::{Capability, EmailFilter, MailProvider, WatchEvent};
use crate::retry::RetryPolicy;

/// High-level client over a mail backend.
///
/// Cloning is cheap; clones share the underlying provider.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use unimail::providers::{GmailConfig, GmailProvider};
/// use unimail::{EmailFilter, MailClient};
///
/// let provider = GmailProvider::new(GmailConfig::new(issuer, subject), signer);
/// let client = MailClient::new(Arc::new(provider));
/// client.connect().await?;
/// let unread = client
///     .list_emails(&EmailFilter::new().in_folder("INBOX").unread_only())
///     .await?;
/// ```
#[derive(Clone)]
pub struct MailClient {
    provider: Arc<dyn MailProvider>,
    retry: RetryPolicy,
}

impl MailClient {
    /// Wraps a provider with the default retry policy.
    pub fn new(provider: Arc<dyn MailProvider>) -> Self {
        Self::with_retry(provider, RetryPolicy::default())
    }

    /// Wraps a provider with a custom retry policy.
    pub fn with_retry(provider: Arc<dyn MailProvider>, retry: RetryPolicy) -> Self {
        Self { provider, retry }
    }

    /// Name of the underlying backend.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Capabilities the underlying backend declares.
    pub fn capabilities(&self) -> &[Capability] {
        self.provider.capabilities()
    }

    pub fn is_connected(&self) -> bool {
        self.provider.is_connected()
    }

    /// Establishes the backend session.
    pub async fn connect(&self) -> Result<(), MailError> {
        self.retry.run(|| self.provider.connect()).await
    }

    /// Tears down the backend session. Never retried.
    pub async fn disconnect(&self) -> Result<(), MailError> {
        self.provider.disconnect().await
    }

    /// Lists emails matching the filter.
    pub async fn list_emails(&self, filter: &EmailFilter) -> Result<Vec<Email>, MailError> {
        self.retry.run(|| self.provider.list_emails(filter)).await
    }

    /// Fetches a single email by ID.
    pub async fn get_email(&self, id: &EmailId) -> Result<Email, MailError> {
        self.retry.run(|| self.provider.get_email(id)).await
    }

    /// Streams emails matching the filter.
    ///
    /// Not retried; failures reach the consumer as stream items, and a
    /// restarted stream could not resume mid-page anyway.
    pub fn stream_emails(
        &self,
        filter: EmailFilter,
        batch_size: u32,
    ) -> BoxStream<'_, Result<Email, MailError>> {
        self.provider.stream_emails(filter, batch_size)
    }

    /// Validates and sends an email.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::Validation`] without touching the backend when
    /// the email is malformed.
    pub async fn send_email(&self, email: &OutgoingEmail) -> Result<SendResult, MailError> {
        email.validate()?;
        self.retry.run(|| self.provider.send_email(email)).await
    }

    /// Lists all folders as a hierarchy.
    pub async fn list_folders(&self) -> Result<Vec<Folder>, MailError> {
        self.retry.run(|| self.provider.list_folders()).await
    }

    /// Fetches a single folder with its message counts.
    pub async fn get_folder(&self, name: &FolderName) -> Result<Folder, MailError> {
        self.retry.run(|| self.provider.get_folder(name)).await
    }

    /// Creates a folder. Nested paths use `/` separators.
    pub async fn create_folder(&self, name: &str) -> Result<Folder, MailError> {
        self.retry.run(|| self.provider.create_folder(name)).await
    }

    /// Deletes a folder.
    pub async fn delete_folder(&self, name: &FolderName) -> Result<(), MailError> {
        self.retry.run(|| self.provider.delete_folder(name)).await
    }

    /// Marks an email as read.
    pub async fn mark_read(&self, id: &EmailId) -> Result<(), MailError> {
        self.retry.run(|| self.provider.mark_read(id)).await
    }

    /// Marks an email as unread.
    pub async fn mark_unread(&self, id: &EmailId) -> Result<(), MailError> {
        self.retry.run(|| self.provider.mark_unread(id)).await
    }

    /// Stars an email.
    pub async fn star(&self, id: &EmailId) -> Result<(), MailError> {
        self.retry.run(|| self.provider.star(id)).await
    }

    /// Removes the star from an email.
    pub async fn unstar(&self, id: &EmailId) -> Result<(), MailError> {
        self.retry.run(|| self.provider.unstar(id)).await
    }

    /// Moves an email to another folder.
    pub async fn move_to_folder(
        &self,
        id: &EmailId,
        folder: &FolderName,
    ) -> Result<(), MailError> {
        self.retry
            .run(|| self.provider.move_to_folder(id, folder))
            .await
    }

    /// Deletes an email (recoverable trash, not permanent removal).
    pub async fn delete_email(&self, id: &EmailId) -> Result<(), MailError> {
        self.retry.run(|| self.provider.delete_email(id)).await
    }

    /// Applies a label to an email.
    pub async fn add_label(&self, id: &EmailId, label: &LabelId) -> Result<(), MailError> {
        self.retry.run(|| self.provider.add_label(id, label)).await
    }

    /// Removes a label from an email.
    pub async fn remove_label(&self, id: &EmailId, label: &LabelId) -> Result<(), MailError> {
        self.retry
            .run(|| self.provider.remove_label(id, label))
            .await
    }

    /// Fetches the raw content of an attachment.
    pub async fn fetch_attachment(
        &self,
        email_id: &EmailId,
        attachment_id: &str,
    ) -> Result<Vec<u8>, MailError> {
        self.retry
            .run(|| self.provider.fetch_attachment(email_id, attachment_id))
            .await
    }

    /// Subscribes to change notifications for a folder.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::Unsupported`] without calling the backend when
    /// it does not declare [`Capability::Watch`].
    pub async fn watch(
        &self,
        folder: &FolderName,
    ) -> Result<BoxStream<'static, Result<WatchEvent, MailError>>, MailError> {
        if !self.capabilities().contains(&Capability::Watch) {
            return Err(MailError::Unsupported {
                capability: Capability::Watch,
            });
        }
        self.provider.watch(folder).await
    }
}
