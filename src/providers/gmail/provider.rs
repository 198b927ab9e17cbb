//! Gmail provider implementation.
//!
//! Speaks the JSON/REST wire protocol through the [`HttpTransport`] seam,
//! translating canonical operations into endpoint calls and classifying
//! every failed response into [`MailError`] at this boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use url::Url;

use super::auth::{AssertionSigner, GmailAuth, TOKEN_ENDPOINT};
use super::encode;
use super::wire::{
    self, WireAttachment, WireCreateLabelRequest, WireErrorBody, WireLabel, WireLabelList,
    WireMessage, WireMessageList, WireModifyRequest, WireSendRequest, WireSendResponse,
};
use crate::codec::base64url;
use crate::domain::{Email, EmailId, Folder, FolderName, LabelId, OutgoingEmail, SendResult};
use crate::error::MailError;
use crate::providers::traits::{Capability, EmailFilter, MailProvider};
use crate::stream::{paginated, Page};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

/// Page size used when the caller does not specify a limit.
pub const DEFAULT_LIST_LIMIT: u32 = 100;
/// Largest page the list endpoint accepts.
const MAX_PAGE_SIZE: u32 = 500;

const PROVIDER_NAME: &str = "gmail";

/// Folder labels that are mutually exclusive; moving a message swaps them.
const EXCLUSIVE_FOLDERS: [&str; 3] = ["INBOX", "SPAM", "TRASH"];

const CAPABILITIES: &[Capability] = &[
    Capability::List,
    Capability::Send,
    Capability::Folders,
    Capability::Labels,
    Capability::Attachments,
    Capability::Search,
];

/// Configuration for [`GmailProvider`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmailConfig {
    /// Service account identifier, used as the assertion issuer.
    pub issuer: String,
    /// Mailbox user to impersonate.
    pub subject: String,
    /// OAuth scope requested during token exchange.
    pub scope: String,
    /// API base URL.
    pub base_url: String,
    /// Token exchange endpoint.
    pub token_endpoint: String,
}

impl GmailConfig {
    /// Creates a config for the given service account and mailbox, with
    /// production endpoints and the full mail scope.
    pub fn new(issuer: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            subject: subject.into(),
            scope: "https://mail.google.com/".to_string(),
            base_url: "https://gmail.googleapis.com/gmail/v1".to_string(),
            token_endpoint: TOKEN_ENDPOINT.to_string(),
        }
    }
}

/// [`MailProvider`] backed by the Gmail REST API.
pub struct GmailProvider {
    config: GmailConfig,
    transport: Arc<dyn HttpTransport>,
    auth: GmailAuth,
    connected: AtomicBool,
}

impl GmailProvider {
    /// Creates a provider over the default reqwest transport.
    pub fn new(config: GmailConfig, signer: Arc<dyn AssertionSigner>) -> Self {
        Self::with_transport(config, signer, Arc::new(ReqwestTransport::new()))
    }

    /// Creates a provider over a custom transport. Tests use this to script
    /// responses without a network.
    pub fn with_transport(
        config: GmailConfig,
        signer: Arc<dyn AssertionSigner>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let auth = GmailAuth::new(
            signer,
            config.issuer.clone(),
            config.subject.clone(),
            config.scope.clone(),
            config.token_endpoint.clone(),
        );
        Self {
            config,
            transport,
            auth,
            connected: AtomicBool::new(false),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/users/me/{}",
            self.config.base_url.trim_end_matches('/'),
            path
        )
    }

    fn ensure_connected(&self) -> Result<(), MailError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(MailError::Provider {
                provider: PROVIDER_NAME.to_string(),
                message: "not connected; call connect() first".to_string(),
                retryable: false,
            })
        }
    }

    /// Attaches a bearer token and executes the request.
    async fn authorized(&self, request: HttpRequest) -> Result<HttpResponse, MailError> {
        let token = self.auth.access_token(self.transport.as_ref()).await?;
        Ok(self.transport.execute(request.bearer_auth(&token)).await?)
    }

    fn require_success(
        response: HttpResponse,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<HttpResponse, MailError> {
        if response.is_success() {
            Ok(response)
        } else {
            Err(Self::map_status(&response, resource_type, resource_id))
        }
    }

    /// Classifies a failed response by HTTP status.
    fn map_status(response: &HttpResponse, resource_type: &str, resource_id: &str) -> MailError {
        let message = Self::error_message(response);
        match response.status {
            401 | 403 => MailError::Auth {
                message,
                source: None,
            },
            429 => MailError::RateLimit {
                message,
                retry_after: response
                    .header("Retry-After")
                    .and_then(|value| value.trim().parse::<u64>().ok())
                    .map(Duration::from_secs),
            },
            404 => MailError::NotFound {
                resource_type: resource_type.to_string(),
                resource_id: resource_id.to_string(),
            },
            status if (500..600).contains(&status) => MailError::Provider {
                provider: PROVIDER_NAME.to_string(),
                message,
                retryable: true,
            },
            _ => MailError::Provider {
                provider: PROVIDER_NAME.to_string(),
                message,
                retryable: false,
            },
        }
    }

    /// Pulls the error message out of the response body, falling back to the
    /// status code when the body is not the expected shape.
    fn error_message(response: &HttpResponse) -> String {
        response
            .json::<WireErrorBody>()
            .ok()
            .and_then(|body| body.error)
            .and_then(|detail| detail.message)
            .unwrap_or_else(|| format!("HTTP {}", response.status))
    }

    fn decode_json<T: serde::de::DeserializeOwned>(
        response: &HttpResponse,
    ) -> Result<T, MailError> {
        response.json().map_err(|err| MailError::Provider {
            provider: PROVIDER_NAME.to_string(),
            message: format!("failed to decode response: {}", err),
            retryable: false,
        })
    }

    fn list_url(
        &self,
        filter: &EmailFilter,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<String, MailError> {
        let mut url = Url::parse(&self.endpoint("messages")).map_err(|err| MailError::Provider {
            provider: PROVIDER_NAME.to_string(),
            message: format!("invalid base url: {}", err),
            retryable: false,
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("maxResults", &page_size.to_string());
            if let Some(folder) = &filter.folder {
                pairs.append_pair("labelIds", &folder_to_label_id(folder));
            }
            let query = build_query(filter);
            if !query.is_empty() {
                pairs.append_pair("q", &query);
            }
            if let Some(token) = page_token {
                pairs.append_pair("pageToken", token);
            }
        }
        Ok(url.into())
    }

    /// Fetches one page of matching message ids.
    async fn fetch_id_page(
        &self,
        filter: &EmailFilter,
        page_size: u32,
        page_token: Option<String>,
    ) -> Result<Page<String>, MailError> {
        let url = self.list_url(filter, page_size, page_token.as_deref())?;
        let response = self.authorized(HttpRequest::get(url)).await?;
        let response = Self::require_success(response, "message list", "messages")?;
        let list: WireMessageList = Self::decode_json(&response)?;

        let ids: Vec<String> = list
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|reference| reference.id)
            .collect();
        tracing::debug!(
            count = ids.len(),
            has_next = list.next_page_token.is_some(),
            "fetched message id page"
        );
        Ok(Page {
            items: ids,
            next_page_token: list.next_page_token,
        })
    }

    /// Fetches a full message and decodes it.
    async fn fetch_message(&self, id: &str) -> Result<Email, MailError> {
        let url = format!("{}?format=full", self.endpoint(&format!("messages/{}", id)));
        let response = self.authorized(HttpRequest::get(url)).await?;
        let response = Self::require_success(response, "email", id)?;
        let message: WireMessage = Self::decode_json(&response)?;
        Ok(wire::decode_message(message))
    }

    async fn fetch_labels(&self) -> Result<Vec<WireLabel>, MailError> {
        let response = self
            .authorized(HttpRequest::get(self.endpoint("labels")))
            .await?;
        let response = Self::require_success(response, "label list", "labels")?;
        let list: WireLabelList = Self::decode_json(&response)?;
        Ok(list.labels.unwrap_or_default())
    }

    /// Resolves a folder name to the label id that backs it. System folders
    /// map directly; custom folders are looked up by name.
    async fn resolve_folder_label(&self, folder: &FolderName) -> Result<String, MailError> {
        let mapped = folder_to_label_id(folder);
        if is_system_label(&mapped) {
            return Ok(mapped);
        }
        let labels = self.fetch_labels().await?;
        labels
            .iter()
            .map(wire::decode_label)
            .find(|label| label.name.eq_ignore_ascii_case(&folder.0))
            .map(|label| label.id.0)
            .ok_or_else(|| MailError::not_found("folder", folder.0.clone()))
    }

    async fn modify_labels(
        &self,
        id: &EmailId,
        add: Vec<String>,
        remove: Vec<String>,
    ) -> Result<(), MailError> {
        let body = WireModifyRequest {
            add_label_ids: add,
            remove_label_ids: remove,
        };
        let url = self.endpoint(&format!("messages/{}/modify", id.0));
        let request = HttpRequest::post(url).json(&body)?;
        let response = self.authorized(request).await?;
        Self::require_success(response, "email", &id.0)?;
        tracing::debug!(message_id = %id, "modified labels");
        Ok(())
    }
}

#[async_trait]
impl MailProvider for GmailProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn capabilities(&self) -> &[Capability] {
        CAPABILITIES
    }

    async fn connect(&self) -> Result<(), MailError> {
        self.auth.access_token(self.transport.as_ref()).await?;
        self.connected.store(true, Ordering::SeqCst);
        tracing::info!(subject = %self.config.subject, "connected to gmail");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), MailError> {
        self.connected.store(false, Ordering::SeqCst);
        self.auth.clear().await;
        tracing::info!("disconnected from gmail");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn list_emails(&self, filter: &EmailFilter) -> Result<Vec<Email>, MailError> {
        self.ensure_connected()?;
        let offset = filter.offset.unwrap_or(0) as usize;
        let limit = filter.limit.map(|limit| limit as usize);

        // The wire protocol has no offset, so enough items are streamed to
        // cover it and the skip happens here.
        let batch = filter
            .limit
            .map(|limit| {
                limit
                    .saturating_add(filter.offset.unwrap_or(0))
                    .clamp(1, MAX_PAGE_SIZE)
            })
            .unwrap_or(DEFAULT_LIST_LIMIT);

        let emails: Vec<Email> = match limit {
            Some(limit) => {
                self.stream_emails(filter.clone(), batch)
                    .take(offset + limit)
                    .try_collect()
                    .await?
            }
            None => {
                self.stream_emails(filter.clone(), batch)
                    .try_collect()
                    .await?
            }
        };

        Ok(emails.into_iter().skip(offset).collect())
    }

    async fn get_email(&self, id: &EmailId) -> Result<Email, MailError> {
        self.ensure_connected()?;
        self.fetch_message(&id.0).await
    }

    fn stream_emails(
        &self,
        filter: EmailFilter,
        batch_size: u32,
    ) -> BoxStream<'_, Result<Email, MailError>> {
        if let Err(err) = self.ensure_connected() {
            return futures::stream::once(async move { Err(err) }).boxed();
        }

        let page_size = batch_size.clamp(1, MAX_PAGE_SIZE);
        paginated(move |token| {
            let filter = filter.clone();
            async move { self.fetch_id_page(&filter, page_size, token).await }
        })
        .and_then(move |id| async move { self.fetch_message(&id).await })
        .boxed()
    }

    async fn send_email(&self, email: &OutgoingEmail) -> Result<SendResult, MailError> {
        self.ensure_connected()?;
        let raw = encode::encode_outgoing(email);
        let request =
            HttpRequest::post(self.endpoint("messages/send")).json(&WireSendRequest { raw })?;
        let response = self.authorized(request).await?;
        let response = Self::require_success(response, "message", "send")?;
        let sent: WireSendResponse = Self::decode_json(&response)?;

        let result = wire::decode_send_response(sent);
        tracing::info!(message_id = %result.id, "sent email");
        Ok(result)
    }

    async fn list_folders(&self) -> Result<Vec<Folder>, MailError> {
        self.ensure_connected()?;
        let labels = self.fetch_labels().await?;
        Ok(wire::build_folder_tree(&labels))
    }

    async fn get_folder(&self, name: &FolderName) -> Result<Folder, MailError> {
        self.ensure_connected()?;
        let label_id = self.resolve_folder_label(name).await?;
        let url = self.endpoint(&format!("labels/{}", label_id));
        let response = self.authorized(HttpRequest::get(url)).await?;
        let response = Self::require_success(response, "folder", &name.0)?;
        let label: WireLabel = Self::decode_json(&response)?;
        Ok(wire::folder_from_label(&label))
    }

    async fn create_folder(&self, name: &str) -> Result<Folder, MailError> {
        self.ensure_connected()?;
        let request = HttpRequest::post(self.endpoint("labels")).json(&WireCreateLabelRequest {
            name: name.to_string(),
        })?;
        let response = self.authorized(request).await?;
        let response = Self::require_success(response, "folder", name)?;
        let label: WireLabel = Self::decode_json(&response)?;
        tracing::info!(folder = name, "created folder");
        Ok(wire::folder_from_label(&label))
    }

    async fn delete_folder(&self, name: &FolderName) -> Result<(), MailError> {
        self.ensure_connected()?;
        let label_id = self.resolve_folder_label(name).await?;
        let url = self.endpoint(&format!("labels/{}", label_id));
        let response = self.authorized(HttpRequest::delete(url)).await?;
        Self::require_success(response, "folder", &name.0)?;
        tracing::info!(folder = %name, "deleted folder");
        Ok(())
    }

    async fn mark_read(&self, id: &EmailId) -> Result<(), MailError> {
        self.ensure_connected()?;
        self.modify_labels(id, vec![], vec!["UNREAD".to_string()])
            .await
    }

    async fn mark_unread(&self, id: &EmailId) -> Result<(), MailError> {
        self.ensure_connected()?;
        self.modify_labels(id, vec!["UNREAD".to_string()], vec![])
            .await
    }

    async fn star(&self, id: &EmailId) -> Result<(), MailError> {
        self.ensure_connected()?;
        self.modify_labels(id, vec!["STARRED".to_string()], vec![])
            .await
    }

    async fn unstar(&self, id: &EmailId) -> Result<(), MailError> {
        self.ensure_connected()?;
        self.modify_labels(id, vec![], vec!["STARRED".to_string()])
            .await
    }

    async fn move_to_folder(&self, id: &EmailId, folder: &FolderName) -> Result<(), MailError> {
        self.ensure_connected()?;
        let destination = self.resolve_folder_label(folder).await?;
        let remove: Vec<String> = EXCLUSIVE_FOLDERS
            .iter()
            .filter(|anchor| **anchor != destination)
            .map(|anchor| anchor.to_string())
            .collect();
        self.modify_labels(id, vec![destination], remove).await
    }

    async fn delete_email(&self, id: &EmailId) -> Result<(), MailError> {
        self.ensure_connected()?;
        let url = self.endpoint(&format!("messages/{}/trash", id.0));
        let response = self.authorized(HttpRequest::post(url)).await?;
        Self::require_success(response, "email", &id.0)?;
        tracing::debug!(message_id = %id, "moved email to trash");
        Ok(())
    }

    async fn add_label(&self, id: &EmailId, label: &LabelId) -> Result<(), MailError> {
        self.ensure_connected()?;
        self.modify_labels(id, vec![label.0.clone()], vec![]).await
    }

    async fn remove_label(&self, id: &EmailId, label: &LabelId) -> Result<(), MailError> {
        self.ensure_connected()?;
        self.modify_labels(id, vec![], vec![label.0.clone()]).await
    }

    async fn fetch_attachment(
        &self,
        email_id: &EmailId,
        attachment_id: &str,
    ) -> Result<Vec<u8>, MailError> {
        self.ensure_connected()?;
        let url = self.endpoint(&format!(
            "messages/{}/attachments/{}",
            email_id.0, attachment_id
        ));
        let response = self.authorized(HttpRequest::get(url)).await?;
        let response = Self::require_success(response, "attachment", attachment_id)?;
        let attachment: WireAttachment = Self::decode_json(&response)?;

        base64url::decode(&attachment.data.unwrap_or_default()).map_err(|err| {
            MailError::Provider {
                provider: PROVIDER_NAME.to_string(),
                message: format!("invalid attachment encoding: {}", err),
                retryable: false,
            }
        })
    }
}

/// Compiles filter criteria into the backend's search query syntax.
fn build_query(filter: &EmailFilter) -> String {
    let mut terms = Vec::new();
    if let Some(from) = &filter.from {
        terms.push(format!("from:{}", from));
    }
    if let Some(to) = &filter.to {
        terms.push(format!("to:{}", to));
    }
    if let Some(subject) = &filter.subject {
        terms.push(format!("subject:\"{}\"", subject));
    }
    if filter.unread_only {
        terms.push("is:unread".to_string());
    }
    match filter.has_attachment {
        Some(true) => terms.push("has:attachment".to_string()),
        Some(false) => terms.push("-has:attachment".to_string()),
        None => {}
    }
    for label in &filter.labels {
        terms.push(format!("label:{}", label.0));
    }
    if let Some(after) = &filter.after {
        terms.push(format!("after:{}", after.timestamp()));
    }
    if let Some(before) = &filter.before {
        terms.push(format!("before:{}", before.timestamp()));
    }
    if let Some(query) = &filter.query {
        terms.push(query.clone());
    }
    terms.join(" ")
}

/// Maps a folder name to the system label id backing it; custom names pass
/// through unchanged for lookup by name.
fn folder_to_label_id(folder: &FolderName) -> String {
    match folder.0.to_uppercase().as_str() {
        "INBOX" => "INBOX".to_string(),
        "SENT" => "SENT".to_string(),
        "DRAFT" | "DRAFTS" => "DRAFT".to_string(),
        "TRASH" => "TRASH".to_string(),
        "SPAM" => "SPAM".to_string(),
        "STARRED" => "STARRED".to_string(),
        _ => folder.0.clone(),
    }
}

fn is_system_label(id: &str) -> bool {
    matches!(
        id,
        "INBOX" | "SENT" | "DRAFT" | "TRASH" | "SPAM" | "STARRED" | "UNREAD"
    )
}
