//! Email domain types.
//!
//! Represents individual email messages and related structures. These are
//! plain value objects; mutation operations act on identifiers and
//! round-trip through the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EmailId, FolderName, LabelId, ThreadId};
use crate::codec::html::html_to_text;

/// An email address with optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Email address.
    pub email: String,
    /// Display name (e.g., "John Doe").
    pub name: Option<String>,
}

impl Address {
    /// Creates a new address with just an email.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    /// Creates a new address with email and display name.
    pub fn with_name(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: Some(name.into()),
        }
    }

    /// Returns the display representation of this address.
    ///
    /// If a name is present, returns "Name <email>", otherwise just the email.
    pub fn display(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", name, self.email),
            None => self.email.clone(),
        }
    }
}

/// Case-insensitive collection of message headers.
///
/// Preserves insertion order and duplicate header names; lookup compares
/// names case-insensitively, returning the first match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    /// Creates an empty header collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header, keeping any existing headers with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// Returns the first header value with the given name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns all header values with the given name, ignoring case.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.0
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Iterates over all headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Returns the number of headers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no headers are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Body content of an email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailBody {
    /// Plain text content. Empty when the message carried no text part.
    pub text: String,
    /// HTML content, when an HTML part exists.
    pub html: Option<String>,
}

impl EmailBody {
    /// Creates a plain-text-only body.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            html: None,
        }
    }

    /// Returns text suitable for display.
    ///
    /// Prefers the plain text part; when it is empty and an HTML part
    /// exists, returns a plain-text reduction of the HTML.
    pub fn display_text(&self) -> String {
        if !self.text.is_empty() {
            return self.text.clone();
        }
        match &self.html {
            Some(html) => html_to_text(html),
            None => String::new(),
        }
    }
}

/// Metadata for a file attached to an email.
///
/// Carries metadata only; attachment content is fetched separately through
/// the provider's attachment capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMeta {
    /// Backend identifier used to fetch the content.
    pub id: String,
    /// Original filename.
    pub filename: String,
    /// MIME content type.
    pub mime_type: String,
    /// Size in bytes.
    pub size: u64,
}

/// An individual email message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Email {
    /// Unique identifier for this email.
    pub id: EmailId,
    /// Thread (conversation) this email belongs to.
    pub thread_id: ThreadId,
    /// Folder the email currently lives in.
    pub folder: FolderName,
    /// Sender address.
    pub from: Address,
    /// Primary recipient addresses.
    pub to: Vec<Address>,
    /// Carbon copy recipient addresses.
    pub cc: Vec<Address>,
    /// Blind carbon copy recipient addresses.
    pub bcc: Vec<Address>,
    /// Address replies should be sent to, when it differs from the sender.
    pub reply_to: Option<Address>,
    /// Email subject line. Empty when the message carried no subject.
    pub subject: String,
    /// Body content.
    pub body: EmailBody,
    /// Date asserted by the author (Date header), when parseable; otherwise
    /// the backend's receive time.
    pub date: DateTime<Utc>,
    /// Date the backend received the message.
    pub received_at: DateTime<Utc>,
    /// Whether the email has been read.
    pub is_read: bool,
    /// Whether the email is starred/flagged.
    pub is_starred: bool,
    /// Whether this is a draft.
    pub is_draft: bool,
    /// Labels applied to this email.
    pub labels: Vec<LabelId>,
    /// Attachment metadata.
    pub attachments: Vec<AttachmentMeta>,
    /// Raw message headers from the envelope.
    pub headers: Headers,
    /// Message-ID of the email this is replying to.
    pub in_reply_to: Option<String>,
    /// Chain of Message-IDs for threading.
    pub references: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_display_with_name() {
        let addr = Address::with_name("test@example.com", "Test User");
        assert_eq!(addr.display(), "Test User <test@example.com>");
    }

    #[test]
    fn address_display_without_name() {
        let addr = Address::new("test@example.com");
        assert_eq!(addr.display(), "test@example.com");
    }

    #[test]
    fn headers_lookup_ignores_case() {
        let mut headers = Headers::new();
        headers.insert("Content-Type", "text/plain");
        headers.insert("Subject", "Hello");

        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("SUBJECT"), Some("Hello"));
        assert_eq!(headers.get("X-Missing"), None);
    }

    #[test]
    fn headers_keep_duplicates_in_order() {
        let mut headers = Headers::new();
        headers.insert("Received", "from a");
        headers.insert("Received", "from b");

        assert_eq!(headers.get("received"), Some("from a"));
        let all: Vec<&str> = headers.get_all("Received").collect();
        assert_eq!(all, vec!["from a", "from b"]);
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn body_display_text_prefers_plain() {
        let body = EmailBody {
            text: "plain version".to_string(),
            html: Some("<p>html version</p>".to_string()),
        };
        assert_eq!(body.display_text(), "plain version");
    }

    #[test]
    fn body_display_text_falls_back_to_html() {
        let body = EmailBody {
            text: String::new(),
            html: Some("<p>Hello <b>world</b></p>".to_string()),
        };
        assert_eq!(body.display_text(), "Hello world");
    }

    #[test]
    fn body_display_text_empty_when_no_content() {
        let body = EmailBody::default();
        assert_eq!(body.display_text(), "");
    }

    #[test]
    fn attachment_meta_serialization() {
        let attachment = AttachmentMeta {
            id: "att-1".to_string(),
            filename: "document.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            size: 1024,
        };

        let json = serde_json::to_string(&attachment).unwrap();
        let deserialized: AttachmentMeta = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized, attachment);
    }

    #[test]
    fn email_with_references() {
        let email = Email {
            id: EmailId::from("email-1"),
            thread_id: ThreadId::from("thread-1"),
            folder: FolderName::from("INBOX"),
            from: Address::with_name("sender@example.com", "Sender"),
            to: vec![Address::new("recipient@example.com")],
            cc: vec![],
            bcc: vec![],
            reply_to: None,
            subject: "Re: Test".to_string(),
            body: EmailBody::plain("Reply content"),
            date: Utc::now(),
            received_at: Utc::now(),
            is_read: false,
            is_starred: false,
            is_draft: false,
            labels: vec![LabelId::from("INBOX")],
            attachments: vec![],
            headers: Headers::new(),
            in_reply_to: Some("<msg-2@example.com>".to_string()),
            references: vec![
                "<msg-1@example.com>".to_string(),
                "<msg-2@example.com>".to_string(),
            ],
        };

        assert_eq!(email.references.len(), 2);
        assert!(email.in_reply_to.is_some());
        assert!(email.attachments.is_empty());
    }
}
