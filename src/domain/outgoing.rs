//! Outgoing email types.
//!
//! The write-side model callers build to send mail. The sender identity is
//! not part of [`OutgoingEmail`]; backends send from the authenticated
//! account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Address, EmailId, ThreadId};
use crate::codec::address::is_valid_email;
use crate::error::{MailError, Result};

/// An email to be sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutgoingEmail {
    /// Recipient addresses.
    pub to: Vec<Address>,
    /// CC addresses.
    pub cc: Vec<Address>,
    /// BCC addresses.
    pub bcc: Vec<Address>,
    /// Address replies should be directed to.
    pub reply_to: Option<Address>,
    /// Email subject.
    pub subject: String,
    /// Plain text body.
    pub text: String,
    /// HTML body (optional).
    pub html: Option<String>,
    /// Message-ID of the email being replied to.
    pub in_reply_to: Option<String>,
    /// Chain of Message-IDs for threading.
    pub references: Vec<String>,
    /// Attachment data.
    pub attachments: Vec<OutgoingAttachment>,
}

impl OutgoingEmail {
    /// Creates an empty outgoing email.
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks that this email is well-formed enough to hand to a backend.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::Validation`] when no recipient is present or
    /// any recipient address fails the loose email-shape check.
    pub fn validate(&self) -> Result<()> {
        if self.to.is_empty() {
            return Err(MailError::validation(
                "to",
                "at least one recipient is required",
            ));
        }

        for (field, addresses) in [("to", &self.to), ("cc", &self.cc), ("bcc", &self.bcc)] {
            for address in addresses.iter() {
                if !is_valid_email(&address.email) {
                    return Err(MailError::validation(
                        field,
                        format!("invalid address: {}", address.email),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// An attachment to be sent with an outgoing email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingAttachment {
    /// Filename for the attachment.
    pub filename: String,
    /// MIME content type.
    pub mime_type: String,
    /// Raw attachment data.
    #[serde(with = "base64_serde")]
    pub data: Vec<u8>,
}

mod base64_serde {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD
            .decode(&s)
            .map_err(|e| serde::de::Error::custom(e.to_string()))
    }
}

/// Outcome of a successful send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResult {
    /// Identifier the backend assigned to the sent message.
    pub id: EmailId,
    /// Thread the message was filed into, when the backend reports it.
    pub thread_id: Option<ThreadId>,
    /// When the send completed.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_email() -> OutgoingEmail {
        OutgoingEmail {
            to: vec![Address::with_name("recipient@example.com", "Recipient")],
            subject: "Test Subject".to_string(),
            text: "Plain text body".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn validate_accepts_well_formed_email() {
        assert!(valid_email().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_recipients() {
        let email = OutgoingEmail {
            to: vec![],
            ..valid_email()
        };

        let err = email.validate().unwrap_err();
        assert!(matches!(err, MailError::Validation { ref field, .. } if field == "to"));
    }

    #[test]
    fn validate_rejects_malformed_recipient() {
        let email = OutgoingEmail {
            to: vec![Address::new("not-an-address")],
            ..valid_email()
        };

        let err = email.validate().unwrap_err();
        assert!(err.to_string().contains("not-an-address"));
    }

    #[test]
    fn validate_checks_cc_and_bcc() {
        let mut email = valid_email();
        email.cc = vec![Address::new("bad@@example")];

        let err = email.validate().unwrap_err();
        assert!(matches!(err, MailError::Validation { ref field, .. } if field == "cc"));

        let mut email = valid_email();
        email.bcc = vec![Address::new("nope")];

        let err = email.validate().unwrap_err();
        assert!(matches!(err, MailError::Validation { ref field, .. } if field == "bcc"));
    }

    #[test]
    fn outgoing_email_serialization() {
        let email = OutgoingEmail {
            to: vec![Address::with_name("recipient@example.com", "Recipient")],
            subject: "Test Subject".to_string(),
            text: "Plain text body".to_string(),
            html: Some("<p>HTML body</p>".to_string()),
            ..Default::default()
        };

        let json = serde_json::to_string(&email).unwrap();
        let deserialized: OutgoingEmail = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.subject, "Test Subject");
        assert_eq!(deserialized.to.len(), 1);
        assert_eq!(deserialized.to[0].email, "recipient@example.com");
    }

    #[test]
    fn outgoing_attachment_serializes_data_as_base64() {
        let attachment = OutgoingAttachment {
            filename: "document.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            data: vec![0x25, 0x50, 0x44, 0x46], // PDF magic bytes
        };

        let json = serde_json::to_string(&attachment).unwrap();
        assert!(json.contains("JVBERg=="));

        let deserialized: OutgoingAttachment = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.data, vec![0x25, 0x50, 0x44, 0x46]);
    }

    #[test]
    fn send_result_round_trip() {
        let result = SendResult {
            id: EmailId::from("sent-1"),
            thread_id: Some(ThreadId::from("thread-9")),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&result).unwrap();
        let deserialized: SendResult = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.id, result.id);
        assert_eq!(deserialized.thread_id, result.thread_id);
    }
}
