//! Outbound message encoding.
//!
//! Builds an RFC 2822 message from an [`OutgoingEmail`] and wraps it in the
//! base64url transport encoding the send endpoint expects. The backend fills
//! in the From header from the authenticated account, so none is written.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use uuid::Uuid;

use crate::codec::address::{format_address, format_address_list};
use crate::codec::base64url;
use crate::domain::{Address, OutgoingEmail};

/// Column width for base64 attachment content.
const BASE64_LINE_WIDTH: usize = 76;

/// Encodes an outgoing email as a base64url raw message ready for transport.
pub fn encode_outgoing(email: &OutgoingEmail) -> String {
    base64url::encode(build_mime(email))
}

/// Builds the RFC 2822 message text.
pub fn build_mime(email: &OutgoingEmail) -> String {
    let mut message = String::new();

    push_address_header(&mut message, "To", &email.to);
    push_address_header(&mut message, "Cc", &email.cc);
    push_address_header(&mut message, "Bcc", &email.bcc);
    if let Some(reply_to) = &email.reply_to {
        message.push_str(&format!("Reply-To: {}\r\n", format_address(reply_to)));
    }
    message.push_str(&format!("Subject: {}\r\n", email.subject));
    if let Some(in_reply_to) = &email.in_reply_to {
        message.push_str(&format!("In-Reply-To: {}\r\n", angle_wrap(in_reply_to)));
    }
    if !email.references.is_empty() {
        let references = email
            .references
            .iter()
            .map(|id| angle_wrap(id))
            .collect::<Vec<_>>()
            .join(" ");
        message.push_str(&format!("References: {}\r\n", references));
    }
    message.push_str("MIME-Version: 1.0\r\n");

    if email.attachments.is_empty() {
        push_body(&mut message, email);
    } else {
        push_mixed(&mut message, email);
    }

    message
}

fn push_address_header(message: &mut String, name: &str, addresses: &[Address]) {
    if !addresses.is_empty() {
        message.push_str(&format!("{}: {}\r\n", name, format_address_list(addresses)));
    }
}

/// Writes the body with its Content-Type header.
///
/// Text only gives `text/plain` and HTML only gives `text/html`; both
/// together give `multipart/alternative` with the plain part first.
fn push_body(message: &mut String, email: &OutgoingEmail) {
    match &email.html {
        None => {
            message.push_str("Content-Type: text/plain; charset=UTF-8\r\n\r\n");
            message.push_str(&email.text);
        }
        Some(html) if email.text.is_empty() => {
            message.push_str("Content-Type: text/html; charset=UTF-8\r\n\r\n");
            message.push_str(html);
        }
        Some(html) => {
            let boundary = make_boundary();
            message.push_str(&format!(
                "Content-Type: multipart/alternative; boundary=\"{}\"\r\n\r\n",
                boundary
            ));
            message.push_str(&format!(
                "--{}\r\nContent-Type: text/plain; charset=UTF-8\r\n\r\n{}\r\n",
                boundary, email.text
            ));
            message.push_str(&format!(
                "--{}\r\nContent-Type: text/html; charset=UTF-8\r\n\r\n{}\r\n",
                boundary, html
            ));
            message.push_str(&format!("--{}--\r\n", boundary));
        }
    }
}

/// Writes a `multipart/mixed` envelope: the body first (nested
/// `multipart/alternative` when both representations exist), then one
/// base64 part per attachment.
fn push_mixed(message: &mut String, email: &OutgoingEmail) {
    let boundary = make_boundary();
    message.push_str(&format!(
        "Content-Type: multipart/mixed; boundary=\"{}\"\r\n\r\n",
        boundary
    ));

    let mut body_part = String::new();
    push_body(&mut body_part, email);
    message.push_str(&format!("--{}\r\n{}\r\n", boundary, body_part));

    for attachment in &email.attachments {
        message.push_str(&format!("--{}\r\n", boundary));
        message.push_str(&format!(
            "Content-Type: {}; name=\"{}\"\r\n",
            attachment.mime_type, attachment.filename
        ));
        message.push_str(&format!(
            "Content-Disposition: attachment; filename=\"{}\"\r\n",
            attachment.filename
        ));
        message.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
        message.push_str(&wrap_base64(&STANDARD.encode(&attachment.data)));
        message.push_str("\r\n");
    }
    message.push_str(&format!("--{}--\r\n", boundary));
}

/// Splits base64 content into 76-column lines.
fn wrap_base64(encoded: &str) -> String {
    encoded
        .as_bytes()
        .chunks(BASE64_LINE_WIDTH)
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\r\n")
}

fn angle_wrap(id: &str) -> String {
    let id = id.trim();
    if id.starts_with('<') && id.ends_with('>') {
        id.to_string()
    } else {
        format!("<{}>", id)
    }
}

/// Builds a boundary unique to this message.
fn make_boundary() -> String {
    format!(
        "----=_unimail_{}_{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OutgoingAttachment;

    fn base_email() -> OutgoingEmail {
        OutgoingEmail {
            to: vec![Address::with_name("alice@example.com", "Alice")],
            subject: "Status".to_string(),
            text: "All green.".to_string(),
            ..Default::default()
        }
    }

    fn boundaries_of(message: &str) -> Vec<String> {
        message
            .match_indices("boundary=\"")
            .map(|(start, _)| {
                let rest = &message[start + "boundary=\"".len()..];
                rest[..rest.find('"').unwrap()].to_string()
            })
            .collect()
    }

    #[test]
    fn text_only_message() {
        let message = build_mime(&base_email());

        assert!(message.starts_with("To: Alice <alice@example.com>\r\n"));
        assert!(message.contains("Subject: Status\r\n"));
        assert!(message.contains("MIME-Version: 1.0\r\n"));
        assert!(message.contains("Content-Type: text/plain; charset=UTF-8\r\n\r\nAll green."));
        assert!(!message.contains("multipart"));
        assert!(!message.contains("From:"));
    }

    #[test]
    fn html_only_message() {
        let mut email = base_email();
        email.text = String::new();
        email.html = Some("<p>All green.</p>".to_string());

        let message = build_mime(&email);
        assert!(message.contains("Content-Type: text/html; charset=UTF-8\r\n\r\n<p>All green.</p>"));
        assert!(!message.contains("multipart"));
    }

    #[test]
    fn both_representations_use_alternative() {
        let mut email = base_email();
        email.html = Some("<p>All green.</p>".to_string());

        let message = build_mime(&email);
        assert!(message.contains("Content-Type: multipart/alternative"));

        let plain_at = message.find("Content-Type: text/plain").unwrap();
        let html_at = message.find("Content-Type: text/html").unwrap();
        assert!(plain_at < html_at);

        let boundary = &boundaries_of(&message)[0];
        assert!(message.contains(&format!("--{}--\r\n", boundary)));
    }

    #[test]
    fn attachments_use_mixed_with_nested_body() {
        let mut email = base_email();
        email.html = Some("<p>All green.</p>".to_string());
        email.attachments.push(OutgoingAttachment {
            filename: "report.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            data: vec![0x25, 0x50, 0x44, 0x46],
        });

        let message = build_mime(&email);
        let boundaries = boundaries_of(&message);
        assert_eq!(boundaries.len(), 2);
        assert_ne!(boundaries[0], boundaries[1]);

        let mixed_at = message.find("Content-Type: multipart/mixed").unwrap();
        let alternative_at = message.find("Content-Type: multipart/alternative").unwrap();
        assert!(mixed_at < alternative_at);

        assert!(message.contains("Content-Type: application/pdf; name=\"report.pdf\"\r\n"));
        assert!(message.contains("Content-Disposition: attachment; filename=\"report.pdf\"\r\n"));
        assert!(message.contains("Content-Transfer-Encoding: base64\r\n\r\nJVBERg==\r\n"));
    }

    #[test]
    fn attachment_content_wraps_at_76_columns() {
        let mut email = base_email();
        email.attachments.push(OutgoingAttachment {
            filename: "blob.bin".to_string(),
            mime_type: "application/octet-stream".to_string(),
            data: vec![0xAB; 120],
        });

        let message = build_mime(&email);
        let start = message
            .find("Content-Transfer-Encoding: base64\r\n\r\n")
            .unwrap()
            + "Content-Transfer-Encoding: base64\r\n\r\n".len();
        let end = message[start..].find("\r\n--").unwrap() + start;
        let lines: Vec<&str> = message[start..end].split("\r\n").collect();

        assert!(lines.len() > 1);
        assert!(lines.iter().all(|line| line.len() <= 76));
        assert_eq!(
            STANDARD.decode(lines.join("")).unwrap(),
            vec![0xAB; 120]
        );
    }

    #[test]
    fn reply_headers_are_angle_wrapped() {
        let mut email = base_email();
        email.in_reply_to = Some("abc@mail.example.com".to_string());
        email.references = vec![
            "<first@mail.example.com>".to_string(),
            "second@mail.example.com".to_string(),
        ];

        let message = build_mime(&email);
        assert!(message.contains("In-Reply-To: <abc@mail.example.com>\r\n"));
        assert!(message
            .contains("References: <first@mail.example.com> <second@mail.example.com>\r\n"));
    }

    #[test]
    fn recipients_render_quoted_names() {
        let mut email = base_email();
        email.to = vec![Address::with_name("john@x.com", "Doe, John")];
        email.cc = vec![Address::new("cc@example.com")];
        email.reply_to = Some(Address::new("replies@example.com"));

        let message = build_mime(&email);
        assert!(message.contains("To: \"Doe, John\" <john@x.com>\r\n"));
        assert!(message.contains("Cc: cc@example.com\r\n"));
        assert!(message.contains("Reply-To: replies@example.com\r\n"));
    }

    #[test]
    fn empty_recipient_lists_omit_headers() {
        let message = build_mime(&base_email());
        assert!(!message.contains("Cc:"));
        assert!(!message.contains("Bcc:"));
        assert!(!message.contains("Reply-To:"));
        assert!(!message.contains("In-Reply-To:"));
        assert!(!message.contains("References:"));
    }

    #[test]
    fn boundaries_differ_between_messages() {
        let mut email = base_email();
        email.html = Some("<p>x</p>".to_string());

        let first = boundaries_of(&build_mime(&email));
        let second = boundaries_of(&build_mime(&email));
        assert_ne!(first[0], second[0]);
    }

    #[test]
    fn transport_encoding_round_trips() {
        let raw = encode_outgoing(&base_email());

        assert!(!raw.contains('+'));
        assert!(!raw.contains('/'));
        assert!(!raw.contains('='));

        let decoded = String::from_utf8(base64url::decode(&raw).unwrap()).unwrap();
        assert!(decoded.starts_with("To: Alice <alice@example.com>"));
        assert!(decoded.contains("All green."));
    }
}
