//! Gmail wire format and decoding into domain types.
//!
//! Every field on the wire structs is optional; the backend omits fields
//! freely depending on the requested format. Decoding is total: missing
//! pieces fall back to empty defaults instead of failing.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::address::{parse_address, parse_address_list};
use crate::codec::{base64url, quoted_printable};
use crate::domain::{
    AttachmentMeta, Email, EmailBody, EmailId, Folder, FolderName, FolderType, Headers, Label,
    LabelId, SendResult, ThreadId,
};

/// Maximum MIME part nesting the decoder will walk. Parts deeper than this
/// are ignored.
pub const MAX_PART_DEPTH: usize = 100;

/// Folder labels in resolution priority order. A message carrying several of
/// these is filed under the first one present.
const FOLDER_PRIORITY: [&str; 5] = ["INBOX", "SENT", "DRAFT", "TRASH", "SPAM"];

/// A full message resource.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    pub id: Option<String>,
    pub thread_id: Option<String>,
    pub label_ids: Option<Vec<String>>,
    #[allow(dead_code)]
    pub snippet: Option<String>,
    /// Epoch milliseconds as a decimal string.
    pub internal_date: Option<String>,
    pub payload: Option<WirePart>,
}

/// One node of the MIME part tree.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePart {
    #[allow(dead_code)]
    pub part_id: Option<String>,
    pub mime_type: Option<String>,
    pub filename: Option<String>,
    pub headers: Option<Vec<WireHeader>>,
    pub body: Option<WireBody>,
    pub parts: Option<Vec<WirePart>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireHeader {
    pub name: Option<String>,
    pub value: Option<String>,
}

/// Part content: inline base64url data, or a reference for separate fetch.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireBody {
    pub attachment_id: Option<String>,
    pub size: Option<u64>,
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessageList {
    pub messages: Option<Vec<WireMessageRef>>,
    pub next_page_token: Option<String>,
    #[allow(dead_code)]
    pub result_size_estimate: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessageRef {
    pub id: Option<String>,
    #[allow(dead_code)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireLabel {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    #[allow(dead_code)]
    pub label_type: Option<String>,
    pub messages_total: Option<u32>,
    pub messages_unread: Option<u32>,
    pub color: Option<WireLabelColor>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireLabelColor {
    pub background_color: Option<String>,
    #[allow(dead_code)]
    pub text_color: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireLabelList {
    pub labels: Option<Vec<WireLabel>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSendRequest {
    /// base64url-encoded RFC 2822 message.
    pub raw: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSendResponse {
    pub id: Option<String>,
    pub thread_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireModifyRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub add_label_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remove_label_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCreateLabelRequest {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAttachment {
    #[allow(dead_code)]
    pub size: Option<u64>,
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireErrorBody {
    pub error: Option<WireErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireErrorDetail {
    #[allow(dead_code)]
    pub code: Option<u32>,
    pub message: Option<String>,
    #[allow(dead_code)]
    pub status: Option<String>,
}

/// Decodes a wire message into the canonical [`Email`].
pub fn decode_message(wire: WireMessage) -> Email {
    let headers = collect_headers(wire.payload.as_ref());
    let labels: Vec<LabelId> = wire
        .label_ids
        .unwrap_or_default()
        .into_iter()
        .map(LabelId::from)
        .collect();

    let received_at = wire
        .internal_date
        .as_deref()
        .and_then(|millis| millis.parse::<i64>().ok())
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
        .unwrap_or_else(Utc::now);
    let date = headers
        .get("Date")
        .and_then(|value| DateTime::parse_from_rfc2822(value).ok())
        .map(|date| date.with_timezone(&Utc))
        .unwrap_or(received_at);

    let body = wire
        .payload
        .as_ref()
        .map(extract_body)
        .unwrap_or_default();
    let attachments = wire
        .payload
        .as_ref()
        .map(extract_attachments)
        .unwrap_or_default();

    let in_reply_to = headers
        .get("In-Reply-To")
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);
    let references: Vec<String> = headers
        .get("References")
        .map(|value| value.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();

    Email {
        id: EmailId::from(wire.id.unwrap_or_default()),
        thread_id: ThreadId::from(wire.thread_id.unwrap_or_default()),
        folder: folder_from_labels(&labels),
        from: headers
            .get("From")
            .map(parse_address)
            .unwrap_or_else(|| parse_address("")),
        to: headers.get("To").map(parse_address_list).unwrap_or_default(),
        cc: headers.get("Cc").map(parse_address_list).unwrap_or_default(),
        bcc: headers
            .get("Bcc")
            .map(parse_address_list)
            .unwrap_or_default(),
        reply_to: headers.get("Reply-To").map(parse_address),
        subject: headers.get("Subject").unwrap_or_default().to_string(),
        body,
        date,
        received_at,
        is_read: !has_label(&labels, "UNREAD"),
        is_starred: has_label(&labels, "STARRED"),
        is_draft: has_label(&labels, "DRAFT"),
        labels,
        attachments,
        headers,
        in_reply_to,
        references,
    }
}

/// Decodes a send response. The timestamp is the client-observed send time;
/// the wire carries none.
pub fn decode_send_response(wire: WireSendResponse) -> SendResult {
    SendResult {
        id: EmailId::from(wire.id.unwrap_or_default()),
        thread_id: wire.thread_id.map(ThreadId::from),
        timestamp: Utc::now(),
    }
}

/// Decodes a wire label into the canonical [`Label`].
pub fn decode_label(label: &WireLabel) -> Label {
    Label {
        id: LabelId::from(label.id.clone().unwrap_or_default()),
        name: label.name.clone().unwrap_or_default(),
        color: label
            .color
            .as_ref()
            .and_then(|color| color.background_color.clone()),
    }
}

/// Projects a single label into a folder with its counts.
pub fn folder_from_label(label: &WireLabel) -> Folder {
    let path = label.name.clone().unwrap_or_default();
    let name = last_segment(&path).to_string();
    make_folder(label, &name, &path)
}

/// Builds the folder hierarchy from the flat label list.
///
/// Nesting follows `/` separators in label names; a label whose parent path
/// has no label of its own stays top-level under its full path. Sibling
/// order matches the wire list order.
pub fn build_folder_tree(labels: &[WireLabel]) -> Vec<Folder> {
    let named: Vec<&WireLabel> = labels.iter().filter(|label| label.name.is_some()).collect();
    let paths: HashSet<&str> = named
        .iter()
        .filter_map(|label| label.name.as_deref())
        .collect();

    let mut children_of: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut roots = Vec::new();
    for (index, label) in named.iter().enumerate() {
        let path = label.name.as_deref().unwrap_or_default();
        match parent_path(path) {
            Some(parent) if paths.contains(parent) => {
                children_of.entry(parent).or_default().push(index);
            }
            _ => roots.push(index),
        }
    }

    roots
        .iter()
        .map(|&index| assemble_folder(&named, &children_of, index, false))
        .collect()
}

fn assemble_folder(
    labels: &[&WireLabel],
    children_of: &HashMap<&str, Vec<usize>>,
    index: usize,
    as_child: bool,
) -> Folder {
    let label = labels[index];
    let path = label.name.as_deref().unwrap_or_default();
    let name = if as_child { last_segment(path) } else { path };

    let mut folder = make_folder(label, name, path);
    if let Some(children) = children_of.get(path) {
        folder.children = children
            .iter()
            .map(|&child| assemble_folder(labels, children_of, child, true))
            .collect();
    }
    folder
}

fn make_folder(label: &WireLabel, name: &str, path: &str) -> Folder {
    Folder {
        name: FolderName::from(name),
        path: path.to_string(),
        kind: FolderType::from_name(path),
        unread_count: label.messages_unread.unwrap_or(0),
        total_count: label.messages_total.unwrap_or(0),
        children: Vec::new(),
    }
}

fn parent_path(path: &str) -> Option<&str> {
    path.rfind('/')
        .map(|index| &path[..index])
        .filter(|parent| !parent.is_empty())
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn collect_headers(payload: Option<&WirePart>) -> Headers {
    let mut headers = Headers::new();
    if let Some(wire_headers) = payload.and_then(|part| part.headers.as_ref()) {
        for header in wire_headers {
            if let (Some(name), Some(value)) = (&header.name, &header.value) {
                headers.insert(name.clone(), value.clone());
            }
        }
    }
    headers
}

fn has_label(labels: &[LabelId], id: &str) -> bool {
    labels.iter().any(|label| label.0 == id)
}

fn folder_from_labels(labels: &[LabelId]) -> FolderName {
    FOLDER_PRIORITY
        .iter()
        .find(|name| has_label(labels, name))
        .map(|name| FolderName::from(*name))
        .unwrap_or_else(|| FolderName::from("INBOX"))
}

/// Extracts body content with a depth-first walk over the part tree.
///
/// The first `text/plain` leaf with inline content supplies the text, the
/// first `text/html` leaf the HTML; later matches are ignored. Leaves whose
/// inline data fails base64 decoding are skipped, leaving the slot open for
/// a later leaf.
fn extract_body(root: &WirePart) -> EmailBody {
    let mut text = None;
    let mut html = None;
    collect_body(root, 0, &mut text, &mut html);
    EmailBody {
        text: text.unwrap_or_default(),
        html,
    }
}

fn collect_body(part: &WirePart, depth: usize, text: &mut Option<String>, html: &mut Option<String>) {
    if depth > MAX_PART_DEPTH {
        return;
    }

    let mime_type = part.mime_type.as_deref().unwrap_or("");
    if let Some(data) = part.body.as_ref().and_then(|body| body.data.as_deref()) {
        if text.is_none() && mime_type.eq_ignore_ascii_case("text/plain") {
            *text = decode_part_text(part, data);
        } else if html.is_none() && mime_type.eq_ignore_ascii_case("text/html") {
            *html = decode_part_text(part, data);
        }
    }

    if let Some(parts) = &part.parts {
        for child in parts {
            collect_body(child, depth + 1, text, html);
        }
    }
}

/// Extracts attachment metadata from the part tree.
///
/// Only leaves with a filename and a content reference count; inline data
/// parts and containers are skipped.
fn extract_attachments(root: &WirePart) -> Vec<AttachmentMeta> {
    let mut attachments = Vec::new();
    collect_attachments(root, 0, &mut attachments);
    attachments
}

fn collect_attachments(part: &WirePart, depth: usize, attachments: &mut Vec<AttachmentMeta>) {
    if depth > MAX_PART_DEPTH {
        return;
    }

    let filename = part.filename.as_deref().unwrap_or("");
    if !filename.is_empty() {
        if let Some(attachment_id) = part.body.as_ref().and_then(|body| body.attachment_id.clone())
        {
            attachments.push(AttachmentMeta {
                id: attachment_id,
                filename: filename.to_string(),
                mime_type: part
                    .mime_type
                    .clone()
                    .unwrap_or_else(|| "application/octet-stream".to_string()),
                size: part.body.as_ref().and_then(|body| body.size).unwrap_or(0),
            });
        }
    }

    if let Some(parts) = &part.parts {
        for child in parts {
            collect_attachments(child, depth + 1, attachments);
        }
    }
}

fn decode_part_text(part: &WirePart, data: &str) -> Option<String> {
    let bytes = base64url::decode(data).ok()?;
    let bytes = if is_quoted_printable(part) {
        quoted_printable::decode(&bytes)
    } else {
        bytes
    };
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

fn is_quoted_printable(part: &WirePart) -> bool {
    part_header(part, "Content-Transfer-Encoding")
        .map(|value| value.trim().eq_ignore_ascii_case("quoted-printable"))
        .unwrap_or(false)
}

fn part_header<'a>(part: &'a WirePart, name: &str) -> Option<&'a str> {
    part.headers.as_ref()?.iter().find_map(|header| {
        let header_name = header.name.as_deref()?;
        if header_name.eq_ignore_ascii_case(name) {
            header.value.as_deref()
        } else {
            None
        }
    })
}
