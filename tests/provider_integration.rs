//! Integration tests for the Gmail backend behind [`MailClient`].
//!
//! These tests drive the full path from client call to wire request and
//! back: auth token exchange, request construction, response decoding, and
//! error classification, all over a scripted transport. Module-level logic
//! is covered by unit tests next to each module.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use serde_json::json;

use unimail::codec::base64url;
use unimail::domain::{Address, EmailId, FolderName, FolderType, OutgoingEmail};
use unimail::providers::{AssertionClaims, AssertionSigner, GmailConfig, GmailProvider};
use unimail::transport::{HttpRequest, HttpResponse, HttpTransport, Method};
use unimail::{Backoff, EmailFilter, MailClient, MailError, RetryPolicy};

/// Routes crate logs to the test harness when `RUST_LOG` is set.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Test Doubles
// ============================================================================

/// Transport that hands out scripted responses in order and records every
/// request it sees.
struct FakeTransport {
    requests: Mutex<Vec<HttpRequest>>,
    responses: Mutex<VecDeque<HttpResponse>>,
}

impl FakeTransport {
    fn scripted(responses: Vec<HttpResponse>) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            responses: Mutex::new(responses.into()),
        })
    }

    fn recorded(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn execute(&self, request: HttpRequest) -> anyhow::Result<HttpResponse> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no scripted response left"))
    }
}

struct StaticSigner;

impl AssertionSigner for StaticSigner {
    fn sign(&self, _claims: &AssertionClaims) -> anyhow::Result<String> {
        Ok("integration-assertion".to_string())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn json_response(status: u16, body: serde_json::Value) -> HttpResponse {
    HttpResponse {
        status,
        headers: Vec::new(),
        body: Bytes::from(body.to_string()),
    }
}

fn token_response() -> HttpResponse {
    json_response(
        200,
        json!({ "access_token": "tok-int", "expires_in": 3600 }),
    )
}

fn message_json(id: &str, subject: &str, body: &str) -> serde_json::Value {
    json!({
        "id": id,
        "threadId": format!("thread-{}", id),
        "labelIds": ["INBOX", "UNREAD"],
        "internalDate": "1700000000000",
        "payload": {
            "mimeType": "text/plain",
            "headers": [
                { "name": "From", "value": "Alice <alice@example.com>" },
                { "name": "To", "value": "bob@example.com" },
                { "name": "Subject", "value": subject },
                { "name": "Date", "value": "Tue, 14 Nov 2023 22:13:20 +0000" }
            ],
            "body": { "data": base64url::encode(body), "size": body.len() }
        }
    })
}

fn test_config() -> GmailConfig {
    GmailConfig {
        issuer: "svc@project.test".to_string(),
        subject: "user@example.com".to_string(),
        scope: "https://mail.google.com/".to_string(),
        base_url: "https://api.test/gmail/v1".to_string(),
        token_endpoint: "https://token.test/exchange".to_string(),
    }
}

fn client_over(transport: Arc<FakeTransport>, retry: RetryPolicy) -> MailClient {
    let provider = GmailProvider::with_transport(test_config(), Arc::new(StaticSigner), transport);
    MailClient::with_retry(Arc::new(provider), retry)
}

fn no_retry_client(transport: Arc<FakeTransport>) -> MailClient {
    client_over(transport, RetryPolicy::disabled())
}

fn request_body_json(request: &HttpRequest) -> serde_json::Value {
    serde_json::from_slice(request.body.as_ref().unwrap()).unwrap()
}

// ============================================================================
// Connection and Listing
// ============================================================================

#[tokio::test]
async fn connect_then_list_decodes_emails() {
    init_tracing();
    let transport = FakeTransport::scripted(vec![
        token_response(),
        json_response(
            200,
            json!({ "messages": [{ "id": "m1" }, { "id": "m2" }] }),
        ),
        json_response(200, message_json("m1", "First", "hello one")),
        json_response(200, message_json("m2", "Second", "hello two")),
    ]);
    let client = no_retry_client(transport.clone());

    client.connect().await.unwrap();
    assert!(client.is_connected());

    let filter = EmailFilter::new().in_folder("INBOX").with_limit(2);
    let emails = client.list_emails(&filter).await.unwrap();

    assert_eq!(emails.len(), 2);
    assert_eq!(emails[0].id.0, "m1");
    assert_eq!(emails[0].subject, "First");
    assert_eq!(emails[0].from.name.as_deref(), Some("Alice"));
    assert_eq!(emails[0].body.text, "hello one");
    assert!(!emails[0].is_read);
    assert_eq!(emails[1].id.0, "m2");
    assert_eq!(emails[1].subject, "Second");

    let requests = transport.recorded();
    assert_eq!(requests.len(), 4);
    assert_eq!(requests[0].url, "https://token.test/exchange");
    assert!(requests[1]
        .url
        .starts_with("https://api.test/gmail/v1/users/me/messages?"));
    assert!(requests[1].url.contains("maxResults=2"));
    assert!(requests[1].url.contains("labelIds=INBOX"));
    assert!(requests[2].url.contains("/messages/m1?format=full"));
    assert!(requests[3].url.contains("/messages/m2?format=full"));
    for request in &requests[1..] {
        assert!(request
            .headers
            .iter()
            .any(|(name, value)| name == "Authorization" && value == "Bearer tok-int"));
    }
}

#[tokio::test]
async fn dropped_stream_stops_fetching() {
    // The page advertises more results and holds a second id; consuming one
    // item must fetch exactly one page and one message.
    let transport = FakeTransport::scripted(vec![
        token_response(),
        json_response(
            200,
            json!({
                "messages": [{ "id": "m1" }, { "id": "m2" }],
                "nextPageToken": "page-2"
            }),
        ),
        json_response(200, message_json("m1", "Only", "first")),
    ]);
    let client = no_retry_client(transport.clone());
    client.connect().await.unwrap();

    let emails: Vec<_> = client
        .stream_emails(EmailFilter::new(), 2)
        .take(1)
        .try_collect()
        .await
        .unwrap();

    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0].id.0, "m1");
    assert_eq!(transport.recorded().len(), 3);
}

#[tokio::test]
async fn missing_email_maps_to_not_found() {
    let transport = FakeTransport::scripted(vec![
        token_response(),
        json_response(
            404,
            json!({ "error": { "code": 404, "message": "Not Found" } }),
        ),
    ]);
    let client = no_retry_client(transport);
    client.connect().await.unwrap();

    let err = client.get_email(&EmailId::from("ghost")).await.unwrap_err();

    match err {
        MailError::NotFound {
            resource_type,
            resource_id,
        } => {
            assert_eq!(resource_type, "email");
            assert_eq!(resource_id, "ghost");
        }
        other => panic!("Expected NotFound, got {:?}", other),
    }
}

// ============================================================================
// Resilience
// ============================================================================

#[tokio::test]
async fn transient_server_errors_are_retried_to_success() {
    init_tracing();
    let transport = FakeTransport::scripted(vec![
        token_response(),
        json_response(500, json!({ "error": { "message": "Backend Error" } })),
        json_response(500, json!({ "error": { "message": "Backend Error" } })),
        json_response(200, json!({})),
    ]);
    let client = client_over(
        transport.clone(),
        RetryPolicy::new(3, Backoff::None, Duration::ZERO, Duration::ZERO),
    );
    client.connect().await.unwrap();

    let emails = client.list_emails(&EmailFilter::new()).await.unwrap();

    assert!(emails.is_empty());
    let requests = transport.recorded();
    assert_eq!(requests.len(), 4);
    // The cached token serves all three attempts.
    let token_requests = requests
        .iter()
        .filter(|request| request.url.starts_with("https://token.test"))
        .count();
    assert_eq!(token_requests, 1);
}

#[tokio::test]
async fn rate_limit_surfaces_retry_after() {
    let mut limited = json_response(
        429,
        json!({ "error": { "code": 429, "message": "Rate limit exceeded" } }),
    );
    limited
        .headers
        .push(("Retry-After".to_string(), "30".to_string()));

    let transport = FakeTransport::scripted(vec![token_response(), limited]);
    let client = no_retry_client(transport);
    client.connect().await.unwrap();

    let err = client.list_emails(&EmailFilter::new()).await.unwrap_err();

    match err {
        MailError::RateLimit {
            message,
            retry_after,
        } => {
            assert_eq!(retry_after, Some(Duration::from_secs(30)));
            assert!(message.contains("Rate limit exceeded"));
        }
        other => panic!("Expected RateLimit, got {:?}", other),
    }
}

#[tokio::test]
async fn disconnect_drops_the_cached_token() {
    let transport = FakeTransport::scripted(vec![token_response(), token_response()]);
    let client = no_retry_client(transport.clone());

    client.connect().await.unwrap();
    client.disconnect().await.unwrap();
    assert!(!client.is_connected());
    client.connect().await.unwrap();

    assert_eq!(transport.recorded().len(), 2);
}

// ============================================================================
// Sending
// ============================================================================

#[tokio::test]
async fn send_builds_mime_and_decodes_response() {
    let transport = FakeTransport::scripted(vec![
        token_response(),
        json_response(200, json!({ "id": "sent-99", "threadId": "t-5" })),
    ]);
    let client = no_retry_client(transport.clone());
    client.connect().await.unwrap();

    let email = OutgoingEmail {
        to: vec![Address::with_name("bob@example.com", "Bob")],
        subject: "Expenses".to_string(),
        text: "Receipts attached below.".to_string(),
        ..Default::default()
    };
    let result = client.send_email(&email).await.unwrap();

    assert_eq!(result.id.0, "sent-99");
    assert_eq!(result.thread_id.as_ref().map(|t| t.0.as_str()), Some("t-5"));

    let requests = transport.recorded();
    let send = &requests[1];
    assert_eq!(send.method, Method::Post);
    assert!(send.url.ends_with("/users/me/messages/send"));

    let body = request_body_json(send);
    let raw = body["raw"].as_str().unwrap();
    let mime = String::from_utf8(base64url::decode(raw).unwrap()).unwrap();
    assert!(mime.contains("To: Bob <bob@example.com>\r\n"));
    assert!(mime.contains("Subject: Expenses\r\n"));
    assert!(mime.contains("Receipts attached below."));
}

#[tokio::test]
async fn invalid_email_is_rejected_before_any_request() {
    let transport = FakeTransport::scripted(vec![token_response()]);
    let client = no_retry_client(transport.clone());
    client.connect().await.unwrap();

    let err = client.send_email(&OutgoingEmail::new()).await.unwrap_err();

    assert!(matches!(err, MailError::Validation { .. }));
    // Only the connect-time token exchange reached the transport.
    assert_eq!(transport.recorded().len(), 1);
}

// ============================================================================
// Folders and Mutations
// ============================================================================

#[tokio::test]
async fn folder_tree_is_built_from_labels() {
    let transport = FakeTransport::scripted(vec![
        token_response(),
        json_response(
            200,
            json!({
                "labels": [
                    { "id": "INBOX", "name": "INBOX", "type": "system",
                      "messagesTotal": 40, "messagesUnread": 3 },
                    { "id": "Label_1", "name": "Work", "type": "user" },
                    { "id": "Label_2", "name": "Work/Projects", "type": "user",
                      "messagesTotal": 12, "messagesUnread": 2 }
                ]
            }),
        ),
    ]);
    let client = no_retry_client(transport);
    client.connect().await.unwrap();

    let folders = client.list_folders().await.unwrap();

    assert_eq!(folders.len(), 2);
    assert_eq!(folders[0].name.0, "INBOX");
    assert_eq!(folders[0].kind, FolderType::Inbox);
    assert_eq!(folders[0].unread_count, 3);

    let work = &folders[1];
    assert_eq!(work.name.0, "Work");
    assert_eq!(work.children.len(), 1);
    assert_eq!(work.children[0].name.0, "Projects");
    assert_eq!(work.children[0].path, "Work/Projects");
    assert_eq!(work.children[0].total_count, 12);
}

#[tokio::test]
async fn move_to_folder_swaps_exclusive_anchors() {
    let transport = FakeTransport::scripted(vec![token_response(), json_response(200, json!({}))]);
    let client = no_retry_client(transport.clone());
    client.connect().await.unwrap();

    client
        .move_to_folder(&EmailId::from("m1"), &FolderName::from("TRASH"))
        .await
        .unwrap();

    let requests = transport.recorded();
    let modify = &requests[1];
    assert!(modify.url.ends_with("/users/me/messages/m1/modify"));
    assert_eq!(
        request_body_json(modify),
        json!({ "addLabelIds": ["TRASH"], "removeLabelIds": ["INBOX", "SPAM"] })
    );
}

#[tokio::test]
async fn mark_read_removes_the_unread_label() {
    let transport = FakeTransport::scripted(vec![token_response(), json_response(200, json!({}))]);
    let client = no_retry_client(transport.clone());
    client.connect().await.unwrap();

    client.mark_read(&EmailId::from("m1")).await.unwrap();

    let modify = &transport.recorded()[1];
    assert_eq!(
        request_body_json(modify),
        json!({ "removeLabelIds": ["UNREAD"] })
    );
}
