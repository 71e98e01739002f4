//! Gmail wrapper tools: list labels, list recent emails, read one email,
//! send, and reply.
//!
//! Every tool reshapes the Gmail API's JSON into a readable string; vendor
//! failures come back as formatted error strings, never as panics or raised
//! errors.

use async_trait::async_trait;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::util::{self, http};

use super::Tool;

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// Longest email body rendered before truncation.
const MAX_BODY_CHARS: usize = 10000;

/// Pre-authenticated Gmail API client shared by the Gmail tools.
pub struct GmailClient {
    access_token: String,
}

impl GmailClient {
    pub fn new(access_token: String) -> Self {
        Self { access_token }
    }

    async fn get(&self, path: &str) -> anyhow::Result<Value> {
        debug!(path, "Gmail API GET");
        let response = http::client()
            .get(format!("{GMAIL_API_BASE}/{path}"))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        Self::into_json(response).await
    }

    async fn post(&self, path: &str, body: &Value) -> anyhow::Result<Value> {
        debug!(path, "Gmail API POST");
        let response = http::client()
            .post(format!("{GMAIL_API_BASE}/{path}"))
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await?;
        Self::into_json(response).await
    }

    async fn into_json(response: reqwest::Response) -> anyhow::Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Gmail API returned {status}: {body}");
        }
        Ok(response.json().await?)
    }

    /// Resolve a label name (exactly as Gmail reports it) to its ID.
    async fn label_id(&self, name: &str) -> anyhow::Result<Option<String>> {
        let data = self.get("labels").await?;
        let id = data["labels"]
            .as_array()
            .into_iter()
            .flatten()
            .find(|l| l["name"].as_str() == Some(name))
            .and_then(|l| l["id"].as_str())
            .map(|s| s.to_string());
        Ok(id)
    }
}

// ====== JSON -> text reshaping ======

/// Extract a header value from a message payload, case-insensitively.
fn header(payload: &Value, name: &str) -> String {
    payload["headers"]
        .as_array()
        .into_iter()
        .flatten()
        .find(|h| {
            h["name"]
                .as_str()
                .map(|n| n.eq_ignore_ascii_case(name))
                .unwrap_or(false)
        })
        .and_then(|h| h["value"].as_str())
        .unwrap_or("")
        .to_string()
}

fn or_placeholder(value: String, placeholder: &str) -> String {
    if value.is_empty() {
        placeholder.to_string()
    } else {
        value
    }
}

fn decode_base64url(data: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(data.trim_end_matches('=')).ok()?;
    String::from_utf8(bytes).ok()
}

/// Extract the plain-text body from a message payload, walking the MIME
/// parts tree. Prefers text/plain, recurses into nested multiparts.
fn extract_body(payload: &Value) -> String {
    if let Some(decoded) = payload["body"]["data"].as_str().and_then(decode_base64url) {
        return decoded;
    }

    if let Some(parts) = payload["parts"].as_array() {
        for part in parts {
            let mime_type = part["mimeType"].as_str().unwrap_or("");

            if mime_type == "text/plain" {
                if let Some(decoded) = part["body"]["data"].as_str().and_then(decode_base64url) {
                    return decoded;
                }
            }

            if mime_type.starts_with("multipart/") {
                let nested = extract_body(part);
                if !nested.is_empty() {
                    return nested;
                }
            }
        }
    }

    String::new()
}

fn format_labels(data: &Value) -> String {
    let labels: Vec<String> = data["labels"]
        .as_array()
        .into_iter()
        .flatten()
        .map(|l| {
            format!(
                "- {} (ID: {})",
                l["name"].as_str().unwrap_or("?"),
                l["id"].as_str().unwrap_or("?")
            )
        })
        .collect();

    if labels.is_empty() {
        return "No labels found.".to_string();
    }
    format!("Available Labels:\n{}", labels.join("\n"))
}

fn format_summary(index: usize, message: &Value) -> String {
    let payload = &message["payload"];
    format!(
        "{index}. From: {}\n   Subject: {}\n   Date: {}\n   Message ID: {}",
        or_placeholder(header(payload, "From"), "Unknown Sender"),
        or_placeholder(header(payload, "Subject"), "No Subject"),
        or_placeholder(header(payload, "Date"), "No Date"),
        message["id"].as_str().unwrap_or(""),
    )
}

fn format_message(message: &Value) -> String {
    let payload = &message["payload"];
    let body = extract_body(payload);
    let body = if body.is_empty() {
        "No readable content found.".to_string()
    } else {
        util::truncate_string(&body, MAX_BODY_CHARS, "\n... (truncated)")
    };

    format!(
        "Email Details:\nFrom: {}\nSubject: {}\nDate: {}\n\nContent:\n{}",
        or_placeholder(header(payload, "From"), "Unknown Sender"),
        or_placeholder(header(payload, "Subject"), "No Subject"),
        or_placeholder(header(payload, "Date"), "No Date"),
        body,
    )
}

/// Assemble an RFC 2822 plain-text message and base64url-encode it the way
/// the Gmail send endpoint expects. `reply` carries the In-Reply-To and
/// References header values for threaded replies.
fn build_raw_email(to: &str, subject: &str, body: &str, reply: Option<(&str, &str)>) -> String {
    let mut message = String::new();
    message.push_str(&format!("To: {to}\r\n"));
    message.push_str(&format!("Subject: {subject}\r\n"));
    if let Some((in_reply_to, references)) = reply {
        message.push_str(&format!("In-Reply-To: {in_reply_to}\r\n"));
        message.push_str(&format!("References: {references}\r\n"));
    }
    message.push_str("MIME-Version: 1.0\r\n");
    message.push_str("Content-Type: text/plain; charset=\"UTF-8\"\r\n");
    message.push_str("\r\n");
    message.push_str(body);

    URL_SAFE.encode(message.as_bytes())
}

// ====== Tools ======

/// List all available email labels/folders in the Gmail account.
pub struct ListLabelsTool {
    client: Arc<GmailClient>,
}

impl ListLabelsTool {
    pub fn new(client: Arc<GmailClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ListLabelsTool {
    fn name(&self) -> &str {
        "gmail_list_labels"
    }

    fn description(&self) -> &str {
        "List all available email labels/folders in the Gmail account."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _params: HashMap<String, serde_json::Value>) -> String {
        match self.client.get("labels").await {
            Ok(data) => format_labels(&data),
            Err(e) => format!("Error listing labels: {e}"),
        }
    }
}

/// List recent emails, optionally filtered by a label.
pub struct ListRecentTool {
    client: Arc<GmailClient>,
}

impl ListRecentTool {
    pub fn new(client: Arc<GmailClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ListRecentTool {
    fn name(&self) -> &str {
        "gmail_list_recent"
    }

    fn description(&self) -> &str {
        "List recent emails with sender, subject and date, optionally filtered by label name."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "label_name": {"type": "string", "description": "Label to filter by, e.g. 'INBOX'"},
                "max_results": {"type": "integer", "description": "Maximum emails to return (default 10)", "minimum": 1}
            }
        })
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let max_results = params
            .get("max_results")
            .and_then(|v| v.as_u64())
            .unwrap_or(10);
        let label_name = params.get("label_name").and_then(|v| v.as_str());

        let label_id = match label_name {
            Some(name) => match self.client.label_id(name).await {
                Ok(Some(id)) => Some(id),
                Ok(None) => return format!("Label '{name}' not found."),
                Err(e) => return format!("Error listing emails: {e}"),
            },
            None => None,
        };

        let mut path = format!("messages?maxResults={max_results}");
        if let Some(id) = &label_id {
            path.push_str(&format!("&labelIds={}", urlencoding::encode(id)));
        }

        let listing = match self.client.get(&path).await {
            Ok(data) => data,
            Err(e) => return format!("Error listing emails: {e}"),
        };

        let ids: Vec<String> = listing["messages"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|m| m["id"].as_str().map(|s| s.to_string()))
            .collect();

        if ids.is_empty() {
            return "No emails found.".to_string();
        }

        let mut entries = Vec::new();
        for (i, id) in ids.iter().enumerate() {
            let path = format!("messages/{}?format=metadata", urlencoding::encode(id));
            match self.client.get(&path).await {
                Ok(message) => entries.push(format_summary(i + 1, &message)),
                Err(e) => return format!("Error listing emails: {e}"),
            }
        }

        format!("Recent Emails:\n{}", entries.join("\n\n"))
    }
}

/// Retrieve the full content of a specific email.
pub struct ReadEmailTool {
    client: Arc<GmailClient>,
}

impl ReadEmailTool {
    pub fn new(client: Arc<GmailClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ReadEmailTool {
    fn name(&self) -> &str {
        "gmail_read"
    }

    fn description(&self) -> &str {
        "Read the full content of a specific email by message ID."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "message_id": {"type": "string", "description": "ID of the email to retrieve"}
            },
            "required": ["message_id"]
        })
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let message_id = match params.get("message_id").and_then(|v| v.as_str()) {
            Some(id) => id,
            None => return "Error: 'message_id' parameter is required".to_string(),
        };

        let path = format!("messages/{}?format=full", urlencoding::encode(message_id));
        match self.client.get(&path).await {
            Ok(message) => format_message(&message),
            Err(e) => format!("Error reading email: {e}"),
        }
    }
}

/// Send a new email.
pub struct SendEmailTool {
    client: Arc<GmailClient>,
}

impl SendEmailTool {
    pub fn new(client: Arc<GmailClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for SendEmailTool {
    fn name(&self) -> &str {
        "gmail_send"
    }

    fn description(&self) -> &str {
        "Send a plain-text email."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "to": {"type": "string", "description": "Recipient email address"},
                "subject": {"type": "string", "description": "Email subject"},
                "body": {"type": "string", "description": "Email body content"}
            },
            "required": ["to", "subject", "body"]
        })
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let (to, subject, body) = match (
            params.get("to").and_then(|v| v.as_str()),
            params.get("subject").and_then(|v| v.as_str()),
            params.get("body").and_then(|v| v.as_str()),
        ) {
            (Some(to), Some(subject), Some(body)) => (to, subject, body),
            _ => return "Error: 'to', 'subject' and 'body' parameters are required".to_string(),
        };

        let raw = build_raw_email(to, subject, body, None);
        match self.client.post("messages/send", &json!({ "raw": raw })).await {
            Ok(sent) => format!(
                "Email sent successfully! Message ID: {}",
                sent["id"].as_str().unwrap_or("")
            ),
            Err(e) => format!("Error sending email: {e}"),
        }
    }
}

/// Reply within an existing email thread.
pub struct ReplyEmailTool {
    client: Arc<GmailClient>,
}

impl ReplyEmailTool {
    pub fn new(client: Arc<GmailClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ReplyEmailTool {
    fn name(&self) -> &str {
        "gmail_reply"
    }

    fn description(&self) -> &str {
        "Reply to a specific email thread by message ID."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "message_id": {"type": "string", "description": "ID of the message to reply to"},
                "reply_text": {"type": "string", "description": "Content of the reply"}
            },
            "required": ["message_id", "reply_text"]
        })
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let (message_id, reply_text) = match (
            params.get("message_id").and_then(|v| v.as_str()),
            params.get("reply_text").and_then(|v| v.as_str()),
        ) {
            (Some(id), Some(text)) => (id, text),
            _ => return "Error: 'message_id' and 'reply_text' parameters are required".to_string(),
        };

        let path = format!("messages/{}?format=full", urlencoding::encode(message_id));
        let original = match self.client.get(&path).await {
            Ok(message) => message,
            Err(e) => return format!("Error replying to email: {e}"),
        };

        let payload = &original["payload"];
        let to = header(payload, "From");
        let subject = reply_subject(&header(payload, "Subject"));
        let thread_id = original["threadId"].as_str().unwrap_or("");

        let raw = build_raw_email(&to, &subject, reply_text, Some((message_id, message_id)));
        let request = json!({ "raw": raw, "threadId": thread_id });

        match self.client.post("messages/send", &request).await {
            Ok(sent) => format!(
                "Reply sent successfully! Message ID: {}",
                sent["id"].as_str().unwrap_or("")
            ),
            Err(e) => format!("Error replying to email: {e}"),
        }
    }
}

/// Prefix a subject with "Re: " unless it already carries one.
fn reply_subject(subject: &str) -> String {
    if subject.to_lowercase().starts_with("re:") {
        subject.to_string()
    } else if subject.is_empty() {
        "Re: No Subject".to_string()
    } else {
        format!("Re: {subject}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_labels() {
        let data = json!({
            "labels": [
                {"id": "INBOX", "name": "INBOX"},
                {"id": "Label_7", "name": "Receipts"}
            ]
        });
        let out = format_labels(&data);
        assert!(out.starts_with("Available Labels:"));
        assert!(out.contains("- INBOX (ID: INBOX)"));
        assert!(out.contains("- Receipts (ID: Label_7)"));
    }

    #[test]
    fn test_format_labels_empty() {
        assert_eq!(format_labels(&json!({"labels": []})), "No labels found.");
        assert_eq!(format_labels(&json!({})), "No labels found.");
    }

    #[test]
    fn test_header_is_case_insensitive() {
        let payload = json!({
            "headers": [{"name": "SUBJECT", "value": "Quarterly report"}]
        });
        assert_eq!(header(&payload, "Subject"), "Quarterly report");
        assert_eq!(header(&payload, "From"), "");
    }

    #[test]
    fn test_format_summary() {
        let message = json!({
            "id": "m-123",
            "payload": {
                "headers": [
                    {"name": "From", "value": "alice@example.com"},
                    {"name": "Subject", "value": "Lunch?"},
                    {"name": "Date", "value": "Thu, 6 Aug 2026 11:02:00 +0200"}
                ]
            }
        });
        let out = format_summary(1, &message);
        assert!(out.starts_with("1. From: alice@example.com"));
        assert!(out.contains("Subject: Lunch?"));
        assert!(out.contains("Message ID: m-123"));
    }

    #[test]
    fn test_extract_body_simple() {
        let payload = json!({
            "body": {"data": URL_SAFE.encode("Hello there")}
        });
        assert_eq!(extract_body(&payload), "Hello there");
    }

    #[test]
    fn test_extract_body_multipart_prefers_text_plain() {
        let payload = json!({
            "parts": [
                {"mimeType": "text/html", "body": {"data": URL_SAFE.encode("<p>Hi</p>")}},
                {"mimeType": "text/plain", "body": {"data": URL_SAFE.encode("Hi")}}
            ]
        });
        assert_eq!(extract_body(&payload), "Hi");
    }

    #[test]
    fn test_extract_body_nested_multipart() {
        let payload = json!({
            "parts": [{
                "mimeType": "multipart/alternative",
                "parts": [
                    {"mimeType": "text/plain", "body": {"data": URL_SAFE.encode("Nested")}}
                ]
            }]
        });
        assert_eq!(extract_body(&payload), "Nested");
    }

    #[test]
    fn test_extract_body_unreadable() {
        assert_eq!(extract_body(&json!({"body": {}})), "");
    }

    #[test]
    fn test_build_raw_email_roundtrip() {
        let raw = build_raw_email("bob@example.com", "Hello", "Line one\nLine two", None);
        let decoded = String::from_utf8(URL_SAFE.decode(raw).unwrap()).unwrap();
        assert!(decoded.starts_with("To: bob@example.com\r\n"));
        assert!(decoded.contains("Subject: Hello\r\n"));
        assert!(decoded.contains("Content-Type: text/plain"));
        assert!(decoded.ends_with("\r\nLine one\nLine two"));
        assert!(!decoded.contains("In-Reply-To"));
    }

    #[test]
    fn test_build_raw_email_reply_headers() {
        let raw = build_raw_email("bob@example.com", "Re: Hello", "ok", Some(("m-1", "m-1")));
        let decoded = String::from_utf8(URL_SAFE.decode(raw).unwrap()).unwrap();
        assert!(decoded.contains("In-Reply-To: m-1\r\n"));
        assert!(decoded.contains("References: m-1\r\n"));
    }

    #[test]
    fn test_reply_subject() {
        assert_eq!(reply_subject("Hello"), "Re: Hello");
        assert_eq!(reply_subject("Re: Hello"), "Re: Hello");
        assert_eq!(reply_subject("RE: Hello"), "RE: Hello");
        assert_eq!(reply_subject(""), "Re: No Subject");
    }

    #[test]
    fn test_decode_base64url_accepts_padding_variants() {
        assert_eq!(decode_base64url("SGVsbG8=").as_deref(), Some("Hello"));
        assert_eq!(decode_base64url("SGVsbG8").as_deref(), Some("Hello"));
        assert_eq!(decode_base64url("!!!"), None);
    }

    #[tokio::test]
    async fn test_read_tool_requires_message_id() {
        let tool = ReadEmailTool::new(Arc::new(GmailClient::new(String::new())));
        let out = tool.execute(HashMap::new()).await;
        assert_eq!(out, "Error: 'message_id' parameter is required");
    }
}
