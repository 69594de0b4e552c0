//! Gmail REST client
//!
//! Sending posts an RFC 2822 message base64url-encoded in the `raw` field.
//! Listing is two-step: fetch recent inbox message ids, then per-message
//! metadata (From/Subject/Date headers plus the snippet).

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{check_status, EmailProvider, EmailSummary, ProviderError};

pub struct GmailClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendRequest {
    raw: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessageDetail {
    id: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    payload: MessagePayload,
}

#[derive(Debug, Default, Deserialize)]
struct MessagePayload {
    #[serde(default)]
    headers: Vec<MessageHeader>,
}

#[derive(Debug, Deserialize)]
struct MessageHeader {
    name: String,
    value: String,
}

impl GmailClient {
    pub fn new(base_url: String, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            token,
        }
    }

    fn token(&self) -> Result<&str, ProviderError> {
        self.token
            .as_deref()
            .ok_or(ProviderError::NotConfigured("gmail token"))
    }

    async fn fetch_message(&self, id: &str) -> Result<EmailSummary, ProviderError> {
        let response = self
            .client
            .get(format!(
                "{}/gmail/v1/users/me/messages/{id}",
                self.base_url
            ))
            .query(&[("format", "metadata")])
            .bearer_auth(self.token()?)
            .send()
            .await?;
        let response = check_status(response).await?;
        let detail: MessageDetail = response.json().await?;

        let header = |name: &str| {
            detail
                .payload
                .headers
                .iter()
                .find(|h| h.name.eq_ignore_ascii_case(name))
                .map(|h| h.value.clone())
        };

        Ok(EmailSummary {
            subject: header("Subject").unwrap_or_else(|| "No Subject".to_string()),
            sender: header("From").unwrap_or_else(|| "Unknown".to_string()),
            date: header("Date").unwrap_or_else(|| "No Date".to_string()),
            snippet: detail.snippet,
            id: detail.id,
        })
    }
}

#[async_trait]
impl EmailProvider for GmailClient {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), ProviderError> {
        let message = format!("To: {to}\r\nSubject: {subject}\r\n\r\n{body}");
        let request = SendRequest {
            raw: URL_SAFE.encode(message.as_bytes()),
        };

        let response = self
            .client
            .post(format!("{}/gmail/v1/users/me/messages/send", self.base_url))
            .bearer_auth(self.token()?)
            .json(&request)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn list_recent(&self, max_results: usize) -> Result<Vec<EmailSummary>, ProviderError> {
        let response = self
            .client
            .get(format!("{}/gmail/v1/users/me/messages", self.base_url))
            .query(&[
                ("labelIds", "INBOX".to_string()),
                ("maxResults", max_results.to_string()),
            ])
            .bearer_auth(self.token()?)
            .send()
            .await?;
        let response = check_status(response).await?;
        let list: MessageList = response.json().await?;

        let mut emails = Vec::with_capacity(list.messages.len());
        for message in &list.messages {
            emails.push(self.fetch_message(&message.id).await?);
        }
        Ok(emails)
    }
}
