//! External service integrations
//!
//! The completion, email, and calendar services are remote collaborators
//! reached through narrow trait contracts. Each trait has a single HTTP
//! implementation here; tests substitute in-memory fakes.

mod calendar;
mod gmail;
mod openai;

pub use calendar::GoogleCalendarClient;
pub use gmail::GmailClient;
pub use openai::OpenAiClient;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider not configured: {0}")]
    NotConfigured(&'static str),

    #[error("request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The service answered with an error status; carries its message.
    #[error("{0}")]
    Api(String),
}

/// Language-model completion service.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        context: &str,
        user_input: &str,
    ) -> Result<String, ProviderError>;
}

/// Mail service: send one message, list recent inbox messages.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), ProviderError>;

    async fn list_recent(&self, max_results: usize) -> Result<Vec<EmailSummary>, ProviderError>;
}

/// Calendar service: create one event, list upcoming events.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Returns a reference link to the created event.
    async fn create_event(
        &self,
        summary: &str,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        location: Option<&str>,
        description: Option<&str>,
    ) -> Result<String, ProviderError>;

    async fn list_upcoming(
        &self,
        max_results: usize,
        days_ahead: i64,
    ) -> Result<Vec<CalendarEvent>, ProviderError>;
}

/// One inbox message as surfaced by the mail service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSummary {
    pub id: String,
    pub subject: String,
    pub sender: String,
    pub date: String,
    pub snippet: String,
}

/// Event boundary: either a concrete timestamp or an all-day date marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    DateTime(DateTime<FixedOffset>),
    AllDay(NaiveDate),
}

/// One upcoming event, validated at the response-parsing boundary.
#[derive(Debug, Clone)]
pub struct CalendarEvent {
    pub summary: String,
    pub start: EventTime,
    pub end: EventTime,
    pub location: Option<String>,
}

/// Turn a non-success HTTP status into a [`ProviderError::Api`] carrying
/// the response body as the service's message.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Api(format!("{status}: {body}")))
}
