//! Google Calendar REST client
//!
//! Events come back with either a `dateTime` or an all-day `date` boundary;
//! both are validated into [`EventTime`] as the response is parsed.

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, SecondsFormat, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{check_status, CalendarEvent, CalendarProvider, EventTime, ProviderError};

pub struct GoogleCalendarClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    timezone: FixedOffset,
}

#[derive(Debug, Serialize)]
struct EventBody<'a> {
    summary: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    start: EventStamp,
    end: EventStamp,
}

/// Wire shape of an event boundary: `dateTime` for timed events, `date`
/// for all-day events.
#[derive(Debug, Serialize, Deserialize)]
struct EventStamp {
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    #[serde(rename = "htmlLink")]
    html_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventsPage {
    #[serde(default)]
    items: Vec<EventItem>,
}

#[derive(Debug, Deserialize)]
struct EventItem {
    #[serde(default)]
    summary: String,
    start: EventStamp,
    end: EventStamp,
    #[serde(default)]
    location: Option<String>,
}

impl GoogleCalendarClient {
    pub fn new(base_url: String, token: Option<String>, timezone: FixedOffset) -> Self {
        Self {
            client: Client::new(),
            base_url,
            token,
            timezone,
        }
    }

    fn token(&self) -> Result<&str, ProviderError> {
        self.token
            .as_deref()
            .ok_or(ProviderError::NotConfigured("calendar token"))
    }

    fn parse_stamp(&self, stamp: &EventStamp) -> Result<EventTime, ProviderError> {
        if let Some(raw) = &stamp.date_time {
            let parsed = DateTime::parse_from_rfc3339(raw).map_err(|e| {
                ProviderError::InvalidResponse(format!("bad event timestamp {raw:?}: {e}"))
            })?;
            return Ok(EventTime::DateTime(parsed.with_timezone(&self.timezone)));
        }
        if let Some(raw) = &stamp.date {
            let parsed = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
                ProviderError::InvalidResponse(format!("bad event date {raw:?}: {e}"))
            })?;
            return Ok(EventTime::AllDay(parsed));
        }
        Err(ProviderError::InvalidResponse(
            "event boundary has neither dateTime nor date".to_string(),
        ))
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendarClient {
    async fn create_event(
        &self,
        summary: &str,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        location: Option<&str>,
        description: Option<&str>,
    ) -> Result<String, ProviderError> {
        let body = EventBody {
            summary,
            location,
            description,
            start: EventStamp {
                date_time: Some(start.to_rfc3339()),
                date: None,
            },
            end: EventStamp {
                date_time: Some(end.to_rfc3339()),
                date: None,
            },
        };

        let response = self
            .client
            .post(format!("{}/calendars/primary/events", self.base_url))
            .bearer_auth(self.token()?)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        let created: CreatedEvent = response.json().await?;
        Ok(created
            .html_link
            .unwrap_or_else(|| "(link unavailable)".to_string()))
    }

    async fn list_upcoming(
        &self,
        max_results: usize,
        days_ahead: i64,
    ) -> Result<Vec<CalendarEvent>, ProviderError> {
        let now = Utc::now();
        let time_min = now.to_rfc3339_opts(SecondsFormat::Secs, true);
        let time_max = (now + Duration::days(days_ahead)).to_rfc3339_opts(SecondsFormat::Secs, true);

        let response = self
            .client
            .get(format!("{}/calendars/primary/events", self.base_url))
            .query(&[
                ("timeMin", time_min),
                ("timeMax", time_max),
                ("maxResults", max_results.to_string()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .bearer_auth(self.token()?)
            .send()
            .await?;
        let response = check_status(response).await?;
        let page: EventsPage = response.json().await?;

        let mut events = Vec::with_capacity(page.items.len());
        for item in &page.items {
            events.push(CalendarEvent {
                summary: item.summary.clone(),
                start: self.parse_stamp(&item.start)?,
                end: self.parse_stamp(&item.end)?,
                location: item.location.clone(),
            });
        }
        Ok(events)
    }
}
