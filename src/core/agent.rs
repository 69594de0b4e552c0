//! Command dispatch
//!
//! The Agent is the decision core: it classifies each input, routes it to
//! exactly one collaborator call, and converts every failure into a
//! printable result, so the loop never sees an error. Every interaction,
//! including usage and integration errors, is recorded to memory.

use std::sync::Arc;

use chrono::Duration;
use tracing::error;

use crate::config::Config;
use crate::core::intent::{self, Command, EmailDraft, EventDraft};
use crate::core::memory::MemoryStore;
use crate::providers::{
    CalendarEvent, CalendarProvider, CompletionProvider, EmailProvider, EventTime, ProviderError,
};

pub const EMAIL_USAGE: &str = "Please use format: send email|to@example.com|Subject|Message";
pub const EVENT_USAGE: &str =
    "Please use format: add event|Summary|YYYY-MM-DD|HH:MM|[location]|[description]";

pub struct Agent {
    config: Config,
    memory: MemoryStore,
    completion: Arc<dyn CompletionProvider>,
    email: Arc<dyn EmailProvider>,
    calendar: Arc<dyn CalendarProvider>,
}

impl Agent {
    pub fn new(
        config: Config,
        memory: MemoryStore,
        completion: Arc<dyn CompletionProvider>,
        email: Arc<dyn EmailProvider>,
        calendar: Arc<dyn CalendarProvider>,
    ) -> Self {
        Self {
            config,
            memory,
            completion,
            email,
            calendar,
        }
    }

    /// Process one line of input to completion: fetch context, classify and
    /// dispatch, then record the interaction. The reply is always printable;
    /// a failed append is logged and the loop keeps going.
    pub async fn handle_input(&self, input: &str) -> String {
        let context = self.memory.retrieve_context();
        let reply = self.respond(input, &context).await;
        if let Err(e) = self.memory.append_turn(input, &reply) {
            error!(error = %e, "failed to persist conversation turn");
        }
        reply
    }

    /// Classify and dispatch without touching memory. Failures from
    /// collaborators are rendered uniformly and logged here.
    pub async fn respond(&self, input: &str, context: &str) -> String {
        match intent::classify(input) {
            Command::EmailList => self
                .list_emails()
                .await
                .unwrap_or_else(|e| fail("list emails", e)),
            Command::EmailSend(draft) => self
                .send_email(draft)
                .await
                .unwrap_or_else(|e| fail("send email", e)),
            Command::CalendarAdd(draft) => self
                .add_event(draft)
                .await
                .unwrap_or_else(|e| fail("add event", e)),
            Command::CalendarList => self
                .list_events()
                .await
                .unwrap_or_else(|e| fail("list events", e)),
            Command::Freeform(text) => self
                .completion
                .complete(&self.config.system_prompt, context, &text)
                .await
                .unwrap_or_else(|e| fail("generate a response", e)),
        }
    }

    async fn list_emails(&self) -> Result<String, ProviderError> {
        let emails = self.email.list_recent(self.config.email_max_results).await?;
        if emails.is_empty() {
            return Ok("No emails found.".to_string());
        }

        let mut out = String::from("Here are your recent emails:");
        for (idx, email) in emails.iter().enumerate() {
            out.push_str(&format!(
                "\n\n{}. From: {}\n   Subject: {}\n   Date: {}\n   Preview: {}",
                idx + 1,
                email.sender,
                email.subject,
                email.date,
                email.snippet
            ));
        }
        Ok(out)
    }

    async fn send_email(&self, draft: Option<EmailDraft>) -> Result<String, ProviderError> {
        let Some(draft) = draft else {
            return Ok(EMAIL_USAGE.to_string());
        };
        self.email.send(&draft.to, &draft.subject, &draft.body).await?;
        Ok("Email sent successfully!".to_string())
    }

    async fn add_event(&self, draft: Option<EventDraft>) -> Result<String, ProviderError> {
        let Some(draft) = draft else {
            return Ok(EVENT_USAGE.to_string());
        };
        let Some(start) = intent::parse_date_time(&draft.date, &draft.time, self.config.timezone)
        else {
            return Ok(EVENT_USAGE.to_string());
        };

        // Events default to an hour long.
        let end = start + Duration::hours(1);
        let link = self
            .calendar
            .create_event(
                &draft.summary,
                start,
                end,
                draft.location.as_deref(),
                draft.description.as_deref(),
            )
            .await?;
        Ok(format!("Event created: {link}"))
    }

    async fn list_events(&self) -> Result<String, ProviderError> {
        let events = self
            .calendar
            .list_upcoming(self.config.event_max_results, self.config.event_days_ahead)
            .await?;
        if events.is_empty() {
            return Ok("No upcoming events found.".to_string());
        }

        let mut out = String::from("Here are your upcoming events:");
        for (idx, event) in events.iter().enumerate() {
            out.push_str(&format!(
                "\n{}. {} - {}",
                idx + 1,
                event.summary,
                format_event_time(event)
            ));
            if let Some(location) = &event.location {
                out.push_str(&format!("\n   Location: {location}"));
            }
        }
        Ok(out)
    }
}

/// Display an event's time range: a full datetime range for timed events,
/// `All day on DATE` for all-day events.
pub fn format_event_time(event: &CalendarEvent) -> String {
    match (&event.start, &event.end) {
        (EventTime::DateTime(start), EventTime::DateTime(end)) => format!(
            "{} to {}",
            start.format("%Y-%m-%d %I:%M %p"),
            end.format("%I:%M %p")
        ),
        (EventTime::AllDay(date), _) => format!("All day on {date}"),
        (EventTime::DateTime(start), EventTime::AllDay(_)) => {
            start.format("%Y-%m-%d %I:%M %p").to_string()
        }
    }
}

fn fail(action: &str, err: ProviderError) -> String {
    error!(action, error = %err, "collaborator call failed");
    format!("Failed to {action}: {err}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, FixedOffset, NaiveDate};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::tempdir;

    use crate::providers::EmailSummary;

    #[derive(Default)]
    struct StubCompletion {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionProvider for StubCompletion {
        async fn complete(
            &self,
            _system_prompt: &str,
            context: &str,
            user_input: &str,
        ) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("echo({user_input}) with context [{context}]"))
        }
    }

    #[derive(Default)]
    struct StubEmail {
        sends: AtomicUsize,
        lists: AtomicUsize,
        inbox: Vec<EmailSummary>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl EmailProvider for StubEmail {
        async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), ProviderError> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            match &self.fail_with {
                Some(msg) => Err(ProviderError::Api(msg.clone())),
                None => Ok(()),
            }
        }

        async fn list_recent(&self, _max_results: usize) -> Result<Vec<EmailSummary>, ProviderError> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            match &self.fail_with {
                Some(msg) => Err(ProviderError::Api(msg.clone())),
                None => Ok(self.inbox.clone()),
            }
        }
    }

    #[derive(Default)]
    struct StubCalendar {
        creates: AtomicUsize,
        created: Mutex<Vec<(String, String, String)>>,
        upcoming: Vec<CalendarEvent>,
    }

    #[async_trait]
    impl CalendarProvider for StubCalendar {
        async fn create_event(
            &self,
            summary: &str,
            start: DateTime<FixedOffset>,
            end: DateTime<FixedOffset>,
            _location: Option<&str>,
            _description: Option<&str>,
        ) -> Result<String, ProviderError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            self.created.lock().unwrap().push((
                summary.to_string(),
                start.to_rfc3339(),
                end.to_rfc3339(),
            ));
            Ok("https://calendar.example/event/1".to_string())
        }

        async fn list_upcoming(
            &self,
            _max_results: usize,
            _days_ahead: i64,
        ) -> Result<Vec<CalendarEvent>, ProviderError> {
            Ok(self.upcoming.clone())
        }
    }

    struct Fixture {
        agent: Agent,
        completion: Arc<StubCompletion>,
        email: Arc<StubEmail>,
        calendar: Arc<StubCalendar>,
        _dir: tempfile::TempDir,
    }

    fn fixture_with(email: StubEmail, calendar: StubCalendar) -> Fixture {
        let dir = tempdir().unwrap();
        let config = Config {
            memory_file: dir.path().join("chat.json"),
            ..Config::default()
        };
        let memory = MemoryStore::new(&config.memory_file, config.max_turns);
        let completion = Arc::new(StubCompletion::default());
        let email = Arc::new(email);
        let calendar = Arc::new(calendar);
        let agent = Agent::new(
            config,
            memory,
            completion.clone(),
            email.clone(),
            calendar.clone(),
        );
        Fixture {
            agent,
            completion,
            email,
            calendar,
            _dir: dir,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(StubEmail::default(), StubCalendar::default())
    }

    fn summary(subject: &str) -> EmailSummary {
        EmailSummary {
            id: "m1".to_string(),
            subject: subject.to_string(),
            sender: "Ann <ann@example.com>".to_string(),
            date: "Mon, 10 Mar 2025 09:00:00 -0500".to_string(),
            snippet: "short preview".to_string(),
        }
    }

    #[tokio::test]
    async fn malformed_send_email_returns_usage_without_calling_out() {
        let fx = fixture();

        let reply = fx.agent.respond("send email|a@b.com|Hi", "").await;

        assert_eq!(reply, EMAIL_USAGE);
        assert_eq!(fx.email.sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_interaction_is_still_recorded() {
        let fx = fixture();

        let reply = fx.agent.handle_input("send email|a@b.com|Hi").await;

        assert_eq!(reply, EMAIL_USAGE);
        let context = fx.agent.memory.retrieve_context();
        let lines: Vec<&str> = context.lines().collect();
        assert_eq!(lines[0], "user: send email|a@b.com|Hi");
        assert_eq!(lines[1], format!("assistant: {EMAIL_USAGE}"));
    }

    #[tokio::test]
    async fn well_formed_send_email_reports_success() {
        let fx = fixture();

        let reply = fx
            .agent
            .respond("send email|a@b.com|Hi|See you soon", "")
            .await;

        assert_eq!(reply, "Email sent successfully!");
        assert_eq!(fx.email.sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn email_send_failure_is_rendered_not_propagated() {
        let fx = fixture_with(
            StubEmail {
                fail_with: Some("quota exceeded".to_string()),
                ..StubEmail::default()
            },
            StubCalendar::default(),
        );

        let reply = fx.agent.respond("send email|a@b.com|Hi|text", "").await;

        assert_eq!(reply, "Failed to send email: quota exceeded");
    }

    #[tokio::test]
    async fn empty_inbox_is_a_distinct_outcome() {
        let fx = fixture();

        let reply = fx.agent.respond("list emails", "").await;

        assert_eq!(reply, "No emails found.");
        assert_eq!(fx.email.lists.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn email_listing_formats_every_field() {
        let fx = fixture_with(
            StubEmail {
                inbox: vec![summary("Quarterly Report")],
                ..StubEmail::default()
            },
            StubCalendar::default(),
        );

        let reply = fx.agent.respond("show email", "").await;

        assert!(reply.starts_with("Here are your recent emails:"));
        assert!(reply.contains("1. From: Ann <ann@example.com>"));
        assert!(reply.contains("Subject: Quarterly Report"));
        assert!(reply.contains("Preview: short preview"));
    }

    #[tokio::test]
    async fn malformed_add_event_returns_usage_without_calling_out() {
        let fx = fixture();

        let reply = fx.agent.respond("add event|Standup|2025-03-10", "").await;

        assert_eq!(reply, EVENT_USAGE);
        assert_eq!(fx.calendar.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unparseable_event_date_returns_usage_without_calling_out() {
        let fx = fixture();

        let reply = fx
            .agent
            .respond("add event|Standup|next tuesday|09:30", "")
            .await;

        assert_eq!(reply, EVENT_USAGE);
        assert_eq!(fx.calendar.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn well_formed_add_event_defaults_to_an_hour() {
        let fx = fixture();

        let reply = fx
            .agent
            .respond("add event|Standup|2025-03-10|09:30", "")
            .await;

        assert_eq!(reply, "Event created: https://calendar.example/event/1");
        let created = fx.calendar.created.lock().unwrap();
        let (summary, start, end) = &created[0];
        assert_eq!(summary, "Standup");
        assert_eq!(start, "2025-03-10T09:30:00-05:00");
        assert_eq!(end, "2025-03-10T10:30:00-05:00");
    }

    #[tokio::test]
    async fn empty_calendar_is_a_distinct_outcome() {
        let fx = fixture();

        let reply = fx.agent.respond("list events", "").await;

        assert_eq!(reply, "No upcoming events found.");
    }

    #[tokio::test]
    async fn event_listing_shows_times_and_location() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let start = DateTime::parse_from_rfc3339("2025-03-10T09:30:00-05:00").unwrap();
        let end = start + Duration::hours(1);
        let fx = fixture_with(
            StubEmail::default(),
            StubCalendar {
                upcoming: vec![
                    CalendarEvent {
                        summary: "Standup".to_string(),
                        start: EventTime::DateTime(start.with_timezone(&tz)),
                        end: EventTime::DateTime(end.with_timezone(&tz)),
                        location: Some("Room 4".to_string()),
                    },
                    CalendarEvent {
                        summary: "Offsite".to_string(),
                        start: EventTime::AllDay(
                            NaiveDate::from_ymd_opt(2025, 3, 12).unwrap(),
                        ),
                        end: EventTime::AllDay(NaiveDate::from_ymd_opt(2025, 3, 13).unwrap()),
                        location: None,
                    },
                ],
                ..StubCalendar::default()
            },
        );

        let reply = fx.agent.respond("list events", "").await;

        assert!(reply.contains("1. Standup - 2025-03-10 09:30 AM to 10:30 AM"));
        assert!(reply.contains("   Location: Room 4"));
        assert!(reply.contains("2. Offsite - All day on 2025-03-12"));
    }

    #[tokio::test]
    async fn freeform_input_goes_to_the_completion_provider_with_context() {
        let fx = fixture();

        fx.agent.handle_input("remember the budget is 40k").await;
        let reply = fx.agent.handle_input("what is the budget?").await;

        assert_eq!(fx.completion.calls.load(Ordering::SeqCst), 2);
        assert!(reply.starts_with("echo(what is the budget?)"));
        assert!(reply.contains("user: remember the budget is 40k"));
    }

    #[test]
    fn mixed_event_boundaries_fall_back_to_the_start_time() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let start = DateTime::parse_from_rfc3339("2025-03-10T09:30:00-05:00").unwrap();
        let event = CalendarEvent {
            summary: "Odd".to_string(),
            start: EventTime::DateTime(start.with_timezone(&tz)),
            end: EventTime::AllDay(NaiveDate::from_ymd_opt(2025, 3, 11).unwrap()),
            location: None,
        };
        assert_eq!(format_event_time(&event), "2025-03-10 09:30 AM");
    }
}
