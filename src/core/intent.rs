//! Command classification for raw user input
//!
//! Rules are evaluated top to bottom and the first match wins. The order is
//! load-bearing: the email-listing phrases match as substrings anywhere in
//! the input, so they pre-empt the prefix commands below them.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};

/// Phrases that trigger email listing when found anywhere in the input.
const EMAIL_LIST_PHRASES: [&str; 3] = ["list email", "show email", "get email"];

/// The classified command for one line of input. Produced fresh per input,
/// never persisted. A `None` draft marks a structurally malformed payload;
/// the handler answers with a usage string and makes no external call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    EmailList,
    EmailSend(Option<EmailDraft>),
    CalendarAdd(Option<EventDraft>),
    CalendarList,
    Freeform(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailDraft {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Raw calendar fields as typed by the user. The date/time strings are
/// resolved against the configured zone by the handler, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub summary: String,
    pub date: String,
    pub time: String,
    pub location: Option<String>,
    pub description: Option<String>,
}

/// Map one line of input to a [`Command`]. Pure and deterministic; keyword
/// matching is case-insensitive, payload fields keep their original case.
pub fn classify(input: &str) -> Command {
    let lowered = input.to_lowercase();

    if EMAIL_LIST_PHRASES.iter().any(|p| lowered.contains(p)) {
        return Command::EmailList;
    }
    if lowered.starts_with("send email") {
        return Command::EmailSend(parse_email_draft(input));
    }
    if lowered.starts_with("add event") {
        return Command::CalendarAdd(parse_event_draft(input));
    }
    if lowered.starts_with("list events") {
        return Command::CalendarList;
    }
    Command::Freeform(input.to_string())
}

/// `send email|to|subject|body` - exactly four fields.
fn parse_email_draft(input: &str) -> Option<EmailDraft> {
    let parts: Vec<&str> = input.split('|').collect();
    if parts.len() != 4 {
        return None;
    }
    Some(EmailDraft {
        to: parts[1].trim().to_string(),
        subject: parts[2].trim().to_string(),
        body: parts[3].trim().to_string(),
    })
}

/// `add event|summary|date|time[|location[|description]]` - at least four
/// fields; location and description are optional and positional.
fn parse_event_draft(input: &str) -> Option<EventDraft> {
    let parts: Vec<&str> = input.split('|').collect();
    if parts.len() < 4 {
        return None;
    }
    Some(EventDraft {
        summary: parts[1].trim().to_string(),
        date: parts[2].trim().to_string(),
        time: parts[3].trim().to_string(),
        location: parts.get(4).map(|s| s.trim().to_string()),
        description: parts.get(5).map(|s| s.trim().to_string()),
    })
}

/// Combine a `YYYY-MM-DD` date and an optional `HH:MM` time into a timestamp
/// in the given zone. An empty time defaults to 09:00. `None` means the
/// fields did not parse.
pub fn parse_date_time(date: &str, time: &str, tz: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
    let time = if time.trim().is_empty() {
        NaiveTime::from_hms_opt(9, 0, 0)?
    } else {
        NaiveTime::parse_from_str(time.trim(), "%H:%M").ok()?
    };
    date.and_time(time).and_local_timezone(tz).single()
}
