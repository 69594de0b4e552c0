//! Application configuration
//!
//! All tunables live in one explicit [`Config`] value built at startup and
//! passed into each component at construction; nothing reads ambient
//! globals afterwards. Values resolve as environment > TOML file > default.

pub mod prompts;

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use chrono::FixedOffset;
use serde::Deserialize;

/// Conversation log capacity in turns.
pub const MAX_TURNS: usize = 10;

/// Fallback zone when none is configured (US Eastern standard time).
const DEFAULT_TIMEZONE: &str = "-05:00";

#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the persisted conversation log.
    pub memory_file: PathBuf,
    /// Conversation log capacity in turns.
    pub max_turns: usize,
    /// Fixed zone for calendar timestamps; never inferred from the system.
    pub timezone: FixedOffset,
    pub email_max_results: usize,
    pub event_max_results: usize,
    pub event_days_ahead: i64,
    pub system_prompt: String,
    pub model: String,
    pub openai_api_base: String,
    pub openai_api_key: Option<String>,
    pub gmail_api_base: String,
    pub gmail_token: Option<String>,
    pub calendar_api_base: String,
    pub calendar_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            memory_file: PathBuf::from("data/chat.json"),
            max_turns: MAX_TURNS,
            timezone: parse_timezone(DEFAULT_TIMEZONE).expect("default timezone is valid"),
            email_max_results: 10,
            event_max_results: 10,
            event_days_ahead: 7,
            system_prompt: prompts::DEFAULT.to_string(),
            model: "gpt-4".to_string(),
            openai_api_base: "https://api.openai.com".to_string(),
            openai_api_key: None,
            gmail_api_base: "https://gmail.googleapis.com".to_string(),
            gmail_token: None,
            calendar_api_base: "https://www.googleapis.com/calendar/v3".to_string(),
            calendar_token: None,
        }
    }
}

/// TOML overlay file, all sections optional.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    memory: MemorySection,
    #[serde(default)]
    assistant: AssistantSection,
    #[serde(default)]
    email: ServiceSection,
    #[serde(default)]
    calendar: CalendarSection,
}

#[derive(Debug, Default, Deserialize)]
struct MemorySection {
    file: Option<PathBuf>,
    max_turns: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct AssistantSection {
    model: Option<String>,
    api_base: Option<String>,
    system_prompt: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServiceSection {
    api_base: Option<String>,
    max_results: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct CalendarSection {
    api_base: Option<String>,
    max_results: Option<usize>,
    days_ahead: Option<i64>,
    timezone: Option<String>,
}

impl Config {
    /// Build the configuration from defaults, an optional TOML file
    /// (`ATTACHE_CONFIG`, default `attache.toml`), and the environment.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Config::default();

        let path = env::var("ATTACHE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("attache.toml"));
        if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            let file: FileConfig = toml::from_str(&raw)
                .with_context(|| format!("invalid config file {}", path.display()))?;
            config.apply_file(file)?;
        }

        config.apply_env()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) -> anyhow::Result<()> {
        if let Some(path) = file.memory.file {
            self.memory_file = path;
        }
        if let Some(max_turns) = file.memory.max_turns {
            self.max_turns = max_turns;
        }
        if let Some(model) = file.assistant.model {
            self.model = model;
        }
        if let Some(api_base) = file.assistant.api_base {
            self.openai_api_base = api_base;
        }
        if let Some(prompt) = file.assistant.system_prompt {
            self.system_prompt = prompt;
        }
        if let Some(api_base) = file.email.api_base {
            self.gmail_api_base = api_base;
        }
        if let Some(max_results) = file.email.max_results {
            self.email_max_results = max_results;
        }
        if let Some(api_base) = file.calendar.api_base {
            self.calendar_api_base = api_base;
        }
        if let Some(max_results) = file.calendar.max_results {
            self.event_max_results = max_results;
        }
        if let Some(days_ahead) = file.calendar.days_ahead {
            self.event_days_ahead = days_ahead;
        }
        if let Some(zone) = file.calendar.timezone {
            self.timezone = parse_timezone(&zone)
                .with_context(|| format!("invalid calendar.timezone {zone:?}"))?;
        }
        Ok(())
    }

    fn apply_env(&mut self) -> anyhow::Result<()> {
        if let Ok(path) = env::var("ATTACHE_MEMORY_FILE") {
            self.memory_file = PathBuf::from(path);
        }
        if let Ok(raw) = env::var("ATTACHE_MAX_TURNS") {
            self.max_turns = raw
                .parse()
                .with_context(|| format!("invalid ATTACHE_MAX_TURNS {raw:?}"))?;
        }
        if let Ok(zone) = env::var("ATTACHE_TIMEZONE") {
            self.timezone = parse_timezone(&zone)
                .with_context(|| format!("invalid ATTACHE_TIMEZONE {zone:?}"))?;
        }
        if let Ok(model) = env::var("ATTACHE_MODEL") {
            self.model = model;
        }
        if let Ok(api_base) = env::var("OPENAI_API_BASE") {
            self.openai_api_base = api_base;
        }
        if let Ok(key) = env::var("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Ok(token) = env::var("GMAIL_TOKEN") {
            self.gmail_token = Some(token);
        }
        if let Ok(token) = env::var("CALENDAR_TOKEN") {
            self.calendar_token = Some(token);
        }
        Ok(())
    }
}

/// Parse a `+HH:MM`/`-HH:MM` UTC offset.
fn parse_timezone(raw: &str) -> anyhow::Result<FixedOffset> {
    Ok(raw.parse::<FixedOffset>()?)
}
