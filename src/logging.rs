// Logging Module - tracing subscriber setup and the console's on-screen event log
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Entries kept by the on-screen event log
pub const EVENT_LOG_CAPACITY: usize = 100;

/// Log level from `LOG_LEVEL` (trace, debug, info, warn, error); info when unset or unknown
pub fn level_from_env() -> Level {
    match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Headless subcommands log to stderr so stdout stays clean for their output
pub fn init_stderr() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level_from_env())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// The terminal UI owns the screen, so logs go to a file instead
pub fn init_file(path: &Path) -> anyhow::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level_from_env())
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Bounded, timestamped log shown in the console's event pane
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: VecDeque<String>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl AsRef<str>) {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let stamp = now
            .format(format_description!("[hour]:[minute]:[second]"))
            .unwrap_or_default();
        self.entries.push_back(format!("{} {}", stamp, message.as_ref()));
        while self.entries.len() > EVENT_LOG_CAPACITY {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The newest `count` entries, oldest first
    pub fn tail(&self, count: usize) -> impl Iterator<Item = &String> {
        self.entries.iter().skip(self.entries.len().saturating_sub(count))
    }
}
