use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, Once};
use std::time::{Duration, Instant};

use tracing::Level;

static INIT: Once = Once::new();

/// One message recorded by a traced [`Logger`].
#[derive(Debug, Clone)]
pub struct TraceLine {
    pub elapsed: Duration,
    pub level: Level,
    pub message: String,
}

impl fmt::Display for TraceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.3} s] {}", self.elapsed.as_secs_f64(), self.message)
    }
}

/// Logger handed to every pipeline stage of a run. Messages always go to
/// `tracing`; a traced logger also keeps them, with the time elapsed since
/// the run started, for the diagnostic page.
pub struct Logger {
    prefixes: VecDeque<String>,
    started: Instant,
    trace: Option<Mutex<Vec<TraceLine>>>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    pub fn new() -> Self {
        Self {
            prefixes: VecDeque::new(),
            started: Instant::now(),
            trace: None,
        }
    }

    pub fn traced() -> Self {
        Self {
            trace: Some(Mutex::new(Vec::new())),
            ..Self::new()
        }
    }

    pub fn with_new_prefixes(mut self, prefix: String) -> Self {
        self.prefixes.clear();
        self.prefixes.push_back(prefix);
        self
    }

    pub fn with_prefix(mut self, prefix: String) -> Self {
        self.prefixes.push_back(prefix);
        self
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn is_traced(&self) -> bool {
        self.trace.is_some()
    }

    /// Recorded lines, oldest first. Empty for an untraced logger.
    pub fn trace_lines(&self) -> Vec<TraceLine> {
        self.trace
            .as_ref()
            .map(|lines| lines.lock().map(|l| l.clone()).unwrap_or_default())
            .unwrap_or_default()
    }

    fn prefix(&self) -> String {
        self.prefixes.iter().map(|p| format!("{} ", p)).collect()
    }

    fn record(&self, level: Level, message: &str) {
        if let Some(lines) = &self.trace {
            if let Ok(mut lines) = lines.lock() {
                lines.push(TraceLine {
                    elapsed: self.elapsed(),
                    level,
                    message: message.to_string(),
                });
            }
        }
    }

    pub fn info(&self, message: &str) {
        tracing::info!("{}{}", self.prefix(), message);
        self.record(Level::INFO, message);
    }

    pub fn error(&self, message: &str) {
        tracing::error!("{}{}", self.prefix(), message);
        self.record(Level::ERROR, message);
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!("{}{}", self.prefix(), message);
        self.record(Level::WARN, message);
    }

    pub fn debug(&self, message: &str) {
        tracing::debug!("{}{}", self.prefix(), message);
        self.record(Level::DEBUG, message);
    }
}

pub fn init_logging(level: Level) {
    if !tracing::dispatcher::has_been_set() {
        INIT.call_once(|| {
            tracing_subscriber::fmt().with_max_level(level).init();
        });
    }
}
