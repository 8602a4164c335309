use chrono::Local;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

use crate::utils::file_logging::{init_file_logger, FileLogger};

/// Maximum number of log entries to keep in memory
const MAX_LOG_ENTRIES: usize = 1000;

/// A log entry with timestamp and message
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: Level, target: &str, message: String) -> Self {
        Self {
            timestamp: Local::now().format("%H:%M:%S.%3f").to_string(),
            level: level.to_string().to_uppercase(),
            target: target.to_string(),
            message,
        }
    }

    /// Format for display in the log panel
    pub fn format_for_display(&self) -> String {
        format!(
            "[{}] {} [{}] {}",
            self.timestamp, self.level, self.target, self.message
        )
    }
}

/// Thread-safe ring buffer for log entries
#[derive(Clone, Default)]
pub struct LogRingBuffer {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
}

impl LogRingBuffer {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_LOG_ENTRIES))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        // A panic while holding the lock leaves the buffer usable
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push(&self, entry: LogEntry) {
        let mut entries = self.lock();
        if entries.len() >= MAX_LOG_ENTRIES {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn get_recent(&self, count: usize) -> Vec<LogEntry> {
        let entries = self.lock();
        entries.iter().rev().take(count).rev().cloned().collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Split a compact formatted line ("LEVEL target: message") into its parts
pub fn parse_compact_line(line: &str) -> Option<(Level, String, String)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (level, rest) = match line.split_once(' ') {
        Some(("TRACE", rest)) => (Level::TRACE, rest),
        Some(("DEBUG", rest)) => (Level::DEBUG, rest),
        Some(("INFO", rest)) => (Level::INFO, rest),
        Some(("WARN", rest)) => (Level::WARN, rest),
        Some(("ERROR", rest)) => (Level::ERROR, rest),
        _ => return Some((Level::INFO, "general".to_string(), line.to_string())),
    };

    let rest = rest.trim_start();
    // Only treat the prefix as a target if it has no spaces
    let (target, message) = match rest.split_once(':') {
        Some((target, message)) if !target.contains(' ') => (target, message.trim()),
        _ => ("general", rest),
    };

    Some((level, target.to_string(), message.to_string()))
}

/// Writer that sends each formatted line to the ring buffer and the log file
#[derive(Clone)]
pub struct DualWriter {
    buffer: LogRingBuffer,
    file_logger: Option<&'static FileLogger>,
}

impl DualWriter {
    pub fn new(buffer: LogRingBuffer, file_logger: Option<&'static FileLogger>) -> Self {
        Self {
            buffer,
            file_logger,
        }
    }
}

impl std::io::Write for DualWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(text) = std::str::from_utf8(buf) {
            for line in text.lines() {
                if let Some((level, target, message)) = parse_compact_line(line) {
                    let entry = LogEntry::new(level, &target, message);
                    if let Some(file_logger) = self.file_logger {
                        file_logger.write_entry(&entry);
                    }
                    self.buffer.push(entry);
                }
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if let Some(file_logger) = self.file_logger {
            file_logger.flush();
        }
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for DualWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Global log buffer accessible throughout the application
static LOG_BUFFER: OnceLock<LogRingBuffer> = OnceLock::new();

/// Get the global log buffer
pub fn get_log_buffer() -> Option<LogRingBuffer> {
    LOG_BUFFER.get().cloned()
}

/// Install the tracing subscriber writing to the ring buffer and a log file.
///
/// Level comes from `RUST_LOG`, defaulting to debug.
pub fn init_tracing() -> LogRingBuffer {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let buffer = LOG_BUFFER.get_or_init(LogRingBuffer::new).clone();
    let writer = DualWriter::new(buffer.clone(), Some(init_file_logger()));

    let fmt_layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .without_time() // LogEntry adds its own timestamp
        .compact();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    // A second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();

    tracing::info!(target: "book_viewer", "Logging initialized");
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_compact_line() {
        let (level, target, message) = parse_compact_line(" INFO fetch: Request #1 ok").unwrap();
        assert_eq!(level, Level::INFO);
        assert_eq!(target, "fetch");
        assert_eq!(message, "Request #1 ok");

        let (level, target, _) = parse_compact_line("WARN not a target: x").unwrap();
        assert_eq!(level, Level::WARN);
        assert_eq!(target, "general");

        let (level, target, message) = parse_compact_line("plain text").unwrap();
        assert_eq!(level, Level::INFO);
        assert_eq!(target, "general");
        assert_eq!(message, "plain text");

        assert!(parse_compact_line("   ").is_none());
    }

    #[test]
    fn test_ring_buffer_is_bounded() {
        let buffer = LogRingBuffer::new();
        for i in 0..(MAX_LOG_ENTRIES + 10) {
            buffer.push(LogEntry::new(Level::DEBUG, "test", format!("entry {}", i)));
        }
        assert_eq!(buffer.len(), MAX_LOG_ENTRIES);

        let recent = buffer.get_recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].message, format!("entry {}", MAX_LOG_ENTRIES + 9));

        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_dual_writer_without_file() {
        let buffer = LogRingBuffer::new();
        let mut writer = DualWriter::new(buffer.clone(), None);
        writer
            .write_all(b"DEBUG query: Query changed\nERROR fetch: boom\n")
            .unwrap();

        let entries = buffer.get_recent(10);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].target, "query");
        assert_eq!(entries[1].level, "ERROR");
    }
}
