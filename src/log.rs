// Engine operation log
//
// Bounded, append-only record of what the engine did, returned to callers by
// `SyncEngine::get_log`. Separate from `tracing` output, although every entry
// is mirrored there.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

/// Entries kept when no capacity is configured
pub const DEFAULT_LOG_CAPACITY: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Success => "success",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
}

/// Ring buffer of the most recent log entries
#[derive(Debug)]
pub struct SyncLog {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
}

impl SyncLog {
    /// Create a log that keeps at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Append an entry, evicting the oldest once full
    pub fn record(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Error => tracing::error!("{}", message),
            LogLevel::Info | LogLevel::Success => tracing::info!("{}", message),
        }

        let entry = LogEntry {
            timestamp: crate::timestamp(),
            level,
            message,
        };

        let mut entries = self.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.record(LogLevel::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.record(LogLevel::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.record(LogLevel::Error, message);
    }

    /// The most recent `limit` entries, oldest first
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        let entries = self.lock();
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<LogEntry>> {
        // Entries are pushed and popped whole, so a poisoned lock is still consistent
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for SyncLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_recent_is_oldest_first() {
        let log = SyncLog::default();
        log.info("one");
        log.success("two");
        log.error("three");

        let recent = log.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "two");
        assert_eq!(recent[0].level, LogLevel::Success);
        assert_eq!(recent[1].message, "three");
        assert_eq!(recent[1].level, LogLevel::Error);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let log = SyncLog::default();
        for i in 0..150 {
            log.info(format!("entry {}", i));
        }

        let all = log.recent(1000);
        assert_eq!(all.len(), 100);
        assert_eq!(all.first().unwrap().message, "entry 50");
        assert_eq!(all.last().unwrap().message, "entry 149");
    }

    #[test]
    fn test_zero_limit_and_zero_capacity() {
        let log = SyncLog::new(0);
        assert_eq!(log.capacity(), 1);

        log.info("a");
        log.info("b");
        assert_eq!(log.len(), 1);
        assert_eq!(log.recent(5)[0].message, "b");
        assert!(log.recent(0).is_empty());
    }

    #[test]
    fn test_concurrent_appends_respect_capacity() {
        let log = Arc::new(SyncLog::new(64));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        log.info(format!("{}-{}", t, i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(log.len(), 64);
    }

    #[test]
    fn test_entry_serializes_lowercase_level() {
        let entry = LogEntry {
            timestamp: "2024-01-01T00:00:00.000000".to_string(),
            level: LogLevel::Success,
            message: "Saved local profile hero".to_string(),
        };

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains(r#""level":"success""#));
        assert!(json.contains(r#""message":"Saved local profile hero""#));
    }
}
