use crate::engine::{SyncAction, SyncResult};
use crate::log::LogEntry;
use serde::Serialize;
use std::time::Duration;

/// JSON output mode for machine-readable sync events
/// Uses NDJSON format (newline-delimited JSON)
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent<'a> {
    Result(&'a SyncResult),
    Summary(&'a SyncSummary),
    Log(&'a LogEntry),
    Ids {
        replica: &'a str,
        ids: &'a [String],
    },
    Digest {
        profile_id: &'a str,
        replica: &'a str,
        body_hash: String,
        hash: String,
    },
}

impl SyncEvent<'_> {
    /// Emit this event as JSON to stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }
}

/// Counts per action for a batch of reconciliations
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SyncSummary {
    pub total: usize,
    pub uploaded: usize,
    pub downloaded: usize,
    pub already_synced: usize,
    pub conflicts_resolved: usize,
    pub not_found: usize,
    pub duration_secs: f64,
}

impl SyncSummary {
    pub fn from_results(results: &[SyncResult], duration: Duration) -> Self {
        let mut summary = Self {
            duration_secs: duration.as_secs_f64(),
            ..Default::default()
        };
        for result in results {
            summary.record(result);
        }
        summary
    }

    pub fn record(&mut self, result: &SyncResult) {
        self.total += 1;
        match result.action {
            SyncAction::UploadedToCloud => self.uploaded += 1,
            SyncAction::DownloadedFromCloud => self.downloaded += 1,
            SyncAction::AlreadySynced => self.already_synced += 1,
            SyncAction::ConflictResolved => self.conflicts_resolved += 1,
            SyncAction::ProfileNotFound => self.not_found += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SyncStatus;
    use crate::log::LogLevel;
    use crate::store::Profile;

    fn result(id: &str, action: SyncAction) -> SyncResult {
        SyncResult {
            profile_id: id.to_string(),
            status: SyncStatus::Synced,
            action,
            profile: Some(Profile::new()),
            strategy: None,
        }
    }

    #[test]
    fn test_serialize_result_event() {
        let result = SyncResult {
            strategy: Some("merge".to_string()),
            ..result("hero", SyncAction::ConflictResolved)
        };
        let json = serde_json::to_string(&SyncEvent::Result(&result)).unwrap();

        assert!(json.contains(r#""type":"result""#));
        assert!(json.contains(r#""profile_id":"hero""#));
        assert!(json.contains(r#""action":"conflict_resolved""#));
        assert!(json.contains(r#""strategy":"merge""#));
    }

    #[test]
    fn test_serialize_log_event() {
        let entry = LogEntry {
            timestamp: "2024-01-01T00:00:00.000000".to_string(),
            level: LogLevel::Info,
            message: "Synced 2 profiles".to_string(),
        };
        let json = serde_json::to_string(&SyncEvent::Log(&entry)).unwrap();

        assert!(json.contains(r#""type":"log""#));
        assert!(json.contains(r#""level":"info""#));
    }

    #[test]
    fn test_serialize_ids_event() {
        let ids = vec!["a".to_string(), "b".to_string()];
        let event = SyncEvent::Ids {
            replica: "local",
            ids: &ids,
        };
        let json = serde_json::to_string(&event).unwrap();

        assert_eq!(json, r#"{"type":"ids","replica":"local","ids":["a","b"]}"#);
    }

    #[test]
    fn test_summary_counts() {
        let results = vec![
            result("a", SyncAction::UploadedToCloud),
            result("b", SyncAction::UploadedToCloud),
            result("c", SyncAction::DownloadedFromCloud),
            result("d", SyncAction::AlreadySynced),
            result("e", SyncAction::ConflictResolved),
        ];

        let summary = SyncSummary::from_results(&results, Duration::from_millis(1500));
        assert_eq!(summary.total, 5);
        assert_eq!(summary.uploaded, 2);
        assert_eq!(summary.downloaded, 1);
        assert_eq!(summary.already_synced, 1);
        assert_eq!(summary.conflicts_resolved, 1);
        assert_eq!(summary.not_found, 0);
        assert_eq!(summary.duration_secs, 1.5);

        let json = serde_json::to_string(&SyncEvent::Summary(&summary)).unwrap();
        assert!(json.contains(r#""type":"summary""#));
        assert!(json.contains(r#""uploaded":2"#));
    }
}
