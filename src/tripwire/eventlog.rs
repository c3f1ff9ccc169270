//! DF-015: Append-only JSONL provenance event log.

use crate::core::types::{ProvenanceEvent, TimestampedEvent};
use chrono::Utc;
use std::io::Write;
use std::path::Path;

/// Current UTC time as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn now_iso8601() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Generate a run ID.
pub fn generate_run_id() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64;
    format!("r-{:012x}", nanos & 0xFFFF_FFFF_FFFF)
}

/// Append an event to the log at `path`, creating parent directories.
pub fn append_event(path: &Path, event: ProvenanceEvent) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| format!("cannot create log dir: {}", e))?;
    }

    let te = TimestampedEvent {
        ts: now_iso8601(),
        event,
    };
    let json = serde_json::to_string(&te).map_err(|e| format!("JSON serialize error: {}", e))?;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("cannot open event log {}: {}", path.display(), e))?;

    writeln!(file, "{}", json).map_err(|e| format!("write error: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_df015_now_iso8601() {
        let ts = now_iso8601();
        assert!(ts.starts_with("20"));
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), 20);
        assert_eq!(&ts[10..11], "T");
    }

    #[test]
    fn test_df015_generate_run_id() {
        let id = generate_run_id();
        assert!(id.starts_with("r-"));
        assert_eq!(id.len(), 14);
    }

    #[test]
    fn test_df015_append_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/events.jsonl");
        let event = ProvenanceEvent::RunStarted {
            action: "apply".to_string(),
            run_id: "r-abc".to_string(),
            dropform_version: "0.1.0".to_string(),
        };
        append_event(&path, event).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("run_started"));
        assert!(content.contains("r-abc"));
        assert!(content.contains("\"ts\":"));
    }

    #[test]
    fn test_df015_append_multiple() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        for i in 0..3 {
            let event = ProvenanceEvent::DropletDeleted {
                id: i,
                accepted: true,
            };
            append_event(&path, event).unwrap();
        }
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        let parsed: TimestampedEvent = serde_json::from_str(lines[2]).unwrap();
        assert!(matches!(
            parsed.event,
            ProvenanceEvent::DropletDeleted { id: 2, accepted: true }
        ));
    }

    #[test]
    fn test_df015_append_unwritable() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the log file should be
        let path = dir.path().join("events.jsonl");
        std::fs::create_dir(&path).unwrap();
        let event = ProvenanceEvent::AutomationFinished { success: false };
        assert!(append_event(&path, event).is_err());
    }
}
