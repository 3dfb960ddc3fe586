//! Workout journal.
//!
//! Finished and canceled attempts are appended to a JSONL (JSON Lines) file
//! with file locking so several processes can share one journal. Map
//! progress itself is never written here.

use crate::{FeedbackLevel, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// How an attempt ended
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    Completed,
    Canceled,
}

/// One journaled workout attempt
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: Uuid,
    pub node_id: String,
    pub exercise_id: String,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: DateTime<Utc>,
    pub outcome: SessionOutcome,
    pub feedback: Option<FeedbackLevel>,
    pub xp_awarded: u32,
    pub stars: u8,
}

/// Session sink trait for persisting attempts
pub trait SessionSink {
    fn append(&mut self, record: &SessionRecord) -> Result<()>;
}

/// JSONL-based session sink with file locking
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl SessionSink for JsonlSink {
    fn append(&mut self, record: &SessionRecord) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(record)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!("Journaled session {} ({:?})", record.session_id, record.outcome);
        Ok(())
    }
}

/// Read all records from a journal file
///
/// Malformed lines are skipped with a warning.
pub fn read_records(path: &Path) -> Result<Vec<SessionRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut records = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<SessionRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!("Failed to parse journal line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} journal records", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(outcome: SessionOutcome) -> SessionRecord {
        SessionRecord {
            session_id: Uuid::new_v4(),
            node_id: "squat_basics".into(),
            exercise_id: "air_squat".into(),
            started_at: Some(Utc::now()),
            ended_at: Utc::now(),
            outcome,
            feedback: Some(FeedbackLevel::Normal),
            xp_awarded: 10,
            stars: 2,
        }
    }

    #[test]
    fn test_append_and_read_single_record() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("journal").join("sessions.jsonl");

        let rec = record(SessionOutcome::Completed);
        let id = rec.session_id;

        let mut sink = JsonlSink::new(&path);
        sink.append(&rec).unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].session_id, id);
        assert_eq!(records[0].feedback, Some(FeedbackLevel::Normal));
    }

    #[test]
    fn test_append_multiple_records() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("sessions.jsonl");

        let mut sink = JsonlSink::new(&path);
        for _ in 0..3 {
            sink.append(&record(SessionOutcome::Completed)).unwrap();
        }
        sink.append(&record(SessionOutcome::Canceled)).unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[3].outcome, SessionOutcome::Canceled);
    }

    #[test]
    fn test_read_missing_journal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let records = read_records(&temp_dir.path().join("nope.jsonl")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("sessions.jsonl");

        let mut sink = JsonlSink::new(&path);
        sink.append(&record(SessionOutcome::Completed)).unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{ not json").unwrap();
        drop(file);

        sink.append(&record(SessionOutcome::Completed)).unwrap();

        assert_eq!(read_records(&path).unwrap().len(), 2);
    }
}
