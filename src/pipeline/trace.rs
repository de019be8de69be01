// Pipeline progress tracing
// Append-only JSONL log of a picking run, one line per stage update

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Pipeline stages that report progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Windowing,
    Inference,
    Aggregation,
    Extraction,
}

/// A single line of the trace file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// RFC 3339 time the entry was created
    pub timestamp: String,

    /// Run this entry belongs to
    pub run_id: Uuid,

    pub stage: Stage,

    /// Stage progress [0.0, 1.0]
    pub progress: f32,

    pub message: String,

    /// Optional structured payload (window counts, event counts, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl TraceEntry {
    pub fn new(run_id: Uuid, stage: Stage, progress: f32, message: String) -> Self {
        TraceEntry {
            timestamp: Utc::now().to_rfc3339(),
            run_id,
            stage,
            progress: progress.clamp(0.0, 1.0),
            message,
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Serialize to one JSON line, newline included
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

/// Appends trace entries to a JSONL file, creating it on first write
pub struct TraceWriter {
    file_path: PathBuf,
}

impl TraceWriter {
    pub fn new(file_path: PathBuf) -> Self {
        TraceWriter { file_path }
    }

    pub fn write(&self, entry: &TraceEntry) -> Result<(), TraceError> {
        self.write_batch(std::slice::from_ref(entry))
    }

    pub fn write_batch(&self, entries: &[TraceEntry]) -> Result<(), TraceError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;

        for entry in entries {
            file.write_all(entry.to_json_line()?.as_bytes())?;
        }

        file.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

/// Builds entries for one run and stage
pub struct TraceBuilder {
    run_id: Uuid,
    stage: Stage,
}

impl TraceBuilder {
    pub fn new(run_id: Uuid, stage: Stage) -> Self {
        TraceBuilder { run_id, stage }
    }

    pub fn start(&self, message: impl Into<String>) -> TraceEntry {
        self.progress(0.0, message)
    }

    pub fn progress(&self, progress: f32, message: impl Into<String>) -> TraceEntry {
        TraceEntry::new(self.run_id, self.stage, progress, message.into())
    }

    pub fn complete(&self, message: impl Into<String>) -> TraceEntry {
        self.progress(1.0, message)
    }
}

/// Write an entry if tracing is enabled; failures are logged, never fatal
pub fn emit(writer: Option<&TraceWriter>, entry: impl FnOnce() -> TraceEntry) {
    if let Some(writer) = writer {
        if let Err(e) = writer.write(&entry()) {
            log::warn!("Failed to write trace to {}: {}", writer.path().display(), e);
        }
    }
}

/// Read all entries back from a JSONL trace file
pub fn read_trace_file(path: &Path) -> Result<Vec<TraceEntry>, TraceError> {
    let contents = std::fs::read_to_string(path)?;
    let mut entries = Vec::new();

    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        entries.push(serde_json::from_str(line)?);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_progress_clamping() {
        let low = TraceEntry::new(Uuid::nil(), Stage::Inference, -0.5, "low".to_string());
        assert_eq!(low.progress, 0.0);

        let high = TraceEntry::new(Uuid::nil(), Stage::Inference, 1.5, "high".to_string());
        assert_eq!(high.progress, 1.0);
    }

    #[test]
    fn test_builder_start_complete() {
        let builder = TraceBuilder::new(Uuid::nil(), Stage::Aggregation);
        assert_eq!(builder.start("Starting").progress, 0.0);
        assert_eq!(builder.complete("Done").progress, 1.0);
        assert_eq!(builder.progress(0.25, "Quarter").stage, Stage::Aggregation);
    }

    #[test]
    fn test_stage_serializes_snake_case() {
        let entry = TraceEntry::new(Uuid::nil(), Stage::Windowing, 0.0, "plan".to_string())
            .with_data(serde_json::json!({ "windows": 2 }));
        let line = entry.to_json_line().unwrap();

        assert!(line.ends_with('\n'));
        assert!(line.contains("\"stage\":\"windowing\""));

        let parsed: TraceEntry = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(parsed.data.unwrap()["windows"], 2);
    }

    #[test]
    fn test_writer_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let trace_path = temp_dir.path().join("trace.jsonl");
        let writer = TraceWriter::new(trace_path.clone());
        let run_id = Uuid::new_v4();

        let builder = TraceBuilder::new(run_id, Stage::Extraction);
        writer.write(&builder.start("Start")).unwrap();
        writer
            .write_batch(&[builder.progress(0.5, "Half"), builder.complete("Done")])
            .unwrap();

        let entries = read_trace_file(&trace_path).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.run_id == run_id));
        assert_eq!(entries[2].progress, 1.0);
    }

    #[test]
    fn test_emit_without_writer_is_noop() {
        let mut called = false;
        emit(None, || {
            called = true;
            TraceEntry::new(Uuid::nil(), Stage::Inference, 0.0, String::new())
        });
        assert!(!called);
    }

    #[test]
    fn test_emit_to_missing_directory_does_not_panic() {
        let temp_dir = TempDir::new().unwrap();
        let writer = TraceWriter::new(temp_dir.path().join("missing").join("trace.jsonl"));
        emit(Some(&writer), || {
            TraceEntry::new(Uuid::nil(), Stage::Inference, 0.0, "lost".to_string())
        });
        assert!(!writer.path().exists());
    }
}
