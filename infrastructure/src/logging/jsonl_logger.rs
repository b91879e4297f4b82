//! JSONL transcript of workflow runs.
//!
//! Every [`ConversationEvent`] becomes one JSON line carrying the event
//! `type`, a `timestamp` and a per-logger `seq` number. The file is opened in
//! append mode so several runs can share one transcript.

use serde_json::{Map, Value};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use stepwise_application::ports::conversation_logger::{ConversationEvent, ConversationLogger};
use tracing::warn;

/// Events after which buffered lines are pushed to disk
const FLUSH_ON: &[&str] = &["workflow_finished", "step_recorded"];

struct Transcript {
    writer: BufWriter<File>,
    next_seq: u64,
}

/// Appends conversation events to a JSONL file.
pub struct JsonlConversationLogger {
    transcript: Mutex<Transcript>,
    path: PathBuf,
}

impl JsonlConversationLogger {
    /// Open (or create) the transcript at `path`, creating parent directories.
    ///
    /// Returns `None` when the file cannot be opened; the caller then runs
    /// without a transcript.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!("Cannot create transcript directory {}: {}", parent.display(), e);
            return None;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .inspect_err(|e| warn!("Cannot open transcript {}: {}", path.display(), e))
            .ok()?;

        Some(Self {
            transcript: Mutex::new(Transcript {
                writer: BufWriter::new(file),
                next_seq: 1,
            }),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(event: ConversationEvent, seq: u64) -> Value {
        let mut record = match event.payload {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        record.insert("type".to_string(), Value::from(event.event_type));
        record.insert("seq".to_string(), Value::from(seq));
        record.insert(
            "timestamp".to_string(),
            Value::from(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
        );
        Value::Object(record)
    }
}

impl ConversationLogger for JsonlConversationLogger {
    fn log(&self, event: ConversationEvent) {
        let Ok(mut transcript) = self.transcript.lock() else {
            return;
        };
        let flush = FLUSH_ON.contains(&event.event_type);
        let seq = transcript.next_seq;
        transcript.next_seq += 1;

        let Ok(line) = serde_json::to_string(&Self::record(event, seq)) else {
            return;
        };
        if let Err(e) = writeln!(transcript.writer, "{}", line) {
            warn!("Transcript write failed: {}", e);
            return;
        }
        if flush {
            let _ = transcript.writer.flush();
        }
    }
}

impl Drop for JsonlConversationLogger {
    fn drop(&mut self) {
        if let Ok(mut transcript) = self.transcript.lock() {
            let _ = transcript.writer.flush();
        }
    }
}
