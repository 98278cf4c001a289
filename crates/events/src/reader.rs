//! JSONL event reader - sequential reader for replay

use crate::error::EventError;
use crate::event::LedgerEvent;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Sequential event reader for replay
pub struct EventReader {
    files: Vec<PathBuf>,
}

impl EventReader {
    /// Create a new reader from a directory; a missing directory reads as empty
    pub fn from_directory(path: impl AsRef<Path>) -> Result<Self, EventError> {
        let path = path.as_ref();
        let mut files = Vec::new();

        if path.exists() {
            for entry in std::fs::read_dir(path)? {
                let file_path = entry?.path();
                if file_path.extension().is_some_and(|ext| ext == "jsonl") {
                    files.push(file_path);
                }
            }
        }

        files.sort();

        Ok(Self { files })
    }

    fn read_file(path: &Path) -> Result<Vec<LedgerEvent>, EventError> {
        let reader = BufReader::new(File::open(path)?);
        let mut events = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str(&line)?);
        }
        Ok(events)
    }

    /// Read all events in order, checking that sequences are contiguous
    pub fn read_all(&self) -> Result<Vec<LedgerEvent>, EventError> {
        let mut events: Vec<LedgerEvent> = Vec::new();

        for file_path in &self.files {
            for event in Self::read_file(file_path)? {
                let expected = events.last().map_or(1, |e| e.sequence + 1);
                if event.sequence != expected {
                    return Err(EventError::SequenceGap {
                        expected,
                        found: event.sequence,
                    });
                }
                events.push(event);
            }
        }

        Ok(events)
    }
}
