use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use parking_lot::Mutex;
use tracing::warn;

use crate::trace::trace::TraceEvent;

/// Append-only JSONL journal of submit cycles.
///
/// A journal that could not be opened is inert: `log` drops every event and
/// the controller keeps running.
pub struct TraceLogger {
    sink: Option<Journal>,
}

struct Journal {
    path: PathBuf,
    file: Mutex<File>,
}

impl TraceLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Self {
                sink: Some(Journal {
                    path: path.to_path_buf(),
                    file: Mutex::new(file),
                }),
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "trace journal unavailable, events will be dropped");
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.sink.as_ref().map(|journal| journal.path.as_path())
    }

    /// Write one event as a single line.
    pub fn log(&self, event: &TraceEvent) {
        let Some(journal) = &self.sink else {
            return;
        };

        let mut line = match serde_json::to_vec(event) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(form = %event.form, error = %e, "trace event not serializable");
                return;
            }
        };
        line.push(b'\n');

        // One write per line keeps concurrent controllers from interleaving.
        if let Err(e) = journal.file.lock().write_all(&line) {
            warn!(path = %journal.path.display(), error = %e, "trace journal write failed");
        }
    }
}
