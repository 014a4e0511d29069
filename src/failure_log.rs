use chrono::{SecondsFormat, Utc};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Append-only failure log: one `<RFC3339 timestamp> <message>` line per
/// deletion or fork failure.
///
/// Writing is best effort; a log that cannot be written never fails the
/// account it describes.
pub struct FailureLog {
    sink: Sink,
}

enum Sink {
    File(PathBuf),
    Memory(Mutex<Vec<String>>),
}

impl FailureLog {
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            sink: Sink::File(path.as_ref().to_path_buf()),
        }
    }

    /// Keeps lines in memory; used by tests and dry runs.
    pub fn memory() -> Self {
        Self {
            sink: Sink::Memory(Mutex::new(Vec::new())),
        }
    }

    pub fn record(&self, message: &str) {
        let line = format!(
            "{} {}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            message
        );
        match &self.sink {
            Sink::File(path) => {
                if let Err(e) = append_line(path, &line) {
                    warn!(path = %path.display(), error = %e, "Failed to write failure log");
                }
            }
            Sink::Memory(lines) => lines.lock().unwrap_or_else(|e| e.into_inner()).push(line),
        }
    }

    /// Lines written so far.
    pub fn lines(&self) -> Vec<String> {
        match &self.sink {
            Sink::File(path) => fs::read_to_string(path)
                .map(|content| content.lines().map(str::to_string).collect())
                .unwrap_or_default(),
            Sink::Memory(lines) => lines.lock().unwrap_or_else(|e| e.into_inner()).clone(),
        }
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)
}
