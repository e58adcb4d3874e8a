use chrono::Local;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Prefix of the file written by [`DiagnosticsSink::flush`].
pub const DIAGNOSTICS_FILE_PREFIX: &str = "updatererrors_";

/// Append-only, in-memory record of errors and warnings, flushed to a
/// timestamped file on demand.
///
/// Nothing here returns an error or panics: a failed flush is reported via
/// `tracing` and the entries are kept for the next attempt.
#[derive(Debug)]
pub struct DiagnosticsSink {
    entries: Mutex<Vec<String>>,
    directory: Option<PathBuf>,
}

impl DiagnosticsSink {
    /// Sink that flushes into the current working directory.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            directory: None,
        }
    }

    pub fn in_dir(directory: impl Into<PathBuf>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            directory: Some(directory.into()),
        }
    }

    pub fn log(&self, text: impl AsRef<str>) {
        let text = text.as_ref();
        warn!(target: "status_updater::diagnostics", "{}", text);

        let stamp = Local::now().format("%a %b %e %H:%M:%S %Y");
        self.entries.lock().push(format!("[{stamp}] {text}"));
    }

    /// Writes all entries to `updatererrors_<YYYYMMDD_HHMMSS>.log` and clears
    /// them. Returns the file name, or an empty string when there was
    /// nothing to write.
    pub fn flush(&self) -> String {
        let mut entries = self.entries.lock();
        if entries.is_empty() {
            return String::new();
        }

        let file_name = format!(
            "{}{}.log",
            DIAGNOSTICS_FILE_PREFIX,
            Local::now().format("%Y%m%d_%H%M%S")
        );
        let path = self.path_for(&file_name);

        let mut contents = entries.join("\n");
        contents.push('\n');

        match fs::write(&path, contents) {
            Ok(()) => {
                info!(
                    path = %path.display(),
                    entries = entries.len(),
                    "Flushed status updater diagnostics"
                );
                entries.clear();
            }
            Err(e) => {
                error!(
                    path = %path.display(),
                    "Failed to write diagnostics file: {}", e
                );
            }
        }

        file_name
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    fn path_for(&self, file_name: &str) -> PathBuf {
        match &self.directory {
            Some(dir) => dir.join(file_name),
            None => PathBuf::from(file_name),
        }
    }
}

impl Default for DiagnosticsSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_prefixes_timestamp() {
        let sink = DiagnosticsSink::new();
        sink.log("something broke");

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].starts_with('['));
        assert!(entries[0].ends_with("] something broke"));
    }

    #[test]
    fn test_flush_empty_is_noop() {
        let dir = TempDir::new().unwrap();
        let sink = DiagnosticsSink::in_dir(dir.path());

        assert_eq!(sink.flush(), "");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_flush_writes_file_and_clears() {
        let dir = TempDir::new().unwrap();
        let sink = DiagnosticsSink::in_dir(dir.path());
        sink.log("first");
        sink.log("second");

        let name = sink.flush();
        assert!(name.starts_with(DIAGNOSTICS_FILE_PREFIX));
        assert!(name.ends_with(".log"));
        // updatererrors_YYYYMMDD_HHMMSS.log
        assert_eq!(name.len(), DIAGNOSTICS_FILE_PREFIX.len() + 15 + 4);

        let written = fs::read_to_string(dir.path().join(&name)).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("first"));
        assert!(lines[1].ends_with("second"));

        assert!(sink.is_empty());
        assert_eq!(sink.flush(), "");
    }

    #[test]
    fn test_failed_flush_keeps_entries() {
        let dir = TempDir::new().unwrap();
        let sink = DiagnosticsSink::in_dir(dir.path().join("missing").join("nested"));
        sink.log("kept");

        let name = sink.flush();
        assert!(!name.is_empty());
        assert_eq!(sink.len(), 1);
    }
}
