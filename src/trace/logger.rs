use std::{fs::OpenOptions, io::Write, path::Path, sync::Mutex};

use crate::trace::diagnostic::Diagnostic;
use crate::trace::sink::DiagnosticSink;

/// Appends one JSON line per diagnostic to a file.
pub struct JsonlSink {
    file: Option<Mutex<std::fs::File>>,
}

impl JsonlSink {
    pub fn new(path: &Path) -> Self {
        let file = OpenOptions::new().create(true).append(true).open(path);

        match file {
            Ok(f) => Self {
                file: Some(Mutex::new(f)),
            },
            Err(e) => {
                tracing::warn!("could not open diagnostics file '{}': {}", path.display(), e);
                Self { file: None }
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }
}

impl DiagnosticSink for JsonlSink {
    fn report(&self, diagnostic: &Diagnostic) {
        let file_mutex = match &self.file {
            Some(f) => f,
            None => return, // logging disabled
        };

        let json = match serde_json::to_string(diagnostic) {
            Ok(j) => j,
            Err(e) => {
                tracing::warn!("failed to serialize diagnostic: {}", e);
                return;
            }
        };

        let mut file = match file_mutex.lock() {
            Ok(f) => f,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Err(e) = writeln!(file, "{}", json) {
            tracing::warn!("failed to write diagnostic: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_writing_after_a_panic_while_locked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diagnostics.jsonl");
        let sink = JsonlSink::new(&path);

        let file_mutex = sink.file.as_ref().unwrap();
        let panicked = std::thread::scope(|s| {
            s.spawn(|| {
                let _guard = file_mutex.lock().unwrap();
                panic!("writer panicked");
            })
            .join()
        });
        assert!(panicked.is_err());
        assert!(file_mutex.is_poisoned());

        sink.report(&Diagnostic::convergence_exceeded(3));

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 1);
        assert!(written.contains("convergence"), "unexpected line: {}", written);
    }
}
