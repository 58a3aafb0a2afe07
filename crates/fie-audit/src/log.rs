// log.rs — Append-only JSONL audit log with a SHA-256 hash chain.
//
// Each line is one serialized AuditEvent whose `previous_hash` is the hash of
// the raw previous line. Reopening a log recovers the chain head from the
// last non-blank line.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::AuditError;
use crate::event::AuditEvent;
use crate::hasher;

/// An append-only audit log backed by a JSONL file.
pub struct AuditLog {
    writer: BufWriter<File>,
    path: PathBuf,
    /// Hash of the last line written; becomes the next event's `previous_hash`.
    last_hash: Option<String>,
}

impl AuditLog {
    /// Open (or create) an audit log, recovering the chain head if it exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| AuditError::OpenFailed {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let last_hash = if path.exists() {
            Self::read_last_hash(&path)?
        } else {
            None
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| AuditError::OpenFailed {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            writer: BufWriter::new(file),
            path,
            last_hash,
        })
    }

    /// Append an event, linking it to the previous line. Flushes after writing.
    pub fn append(&mut self, event: &mut AuditEvent) -> Result<(), AuditError> {
        event.previous_hash = self.last_hash.clone();

        let json = serde_json::to_string(event)?;
        writeln!(self.writer, "{}", json)?;
        self.writer.flush()?;

        // Only advance the chain head once the line is durable.
        self.last_hash = Some(hasher::hash_str(&json));
        tracing::debug!(
            action = ?event.action,
            principal = %event.principal,
            "audit event appended"
        );
        Ok(())
    }

    /// Append several events as one write. The chain head only advances if
    /// the whole batch was flushed.
    pub fn append_batch(&mut self, events: &mut [AuditEvent]) -> Result<(), AuditError> {
        let mut head = self.last_hash.clone();
        let mut buf = String::new();
        for event in events.iter_mut() {
            event.previous_hash = head;
            let json = serde_json::to_string(event)?;
            head = Some(hasher::hash_str(&json));
            buf.push_str(&json);
            buf.push('\n');
        }
        self.writer.write_all(buf.as_bytes())?;
        self.writer.flush()?;

        self.last_hash = head;
        tracing::debug!(count = events.len(), "audit batch appended");
        Ok(())
    }

    /// Read all events, oldest first. Blank lines are skipped.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<AuditEvent>, AuditError> {
        let mut events = Vec::new();
        for line in Self::lines(path.as_ref())? {
            let (_, line) = line?;
            events.push(serde_json::from_str(&line)?);
        }
        Ok(events)
    }

    /// Read the events belonging to one estate, oldest first.
    pub fn read_for_principal(
        path: impl AsRef<Path>,
        principal: &str,
    ) -> Result<Vec<AuditEvent>, AuditError> {
        Ok(Self::read_all(path)?
            .into_iter()
            .filter(|e| e.principal == principal)
            .collect())
    }

    /// Verify the hash chain. Returns the number of events on success or an
    /// `IntegrityViolation` naming the first broken line.
    pub fn verify_chain(path: impl AsRef<Path>) -> Result<usize, AuditError> {
        let mut previous_hash: Option<String> = None;
        let mut count = 0;

        for line in Self::lines(path.as_ref())? {
            let (line_num, line) = line?;
            let event: AuditEvent = serde_json::from_str(&line)?;

            if event.previous_hash != previous_hash {
                return Err(AuditError::IntegrityViolation {
                    line: line_num,
                    expected: previous_hash.unwrap_or_else(|| "None".to_string()),
                    actual: event.previous_hash.unwrap_or_else(|| "None".to_string()),
                });
            }

            // Hash the raw line: re-serializing could reorder fields.
            previous_hash = Some(hasher::hash_str(&line));
            count += 1;
        }

        Ok(count)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Non-blank lines with their 1-based line numbers.
    fn lines(
        path: &Path,
    ) -> Result<impl Iterator<Item = Result<(usize, String), AuditError>>, AuditError> {
        let file = File::open(path).map_err(|source| AuditError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(BufReader::new(file)
            .lines()
            .enumerate()
            .filter_map(|(idx, line)| match line {
                Ok(l) if l.trim().is_empty() => None,
                Ok(l) => Some(Ok((idx + 1, l))),
                Err(e) => Some(Err(AuditError::from(e))),
            }))
    }

    fn read_last_hash(path: &Path) -> Result<Option<String>, AuditError> {
        let mut last_line: Option<String> = None;
        for line in Self::lines(path)? {
            last_line = Some(line?.1);
        }
        Ok(last_line.map(|line| hasher::hash_str(&line)))
    }
}
