use chrono::{DateTime, Utc};
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Appended to a reply that stopped before the stream ended.
pub const INTERRUPTED_MARKER: &str = "[reply interrupted]";

/// Appends finished exchanges to a plain-text transcript file.
pub struct TranscriptLog {
    file_path: PathBuf,
}

impl TranscriptLog {
    /// Open (creating if needed) the transcript at `path`, failing early when it
    /// is not writable.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let file_path = path.into();
        Self::test_file_access(&file_path)?;
        Ok(Self { file_path })
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn log_exchange(
        &self,
        at: DateTime<Utc>,
        persona: Option<&str>,
        user_message: &str,
        response: &str,
    ) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;
        let mut writer = BufWriter::new(file);

        writeln!(
            writer,
            "## {} [{}]",
            at.format("%Y-%m-%d %H:%M:%S UTC"),
            persona.unwrap_or("-")
        )?;
        for line in format!("You: {user_message}").lines() {
            writeln!(writer, "{line}")?;
        }
        writeln!(writer)?;
        for line in response.lines() {
            writeln!(writer, "{line}")?;
        }
        // Blank line between exchanges
        writeln!(writer)?;

        writer.flush()?;
        Ok(())
    }

    fn test_file_access(path: &Path) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.flush()?;
        Ok(())
    }
}

/// An exchange still streaming. It is written when dropped, so a reply cut
/// short by a disconnect is kept and marked as interrupted unless
/// [`PendingExchange::finish`] ran first.
pub struct PendingExchange {
    log: Arc<TranscriptLog>,
    started: DateTime<Utc>,
    persona: Option<String>,
    user_message: String,
    response: String,
    finished: bool,
}

impl PendingExchange {
    pub fn new(log: Arc<TranscriptLog>, persona: Option<String>, user_message: String) -> Self {
        Self {
            log,
            started: Utc::now(),
            persona,
            user_message,
            response: String::new(),
            finished: false,
        }
    }

    pub fn push(&mut self, chunk: &str) {
        self.response.push_str(chunk);
    }

    pub fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for PendingExchange {
    fn drop(&mut self) {
        let mut response = std::mem::take(&mut self.response);
        if !self.finished {
            if !response.is_empty() && !response.ends_with('\n') {
                response.push('\n');
            }
            response.push_str(INTERRUPTED_MARKER);
        }

        if let Err(err) = self.log.log_exchange(
            self.started,
            self.persona.as_deref(),
            &self.user_message,
            &response,
        ) {
            warn!(error = %err, path = %self.log.path().display(), "failed to write transcript");
        }
    }
}
