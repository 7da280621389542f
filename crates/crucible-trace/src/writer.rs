use std::path::{Path, PathBuf};

use crucible_types::{RunSummary, TraceEvent};
use tokio::fs;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::TraceError;

const TRACE_FILE: &str = "trace.jsonl";
const SUMMARY_FILE: &str = "run.json";

/// Append-only, concurrency-safe event log for one run. Callers from
/// multiple worker contexts may call [`TraceWriter::write_event`]
/// concurrently; writes are serialized under an internal mutex, and every
/// successful return reflects one complete JSON line durably appended
/// before the next call can begin.
pub struct TraceWriter {
    dir: PathBuf,
    file: Mutex<Option<File>>,
}

impl TraceWriter {
    /// Creates `<runs_root>/<run_id>/` and opens `trace.jsonl` for append.
    pub async fn create(runs_root: impl AsRef<Path>, run_id: &str) -> Result<Self, TraceError> {
        let dir = runs_root.as_ref().join(run_id);
        fs::create_dir_all(&dir).await?;
        let file = File::options()
            .create(true)
            .append(true)
            .open(dir.join(TRACE_FILE))
            .await?;
        Ok(Self {
            dir,
            file: Mutex::new(Some(file)),
        })
    }

    pub fn run_dir(&self) -> &Path {
        &self.dir
    }

    /// Marshals `event` to one JSON line, appends it, and forces the write
    /// to durable storage before returning. Fails with [`TraceError::Closed`]
    /// once [`TraceWriter::close`] has run.
    pub async fn write_event(&self, event: &TraceEvent) -> Result<(), TraceError> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let mut guard = self.file.lock().await;
        let file = guard.as_mut().ok_or(TraceError::Closed)?;
        file.write_all(&line).await?;
        file.flush().await?;
        file.sync_data().await?;
        Ok(())
    }

    /// Overwrites any previous summary for this run.
    pub async fn write_summary(&self, summary: &RunSummary) -> Result<(), TraceError> {
        let payload = serde_json::to_vec_pretty(summary)?;
        fs::write(self.dir.join(SUMMARY_FILE), payload).await?;
        Ok(())
    }

    /// Idempotent: flushes and releases the underlying file handle. Further
    /// calls to [`TraceWriter::write_event`] return [`TraceError::Closed`].
    pub async fn close(&self) -> Result<(), TraceError> {
        let mut guard = self.file.lock().await;
        if let Some(mut file) = guard.take() {
            file.flush().await?;
            file.sync_data().await?;
        }
        Ok(())
    }
}
