//! Retention sweep for the single-slot hero upload directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use metrics::counter;
use tokio::{fs, task::JoinHandle};
use tracing::{debug, info, warn};

const SOURCE: &str = "vitrina::infra::sweeper";

/// What a single sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: Vec<String>,
    pub kept: Option<String>,
}

/// Keeps only the most recently modified file in a directory.
#[derive(Debug, Clone)]
pub struct UploadSweeper {
    dir: PathBuf,
}

impl UploadSweeper {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Run one pass. The directory is created when it does not exist yet.
    pub async fn sweep(&self) -> Result<SweepReport, std::io::Error> {
        fs::create_dir_all(&self.dir).await?;

        let mut entries = Vec::new();
        let mut listing = fs::read_dir(&self.dir).await?;
        while let Some(entry) = listing.next_entry().await? {
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(err),
            };
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            entries.push((modified, entry.file_name().to_string_lossy().into_owned()));
        }

        if entries.len() <= 1 {
            return Ok(SweepReport {
                removed: Vec::new(),
                kept: entries.pop().map(|(_, name)| name),
            });
        }

        entries.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        let kept = entries.pop().map(|(_, name)| name);

        let mut removed = Vec::with_capacity(entries.len());
        for (_, name) in entries {
            match fs::remove_file(self.dir.join(&name)).await {
                Ok(()) => {
                    debug!(target = SOURCE, file = %name, "removed stale upload");
                    removed.push(name);
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => {
                    warn!(target = SOURCE, file = %name, error = %err, "failed to remove stale upload");
                }
            }
        }

        counter!("vitrina_uploads_swept_total").increment(removed.len() as u64);
        Ok(SweepReport { removed, kept })
    }

    /// Sweep once and log the outcome. Errors are logged, never propagated.
    pub async fn sweep_and_log(&self) {
        match self.sweep().await {
            Ok(report) => info!(
                target = SOURCE,
                dir = %self.dir.display(),
                removed = report.removed.len(),
                kept = report.kept.as_deref().unwrap_or(""),
                "upload sweep finished"
            ),
            Err(err) => warn!(
                target = SOURCE,
                dir = %self.dir.display(),
                error = %err,
                "upload sweep skipped"
            ),
        }
    }

    /// Sweep immediately, then on every `period` until the task is aborted.
    pub fn spawn(self, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                self.sweep_and_log().await;
            }
        })
    }
}
