//! Two-phase asset export.
//!
//! Pipeline stages hand finished payloads to an [`ExportSink`] and get
//! a handle back; the write itself happens off the submitting thread
//! and its outcome is observable only through [`ExportSink::poll`].
//! There is no retry machinery here: a failed job stays failed and the
//! caller decides what that means for the run.

use anyhow::{bail, Result};
use log::{error, info};
use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

/// A finished payload and the asset name it should land under.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub name: String,
    pub payload: Vec<u8>,
}

/// Opaque ticket for a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobHandle {
    id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Succeeded(PathBuf),
    Failed(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

pub trait ExportSink {
    /// Accepts a job without blocking on the write.
    fn submit(&self, job: ExportJob) -> JobHandle;

    /// Reports the job's current status.
    fn poll(&self, handle: &JobHandle) -> JobStatus;
}

/// Sink that lands assets in a local directory.
///
/// Payloads are written to a temp file in the target directory and
/// renamed into place, so a partially written asset is never visible
/// under its final name.
pub struct AssetDir {
    dir: PathBuf,
    next_id: AtomicU64,
    jobs: Arc<Mutex<HashMap<u64, JobStatus>>>,
}

impl AssetDir {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            next_id: AtomicU64::new(0),
            jobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl ExportSink for AssetDir {
    fn submit(&self, job: ExportJob) -> JobHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.jobs
            .lock()
            .expect("job table poisoned")
            .insert(id, JobStatus::Pending);

        let jobs = Arc::clone(&self.jobs);
        let dir = self.dir.clone();
        thread::spawn(move || {
            let status = match write_asset(&dir, &job, id) {
                Ok(path) => JobStatus::Succeeded(path),
                Err(e) => JobStatus::Failed(e.to_string()),
            };
            jobs.lock()
                .expect("job table poisoned")
                .insert(id, status);
        });

        JobHandle { id }
    }

    fn poll(&self, handle: &JobHandle) -> JobStatus {
        self.jobs
            .lock()
            .expect("job table poisoned")
            .get(&handle.id)
            .cloned()
            .unwrap_or_else(|| JobStatus::Failed("unknown job".to_owned()))
    }
}

fn write_asset(dir: &Path, job: &ExportJob, id: u64) -> std::io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let out_path = dir.join(&job.name);
    // The job id keeps temp names distinct even when asset names
    // share a stem or a name is resubmitted.
    let tmp_path = dir.join(format!("{}.{id}.tmp", job.name));
    let mut tmp = fs::File::create(&tmp_path)?;
    tmp.write_all(&job.payload)?;
    tmp.sync_all()?;
    fs::rename(tmp_path, &out_path)?;
    Ok(out_path)
}

/// Polls every handle until all jobs reach a terminal status, then
/// fails the run if any job failed.
pub fn wait_all(sink: &dyn ExportSink, handles: &[JobHandle]) -> Result<()> {
    let mut failures = Vec::new();
    for handle in handles {
        loop {
            match sink.poll(handle) {
                JobStatus::Pending => thread::sleep(Duration::from_millis(50)),
                JobStatus::Succeeded(path) => {
                    info!("exported {}", path.display());
                    break;
                }
                JobStatus::Failed(reason) => {
                    error!("export failed: {reason}");
                    failures.push(reason);
                    break;
                }
            }
        }
    }
    if !failures.is_empty() {
        bail!("{} export job(s) failed: {}", failures.len(), failures.join("; "));
    }
    Ok(())
}
