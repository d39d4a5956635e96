pub mod events;

use anyhow::{Context, Result};
use events::AuditEvent;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

const AUDIT_CHANNEL_CAPACITY: usize = 10_000;
const RECENT_EVENTS_CAPACITY: usize = 100;

/// Asynchronous, append-only audit sink shared by every session of a listener.
///
/// Producers never wait on disk: records go through a bounded channel to a
/// single writer task, which writes each record as one JSON line. A full
/// channel drops the record and bumps [`AuditLogger::dropped_count`].
/// [`AuditLogger::close`] flushes whatever is still queued.
pub struct AuditLogger {
    sender: mpsc::Sender<AuditEvent>,
    dropped_count: AtomicU64,
    recent_events: Arc<Mutex<VecDeque<AuditEvent>>>,
    path: Option<PathBuf>,
    closing: CancellationToken,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl AuditLogger {
    /// Open the audit destination and start the writer task.
    ///
    /// The file (and its parent directories) are created up front so that an
    /// unusable destination is reported at startup rather than at first write.
    /// With `log_path = None` records only reach tracing and the in-memory ring.
    pub async fn open(log_path: Option<PathBuf>, max_size_bytes: u64, max_files: u32) -> Result<Self> {
        let file = match &log_path {
            Some(path) => Some(open_append(path).await?),
            None => None,
        };
        let current_size = match &file {
            Some(f) => f.metadata().await.map(|m| m.len()).unwrap_or(0),
            None => 0,
        };

        let (sender, receiver) = mpsc::channel(AUDIT_CHANNEL_CAPACITY);
        let closing = CancellationToken::new();
        let writer = tokio::spawn(audit_writer_task(
            receiver,
            AuditFile {
                path: log_path.clone(),
                file,
                current_size,
                max_size_bytes,
                max_files,
            },
            closing.clone(),
        ));

        Ok(Self {
            sender,
            dropped_count: AtomicU64::new(0),
            recent_events: Arc::new(Mutex::new(VecDeque::with_capacity(RECENT_EVENTS_CAPACITY))),
            path: log_path,
            closing,
            writer: Mutex::new(Some(writer)),
        })
    }

    /// Create a no-op audit logger for testing (no tokio runtime required).
    /// Events are kept in the recent-events ring but never written anywhere.
    pub fn new_noop() -> Self {
        let (sender, _receiver) = mpsc::channel(1);
        Self {
            sender,
            dropped_count: AtomicU64::new(0),
            recent_events: Arc::new(Mutex::new(VecDeque::with_capacity(RECENT_EVENTS_CAPACITY))),
            path: None,
            closing: CancellationToken::new(),
            writer: Mutex::new(None),
        }
    }

    /// Destination file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of audit events dropped due to channel overflow
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    pub fn log_event(&self, event: AuditEvent) {
        self.try_send(event);
    }

    /// Stop accepting records, write out everything already queued and wait
    /// for the writer task to finish. Records logged afterwards count as
    /// dropped. Calling it again is a no-op.
    pub async fn close(&self) {
        self.closing.cancel();
        let writer = self.writer.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(writer) = writer {
            if let Err(e) = writer.await {
                error!(error = %e, "Audit writer task failed");
            }
        }
    }

    /// Return the most recent audit events (up to `max`), newest last.
    pub fn recent_events(&self, max: usize) -> Vec<AuditEvent> {
        let buf = self.recent_events.lock().unwrap_or_else(|e| e.into_inner());
        let skip = buf.len().saturating_sub(max);
        buf.iter().skip(skip).cloned().collect()
    }

    fn try_send(&self, event: AuditEvent) {
        {
            let mut buf = self.recent_events.lock().unwrap_or_else(|e| e.into_inner());
            if buf.len() >= RECENT_EVENTS_CAPACITY {
                buf.pop_front();
            }
            buf.push_back(event.clone());
        }

        let event = match self.sender.try_send(event) {
            Ok(()) => return,
            Err(mpsc::error::TrySendError::Full(event)) if event.is_critical() => event,
            Err(_) => {
                self.record_drop();
                return;
            }
        };

        // Critical events get one more chance at a freed slot.
        match self.sender.try_reserve() {
            Ok(permit) => permit.send(event),
            Err(_) => self.record_drop(),
        }
    }

    fn record_drop(&self) {
        let dropped = self.dropped_count.fetch_add(1, Ordering::Relaxed) + 1;
        if dropped % 100 == 1 {
            warn!(
                total_dropped = dropped,
                "Audit events being dropped due to channel overflow"
            );
        }
    }
}

async fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating audit directory: {}", parent.display()))?;
        }
    }
    tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("opening audit log: {}", path.display()))
}

/// Writer-side state, owned exclusively by the writer task.
struct AuditFile {
    path: Option<PathBuf>,
    file: Option<File>,
    current_size: u64,
    max_size_bytes: u64,
    max_files: u32,
}

async fn audit_writer_task(
    mut receiver: mpsc::Receiver<AuditEvent>,
    mut out: AuditFile,
    closing: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            event = receiver.recv() => event,
            _ = closing.cancelled() => {
                // Closing the receiver still yields the records already queued.
                receiver.close();
                receiver.recv().await
            }
        };
        let Some(event) = event else {
            break;
        };
        out.write(&event).await;
    }
    debug!("Audit writer stopped");
}

impl AuditFile {
    async fn write(&mut self, event: &AuditEvent) {
        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "Failed to serialize audit event");
                return;
            }
        };
        debug!(event = %json, "Audit event");

        let Some(ref mut f) = self.file else {
            return;
        };
        let line = format!("{}\n", json);
        if let Err(e) = f.write_all(line.as_bytes()).await {
            error!(error = %e, "Failed to write audit log");
            return;
        }
        if let Err(e) = f.flush().await {
            error!(error = %e, "Failed to flush audit log");
        }
        self.current_size += line.len() as u64;

        if self.max_size_bytes > 0 && self.current_size >= self.max_size_bytes {
            if let Some(path) = self.path.clone() {
                drop(self.file.take());
                rotate_audit_files(&path, self.max_files).await;
                match open_append(&path).await {
                    Ok(new_file) => {
                        self.file = Some(new_file);
                        self.current_size = 0;
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to reopen audit log after rotation");
                    }
                }
            }
        }
    }
}

/// Rotate audit log files: audit.json -> audit.json.1, audit.json.1 -> audit.json.2, etc.
async fn rotate_audit_files(path: &Path, max_files: u32) {
    for i in (1..max_files).rev() {
        let from = format!("{}.{}", path.display(), i);
        let to = format!("{}.{}", path.display(), i + 1);
        let _ = tokio::fs::rename(&from, &to).await;
    }
    let rotated = format!("{}.1", path.display());
    if let Err(e) = tokio::fs::rename(path, &rotated).await {
        error!(error = %e, "Failed to rotate audit log");
    }
}
