//! JSONL file writer for bus events.
//!
//! Each [`SwarmEvent`] is serialized as a single JSON line with a `type`
//! field, appended to the file via a buffered writer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use swarm_application::MessageBus;
use swarm_domain::SwarmEvent;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Event recorder that writes one JSON object per line.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes on `Drop`.
pub struct JsonlEventRecorder {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlEventRecorder {
    /// Create a recorder writing to the given path.
    ///
    /// Creates the file (and parent directories) if they don't exist.
    /// Returns `None` if the file cannot be created.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create event log directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match File::create(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not create event log file {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, event: &SwarmEvent) {
        let Ok(mut record) = serde_json::to_value(event) else {
            return;
        };
        if let serde_json::Value::Object(map) = &mut record {
            map.remove("topic");
            map.insert(
                "type".to_string(),
                serde_json::Value::String(event.topic.as_str().to_string()),
            );
        }

        let Ok(line) = serde_json::to_string(&record) else {
            return;
        };

        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
            let _ = writer.flush();
        }
    }

    /// Record every event on the bus until `token` is cancelled.
    pub fn attach(
        self: Arc<Self>,
        bus: &dyn MessageBus,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        let mut subscription = bus.subscribe(&[]);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    event = subscription.recv() => match event {
                        Some(event) => self.record(&event),
                        None => break,
                    },
                }
            }
            // keep whatever was already delivered
            for event in subscription.drain() {
                self.record(&event);
            }
            debug!(path = %self.path.display(), "Event recorder stopped");
        })
    }
}

impl Drop for JsonlEventRecorder {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}
