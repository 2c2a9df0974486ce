use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::TraceConfig;

#[derive(Clone)]
pub struct TraceTx {
    tx: mpsc::Sender<String>,
    dropped: Arc<AtomicU64>,
    drop_when_full: bool,
}

impl TraceTx {
    /// Sink backed by a plain channel; the caller owns the receiving end.
    pub fn channel(capacity: usize, drop_when_full: bool) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
                drop_when_full,
            },
            rx,
        )
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub async fn send_line(&self, line: String) {
        if self.drop_when_full {
            if self.tx.try_send(line).is_err() {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        } else if self.tx.send(line).await.is_err() {
            // writer closed
        }
    }
}

/// Start the background trace writer.
///
/// The returned handle completes once every `TraceTx` clone is dropped and
/// the remaining lines are flushed.
pub async fn start_trace(
    cfg: &TraceConfig,
) -> Result<Option<(TraceTx, JoinHandle<()>)>, String> {
    if !cfg.enabled || cfg.path.trim().is_empty() {
        return Ok(None);
    }

    let path = cfg.path.clone();
    let mut writer: Box<dyn tokio::io::AsyncWrite + Unpin + Send> = if path == "stdout:" {
        Box::new(tokio::io::stdout())
    } else {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| format!("open trace file {path} failed: {e}"))?;
        Box::new(file)
    };

    let (tx, mut rx) = TraceTx::channel(cfg.channel_capacity, cfg.drop_when_full);

    let handle = tokio::spawn(async move {
        while let Some(mut line) = rx.recv().await {
            if !line.ends_with('\n') {
                line.push('\n');
            }
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                tracing::warn!(target: "taskpilot.trace", error = %e, "trace write failed");
                return;
            }
        }
        let _ = writer.flush().await;
    });

    Ok(Some((tx, handle)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_trace_starts_nothing() {
        let cfg = TraceConfig::default();
        assert!(start_trace(&cfg).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_trace_file_receives_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.jsonl");
        let cfg = TraceConfig {
            enabled: true,
            path: path.to_string_lossy().to_string(),
            channel_capacity: 8,
            drop_when_full: false,
        };

        let (tx, handle) = start_trace(&cfg).await.unwrap().unwrap();
        tx.send_line(r#"{"a":1}"#.to_string()).await;
        tx.send_line("{\"b\":2}\n".to_string()).await;
        drop(tx);
        handle.await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "{\"a\":1}\n{\"b\":2}\n");
    }

    #[tokio::test]
    async fn test_full_channel_counts_drops() {
        let (tx, _rx) = TraceTx::channel(1, true);
        tx.send_line("one".to_string()).await;
        tx.send_line("two".to_string()).await;
        assert_eq!(tx.dropped_count(), 1);
    }
}
