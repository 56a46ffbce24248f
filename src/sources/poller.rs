use super::{DataSource, SourceEvent};
use crossbeam_channel::{after, bounded, select, Sender};
use sonify_core::SonifyError;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{info, warn};

/// Background fetch loop for one source.
///
/// Fetches immediately, then again every `poll_interval` until stopped.
/// Dropping the poller stops it, so replacing the poller for a new source
/// leaves exactly one fetch timer outstanding.
pub struct DataPoller {
    source: String,
    stop_tx: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl DataPoller {
    pub fn start(source: Arc<dyn DataSource>, events: Sender<SourceEvent>) -> Self {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let name = source.name().to_string();

        let thread = thread::spawn(move || loop {
            let name = source.name().to_string();
            if events.send(SourceEvent::Loading { source: name.clone() }).is_err() {
                break;
            }

            let event = match source.fetch() {
                Ok(points) => {
                    info!(source = %name, points = points.len(), "source loaded");
                    SourceEvent::Loaded { source: name, points }
                }
                Err(e) => {
                    warn!(source = %name, "fetch failed: {}", e);
                    SourceEvent::Failed {
                        source: name,
                        error: SonifyError::from(e),
                    }
                }
            };
            if events.send(event).is_err() {
                break;
            }

            let Some(interval) = source.poll_interval() else {
                // One-shot source: idle until stopped
                let _ = stop_rx.recv();
                break;
            };
            select! {
                recv(stop_rx) -> _ => break,
                recv(after(interval)) -> _ => {}
            }
        });

        Self {
            source: name,
            stop_tx,
            thread: Some(thread),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Drop for DataPoller {
    fn drop(&mut self) {
        let _ = self.stop_tx.try_send(());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
