use std::{
    sync::{
        Arc,
        mpsc::{self, RecvTimeoutError, Sender},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use tracing::{debug, info, warn};

use crate::registry::ScriptRegistry;

pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Periodically drops expired time-boxed cache entries from every registered
/// script. Lookups only evict the key they touch, so requesters that never
/// come back would otherwise keep their buckets forever.
pub struct CleanupService {
    registry: Arc<ScriptRegistry>,
    cleanup_interval: Duration,
    worker: Option<(Sender<()>, JoinHandle<()>)>,
}

impl CleanupService {
    pub fn new(registry: Arc<ScriptRegistry>, cleanup_interval: Duration) -> Self {
        Self {
            registry,
            cleanup_interval,
            worker: None,
        }
    }

    pub fn start(&mut self) {
        if self.is_running() {
            warn!("Cleanup service is already running");
            return;
        }

        let registry = Arc::clone(&self.registry);
        let interval = self.cleanup_interval;
        let (stop, stopped) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            info!(?interval, "Starting cache cleanup service");

            // A message or a dropped sender both end the loop.
            while let Err(RecvTimeoutError::Timeout) = stopped.recv_timeout(interval) {
                match registry.purge_expired() {
                    0 => debug!("No expired cache entries to clean up"),
                    removed => info!(removed, "Cleaned up expired cache entries"),
                }
            }
        });

        self.worker = Some((stop, handle));
    }

    pub fn stop(&mut self) {
        match self.worker.take() {
            Some((stop, handle)) => {
                let _ = stop.send(());
                let _ = handle.join();
                info!("Cache cleanup service stopped");
            }
            None => debug!("Cache cleanup service is not running"),
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|(_, handle)| !handle.is_finished())
    }
}

impl Drop for CleanupService {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.stop();
        }
    }
}
