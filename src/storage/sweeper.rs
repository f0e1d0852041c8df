//! Background TTL Sweeper
//!
//! Lazy expiry (checking on access) never reclaims a key that is never
//! read again. The sweeper closes that gap: a background task wakes at a
//! fixed cadence and asks the engine to reclaim every key whose deadline
//! has passed.
//!
//! The cadence is `ttl_sweep_interval_ms` from the configuration, which
//! also bounds how long an untouched expired key can linger. Cancellation
//! uses a watch channel checked at every tick; in-flight sweeps run to
//! completion.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, trace};

use crate::storage::engine::Engine;

/// Handle to the running sweeper task.
///
/// Dropping the handle stops the task.
#[derive(Debug)]
pub struct TtlSweeper {
    shutdown_tx: watch::Sender<bool>,
}

impl TtlSweeper {
    /// Spawns the sweeper as a background task ticking every `interval`.
    pub fn start(engine: Arc<Engine>, interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(sweep_loop(engine, interval, shutdown_rx));
        info!(interval_ms = interval.as_millis() as u64, "ttl sweeper started");

        Self { shutdown_tx }
    }

    /// Signals the sweeper task to stop at the next tick boundary.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        info!("ttl sweeper stopped");
    }
}

impl Drop for TtlSweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn sweep_loop(
    engine: Arc<Engine>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("ttl sweeper received shutdown signal");
                    return;
                }
            }
        }

        let swept = engine.process_expired();
        if swept > 0 {
            debug!(swept, remaining = engine.len(), "sweep reclaimed expired keys");
        } else {
            trace!("sweep found nothing to reclaim");
        }
    }
}
