//! Connection liveness supervisor
//!
//! A single process-wide table of probes, swept on a fixed interval
//! independent of room boundaries. Two-strike policy: a sweep pings every
//! socket and clears its flag; a socket whose flag is still clear at the
//! next sweep never answered and is terminated.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

struct Probe {
    alive: Arc<AtomicBool>,
    tx: mpsc::UnboundedSender<Message>,
}

/// Registry of open connections subject to liveness probing
pub struct HeartbeatRegistry {
    probes: Mutex<HashMap<u64, Probe>>,
    next_id: AtomicU64,
}

impl HeartbeatRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            probes: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        })
    }

    /// Track a connection. The session sets the returned flag whenever
    /// the socket shows signs of life.
    pub fn register(&self, tx: mpsc::UnboundedSender<Message>) -> (u64, Arc<AtomicBool>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let alive = Arc::new(AtomicBool::new(true));
        self.probes.lock().insert(
            id,
            Probe {
                alive: Arc::clone(&alive),
                tx,
            },
        );
        (id, alive)
    }

    pub fn deregister(&self, id: u64) {
        self.probes.lock().remove(&id);
    }

    pub fn probe_count(&self) -> usize {
        self.probes.lock().len()
    }

    /// One probe cycle: drop sockets that never answered the previous
    /// ping, mark and ping the rest
    pub fn sweep(&self) {
        let mut probes = self.probes.lock();
        probes.retain(|id, probe| {
            if probe.tx.is_closed() {
                return false;
            }
            if !probe.alive.load(Ordering::Relaxed) {
                debug!(probe = *id, "terminating unresponsive connection");
                let _ = probe.tx.send(Message::Close(None));
                return false;
            }
            probe.alive.store(false, Ordering::Relaxed);
            let _ = probe.tx.send(Message::Ping(Vec::new()));
            true
        });
    }
}

/// Supervisor loop; runs for the life of the process
pub async fn run(registry: Arc<HeartbeatRegistry>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await; // the first tick completes immediately
    loop {
        ticker.tick().await;
        registry.sweep();
    }
}
