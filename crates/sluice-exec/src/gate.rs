//! Arrival gate: block until the source artifact shows up.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sluice_io::Storage;

use crate::cancel::CancelToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Present,
    TimedOut,
    Cancelled,
}

/// Polls a `Storage` for one key. Probing has no side effects.
#[derive(Clone)]
pub struct ArrivalGate {
    storage: Arc<dyn Storage>,
}

impl ArrivalGate {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Probe `name` now and then every `poll_interval` until it exists,
    /// `timeout` elapses (`None` waits forever), or `cancel` fires.
    pub fn await_artifact(
        &self,
        name: &str,
        poll_interval: Duration,
        timeout: Option<Duration>,
        cancel: &CancelToken,
    ) -> sluice_io::Result<GateOutcome> {
        let start = Instant::now();
        let mut polls: u64 = 0;
        loop {
            if cancel.is_cancelled() {
                return Ok(GateOutcome::Cancelled);
            }
            polls += 1;
            if self.storage.exists(name)? {
                tracing::debug!(artifact = name, polls, "source artifact present");
                return Ok(GateOutcome::Present);
            }

            let mut wait = poll_interval;
            if let Some(limit) = timeout {
                let elapsed = start.elapsed();
                if elapsed >= limit {
                    tracing::debug!(artifact = name, polls, "gate timed out");
                    return Ok(GateOutcome::TimedOut);
                }
                wait = wait.min(limit - elapsed);
            }
            tracing::debug!(artifact = name, polls, wait_ms = wait.as_millis() as u64, "source artifact not present yet");
            if cancel.wait_timeout(wait) {
                return Ok(GateOutcome::Cancelled);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_io::MemoryStorage;

    fn gate(mem: &MemoryStorage) -> ArrivalGate {
        ArrivalGate::new(Arc::new(mem.clone()))
    }

    #[test]
    fn present_file_is_seen_on_first_probe() {
        let mem = MemoryStorage::new();
        mem.insert("in.csv", b"a\n1\n".to_vec());
        let out = gate(&mem)
            .await_artifact("in.csv", Duration::from_secs(3600), Some(Duration::ZERO), &CancelToken::new())
            .unwrap();
        assert_eq!(out, GateOutcome::Present);
    }

    #[test]
    fn missing_file_times_out() {
        let mem = MemoryStorage::new();
        let start = Instant::now();
        let out = gate(&mem)
            .await_artifact("in.csv", Duration::from_millis(5), Some(Duration::from_millis(30)), &CancelToken::new())
            .unwrap();
        assert_eq!(out, GateOutcome::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn late_arrival_is_picked_up() {
        let mem = MemoryStorage::new();
        let writer = mem.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            writer.insert("in.csv", b"a\n".to_vec());
        });
        let out = gate(&mem)
            .await_artifact("in.csv", Duration::from_millis(5), Some(Duration::from_secs(10)), &CancelToken::new())
            .unwrap();
        handle.join().unwrap();
        assert_eq!(out, GateOutcome::Present);
    }

    #[test]
    fn cancellation_interrupts_an_unbounded_wait() {
        let mem = MemoryStorage::new();
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            trigger.cancel();
        });
        let out = gate(&mem)
            .await_artifact("in.csv", Duration::from_secs(3600), None, &cancel)
            .unwrap();
        handle.join().unwrap();
        assert_eq!(out, GateOutcome::Cancelled);
    }
}
