//! Fixed-period tick driver.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Calls a callback on its own thread once per period.
///
/// Callbacks never overlap: the driver runs them serially, and deadlines
/// that pass while a callback is still running are skipped rather than
/// queued. The first tick fires one period after `start`.
pub struct TickScheduler {
    period: Duration,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    ticks: Arc<AtomicU64>,
    skipped: Arc<AtomicU64>,
}

impl TickScheduler {
    pub fn start<F>(period: Duration, mut callback: F) -> io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        if period.is_zero() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "tick period must be non-zero",
            ));
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let ticks = Arc::new(AtomicU64::new(0));
        let skipped = Arc::new(AtomicU64::new(0));
        let (t, s) = (ticks.clone(), skipped.clone());

        let handle = std::thread::Builder::new()
            .name("rigwatch-tick".into())
            .spawn(move || {
                let mut next = Instant::now() + period;
                loop {
                    let wait = next.saturating_duration_since(Instant::now());
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {}
                        // Stop requested or the scheduler was dropped.
                        _ => break,
                    }

                    callback();
                    t.fetch_add(1, Ordering::Relaxed);

                    next += period;
                    let now = Instant::now();
                    if next <= now {
                        let missed = (now - next).as_nanos() / period.as_nanos() + 1;
                        let missed = u32::try_from(missed).unwrap_or(u32::MAX);
                        log::debug!("tick overran its period; skipping {missed} tick(s)");
                        s.fetch_add(u64::from(missed), Ordering::Relaxed);
                        next += period * missed;
                    }
                }
            })?;

        Ok(Self {
            period,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
            ticks,
            skipped,
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Callbacks completed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Deadlines dropped because a callback was still running.
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Stop ticking and wait for a running callback to finish.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("tick callback panicked");
            }
        }
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
