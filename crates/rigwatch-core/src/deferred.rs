//! Background sampling for slow backends.
//!
//! [`Deferred`] runs each query of the wrapped backend on a worker thread.
//! At most one query is in flight; a tick never waits on it. A finished
//! result is handed out at the next tick boundary, which also starts the
//! next query.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError, TryLockError};

use crate::error::ProbeError;
use crate::probe::Backend;

type Shared<T> = Arc<Mutex<Box<dyn Backend<Value = T>>>>;

pub struct Deferred<T> {
    backend: Shared<T>,
    pending: Option<Receiver<Result<T, ProbeError>>>,
}

impl<T: Send + 'static> Deferred<T> {
    pub fn new(backend: Box<dyn Backend<Value = T>>) -> Self {
        Self {
            backend: Arc::new(Mutex::new(backend)),
            pending: None,
        }
    }

    /// Whether a query is currently running on a worker.
    pub fn in_flight(&self) -> bool {
        self.pending.is_some()
    }

    fn spawn(&mut self) -> Result<(), ProbeError> {
        let (tx, rx) = mpsc::channel();
        let backend = Arc::clone(&self.backend);
        std::thread::Builder::new()
            .name("rigwatch-probe".into())
            .spawn(move || {
                let mut guard = backend.lock().unwrap_or_else(PoisonError::into_inner);
                let result = catch_unwind(AssertUnwindSafe(|| guard.query()))
                    .unwrap_or(Err(ProbeError::Panicked));
                // The receiver is gone if the owner shut down; drop the result.
                let _ = tx.send(result);
            })?;
        self.pending = Some(rx);
        Ok(())
    }
}

impl<T: Send + 'static> Backend for Deferred<T> {
    type Value = T;

    /// Initialization runs synchronously on the caller's thread. It fails
    /// with [`ProbeError::InFlight`] instead of waiting while a worker holds
    /// the backend.
    fn init(&mut self) -> Result<(), ProbeError> {
        let mut guard = match self.backend.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(ProbeError::InFlight),
        };
        guard.init()
    }

    fn query(&mut self) -> Result<T, ProbeError> {
        let mut ready = None;
        if let Some(rx) = &self.pending {
            match rx.try_recv() {
                Ok(result) => ready = Some(result),
                Err(TryRecvError::Empty) => return Err(ProbeError::InFlight),
                Err(TryRecvError::Disconnected) => ready = Some(Err(ProbeError::Panicked)),
            }
            self.pending = None;
        }

        if let Err(e) = self.spawn() {
            log::warn!("could not start background query: {e}");
            if ready.is_none() {
                return Err(e);
            }
        }
        ready.unwrap_or(Err(ProbeError::InFlight))
    }
}
