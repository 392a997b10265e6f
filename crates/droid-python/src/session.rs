//! Ownership of the process-wide interpreter
//!
//! [`ProcessClaim`] admits one bridge run per process at a time.
//! [`InterpreterSession`] stands for "the interpreter is initialized": it is
//! only constructed after a successful boot and its teardown finalizes the
//! interpreter exactly once, whichever way the run ends.

use crate::embedding::Embedding;
use crate::errors::BridgeError;
use droid_logger as logger;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};

static INTERPRETER_LIVE: AtomicBool = AtomicBool::new(false);

/// Exclusive right to drive the interpreter in this process
#[derive(Debug)]
pub struct ProcessClaim {
    _private: (),
}

impl ProcessClaim {
    pub fn acquire() -> Result<Self, BridgeError> {
        INTERPRETER_LIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| BridgeError::AlreadyRunning)?;
        Ok(Self { _private: () })
    }

    pub fn is_held() -> bool {
        INTERPRETER_LIVE.load(Ordering::Acquire)
    }
}

impl Drop for ProcessClaim {
    fn drop(&mut self) {
        INTERPRETER_LIVE.store(false, Ordering::Release);
    }
}

/// A booted interpreter; dropping it finalizes
pub struct InterpreterSession<'e, E: Embedding> {
    embedding: &'e mut E,
    finished: bool,
}

impl<'e, E: Embedding> InterpreterSession<'e, E> {
    /// Wrap an interpreter that has just been initialized
    pub fn begin(embedding: &'e mut E) -> Result<Self, BridgeError> {
        if !embedding.is_initialized() {
            return Err(BridgeError::Initialization(
                "interpreter reports it is not initialized".to_string(),
            ));
        }
        Ok(Self {
            embedding,
            finished: false,
        })
    }

    /// Drain any pending error and finalize
    pub fn finish(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        if let Some(pending) = self.embedding.take_pending_error() {
            logger::error("Python error pending at shutdown:");
            logger::traceback(&pending);
        }
        self.embedding.finalize();
        logger::info("Python interpreter finalized.");
    }
}

impl<E: Embedding> Deref for InterpreterSession<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        self.embedding
    }
}

impl<E: Embedding> DerefMut for InterpreterSession<'_, E> {
    fn deref_mut(&mut self) -> &mut E {
        self.embedding
    }
}

impl<E: Embedding> Drop for InterpreterSession<'_, E> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
pub(crate) fn serial() -> std::sync::MutexGuard<'static, ()> {
    static SERIAL: std::sync::Mutex<()> = std::sync::Mutex::new(());
    SERIAL.lock().unwrap_or_else(|e| e.into_inner())
}
