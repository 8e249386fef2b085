// core/src/foreground.rs
//! Registry of the application's foreground (UI) thread.
//!
//! Socket I/O with the daemon blocks for as long as the daemon takes to
//! answer, so calls are refused outright on the registered thread.

use crate::error::Error;
use std::sync::Mutex;
use std::thread::{self, ThreadId};

static FOREGROUND: Mutex<Option<ThreadId>> = Mutex::new(None);

/// Registers the calling thread as the foreground thread.
pub fn mark_current_thread() {
    let mut slot = FOREGROUND.lock().unwrap_or_else(|e| e.into_inner());
    *slot = Some(thread::current().id());
    log::debug!("Registered {:?} as the foreground thread", thread::current().id());
}

pub fn clear() {
    let mut slot = FOREGROUND.lock().unwrap_or_else(|e| e.into_inner());
    *slot = None;
}

pub fn is_foreground() -> bool {
    let slot = FOREGROUND.lock().unwrap_or_else(|e| e.into_inner());
    *slot == Some(thread::current().id())
}

pub(crate) fn ensure_background() -> Result<(), Error> {
    if is_foreground() {
        log::error!("Rejected daemon call issued from the foreground thread");
        return Err(Error::ForegroundCall);
    }
    Ok(())
}
