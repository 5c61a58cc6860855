//! Ctrl+C handling.
//!
//! The console never lets SIGINT terminate the process. A `ctrlc` handler
//! flips a shared flag instead; the failure boundary turns a raised flag into
//! an "interrupted" notice, and repeating handlers poll it between iterations
//! (see [`Interrupt::sleep`]).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::{Error, Result};

/// Granularity of interruptible sleeps.
const SLICE: Duration = Duration::from_millis(50);

/// Shared interrupt flag, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
}

impl Interrupt {
    /// Create a flag that nothing raises except [`Interrupt::trigger`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a flag raised by the process's Ctrl+C handler.
    ///
    /// Can only succeed once per process.
    pub fn install() -> Result<Self> {
        let interrupt = Self::new();
        let flag = Arc::clone(&interrupt.flag);
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        })
        .map_err(|e| Error::Other(format!("failed to install Ctrl+C handler: {}", e)))?;
        Ok(interrupt)
    }

    /// Raise the flag.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether the flag is raised.
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Lower the flag, returning whether it was raised.
    pub fn take(&self) -> bool {
        self.flag.swap(false, Ordering::SeqCst)
    }

    /// Fail with [`Error::Interrupted`] if the flag is raised.
    ///
    /// The flag stays raised so the failure boundary still sees it.
    pub fn check(&self) -> Result<()> {
        if self.is_set() {
            Err(Error::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration`, waking early with [`Error::Interrupted`] once
    /// the flag is raised.
    ///
    /// A duration too large for the clock sleeps until interrupted.
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        let deadline = Instant::now().checked_add(duration);
        loop {
            self.check()?;
            let now = Instant::now();
            match deadline {
                Some(deadline) if now >= deadline => return Ok(()),
                Some(deadline) => thread::sleep(SLICE.min(deadline - now)),
                None => thread::sleep(SLICE),
            }
        }
    }
}
