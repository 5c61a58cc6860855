//! Retrying file operations that hit a locked file.
//!
//! On Windows another process holding a file open makes copy, move, rename
//! and delete fail with a sharing violation. Those operations get a fixed
//! number of attempts with a short pause in between; nothing else is ever
//! retried.

use std::io;
use std::thread;
use std::time::Duration;

/// `ERROR_SHARING_VIOLATION`
const WIN_SHARING_VIOLATION: i32 = 32;
/// `ERROR_LOCK_VIOLATION`
const WIN_LOCK_VIOLATION: i32 = 33;

/// Whether `err` means "the file is in use by another process".
pub fn is_locked(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::ResourceBusy {
        return true;
    }
    cfg!(windows)
        && matches!(
            err.raw_os_error(),
            Some(WIN_SHARING_VIOLATION | WIN_LOCK_VIOLATION)
        )
}

/// Fixed-count retry schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Run `op`, retrying while it fails with a locked-file error.
    ///
    /// `on_retry(attempt, attempts)` is called before each pause, with the
    /// 1-based number of the attempt that just failed. Any other error, or
    /// the failure of the last attempt, is returned unchanged.
    pub fn run<T>(
        &self,
        mut op: impl FnMut() -> io::Result<T>,
        mut on_retry: impl FnMut(u32, u32),
    ) -> io::Result<T> {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if is_locked(&e) && attempt < self.attempts => {
                    tracing::debug!(attempt, "file in use: {}", e);
                    on_retry(attempt, self.attempts);
                    thread::sleep(self.delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            delay: Duration::ZERO,
        }
    }

    fn locked() -> io::Error {
        io::Error::new(io::ErrorKind::ResourceBusy, "file in use")
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 3);
        assert_eq!(policy.delay, Duration::from_millis(500));
    }

    #[test]
    fn test_success_needs_one_attempt() {
        let mut calls = 0;
        let result = instant().run(
            || {
                calls += 1;
                Ok(7)
            },
            |_, _| panic!("no retry expected"),
        );
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_lock_released_on_second_attempt() {
        let mut calls = 0;
        let mut retries = Vec::new();
        let result = instant().run(
            || {
                calls += 1;
                if calls == 1 { Err(locked()) } else { Ok("copied") }
            },
            |attempt, total| retries.push((attempt, total)),
        );
        assert_eq!(result.unwrap(), "copied");
        assert_eq!(calls, 2);
        assert_eq!(retries, vec![(1, 3)]);
    }

    #[test]
    fn test_never_released_fails_after_three_attempts() {
        let mut calls = 0;
        let mut retries = Vec::new();
        let result: io::Result<()> = instant().run(
            || {
                calls += 1;
                Err(locked())
            },
            |attempt, total| retries.push((attempt, total)),
        );
        let err = result.unwrap_err();
        assert!(is_locked(&err));
        assert_eq!(calls, 3);
        assert_eq!(retries, vec![(1, 3), (2, 3)]);
    }

    #[test]
    fn test_other_errors_are_not_retried() {
        let mut calls = 0;
        let result: io::Result<()> = instant().run(
            || {
                calls += 1;
                Err(io::Error::new(io::ErrorKind::NotFound, "missing"))
            },
            |_, _| panic!("no retry expected"),
        );
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_is_locked_classification() {
        assert!(is_locked(&locked()));
        assert!(!is_locked(&io::Error::new(
            io::ErrorKind::PermissionDenied,
            "denied"
        )));
        #[cfg(windows)]
        assert!(is_locked(&io::Error::from_raw_os_error(32)));
    }
}
