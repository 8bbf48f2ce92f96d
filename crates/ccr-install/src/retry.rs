//! Bounded retry with a fixed backoff.

use crate::interrupt::Interrupt;
use std::time::Duration;
use tracing::{debug, warn};

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Why a retried operation gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The last error, after `attempts` tries.
    Failed { attempts: u32, last: E },
    /// The interrupt flag was raised between attempts.
    Interrupted,
}

/// Fixed-backoff retry policy. `attempts` counts the first try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number.
    pub fn run<T, E, F>(&self, interrupt: &Interrupt, mut op: F) -> Result<T, RetryError<E>>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut(u32) -> Result<T, E>,
    {
        let mut attempt = 1;
        loop {
            if interrupt.is_set() {
                return Err(RetryError::Interrupted);
            }
            debug!(attempt, max = self.attempts, "starting attempt");
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() || attempt >= self.attempts => {
                    return Err(RetryError::Failed {
                        attempts: attempt,
                        last: err,
                    });
                }
                Err(err) => {
                    warn!(
                        "attempt {}/{} failed: {}; retrying in {}s",
                        attempt,
                        self.attempts,
                        err,
                        self.backoff.as_secs()
                    );
                    if interrupt.is_set() {
                        return Err(RetryError::Interrupted);
                    }
                    std::thread::sleep(self.backoff);
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Flaky {
        retryable: bool,
    }

    impl fmt::Display for Flaky {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "flaky")
        }
    }

    impl Retryable for Flaky {
        fn is_retryable(&self) -> bool {
            self.retryable
        }
    }

    fn quick(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::ZERO)
    }

    #[test]
    fn test_succeeds_after_transient_failures() {
        let interrupt = Interrupt::new();
        let mut calls = 0;
        let result = quick(3).run(&interrupt, |attempt| {
            calls += 1;
            if attempt < 3 {
                Err(Flaky { retryable: true })
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let interrupt = Interrupt::new();
        let mut calls = 0;
        let result: Result<(), _> = quick(3).run(&interrupt, |_| {
            calls += 1;
            Err(Flaky { retryable: true })
        });
        assert!(matches!(result, Err(RetryError::Failed { attempts: 3, .. })));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_permanent_error_stops_early() {
        let interrupt = Interrupt::new();
        let mut calls = 0;
        let result: Result<(), _> = quick(3).run(&interrupt, |_| {
            calls += 1;
            Err(Flaky { retryable: false })
        });
        assert!(matches!(result, Err(RetryError::Failed { attempts: 1, .. })));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_interrupt_stops_before_next_attempt() {
        let interrupt = Interrupt::new();
        let flag = interrupt.clone();
        let mut calls = 0;
        let result: Result<(), _> = quick(3).run(&interrupt, |_| {
            calls += 1;
            flag.set();
            Err(Flaky { retryable: true })
        });
        assert!(matches!(result, Err(RetryError::Interrupted)));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.attempts(), 1);
        assert_eq!(RetryPolicy::default().backoff(), Duration::from_secs(2));
    }
}
