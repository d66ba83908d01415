//! Fixed-delay retry loop with cancellable waits.

use std::time::Duration;
use thiserror::Error;

use crate::shutdown::{Cancelled, ShutdownGate};

#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error("gave up after {attempts} attempt(s)")]
    Exhausted { attempts: u32, last: E },
}

/// Run `op` up to `attempts` times (at least once), sleeping `delay` between
/// attempts.
///
/// Every failure except the last is handed to `on_retry` together with its
/// 1-based attempt number and then swallowed. The last failure is returned
/// as [`RetryError::Exhausted`].
pub fn run_with_retry<T, E>(
    attempts: u32,
    delay: Duration,
    gate: &ShutdownGate,
    mut op: impl FnMut(u32) -> Result<T, E>,
    mut on_retry: impl FnMut(&E, u32),
) -> Result<T, RetryError<E>> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        gate.check()?;
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                on_retry(&e, attempt);
                gate.sleep(delay)?;
                attempt += 1;
            }
            Err(e) => return Err(RetryError::Exhausted { attempts, last: e }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_succeeds_after_transient_failures() {
        let gate = ShutdownGate::new();
        let mut observed = Vec::new();
        let result = run_with_retry(
            3,
            Duration::ZERO,
            &gate,
            |attempt| if attempt < 3 { Err("busy") } else { Ok(attempt) },
            |e, attempt| observed.push((*e, attempt)),
        );
        assert_eq!(result.unwrap(), 3);
        assert_eq!(observed, vec![("busy", 1), ("busy", 2)]);
    }

    #[test]
    fn test_last_failure_is_not_swallowed() {
        let gate = ShutdownGate::new();
        let mut observed = 0;
        let result: Result<(), _> =
            run_with_retry(2, Duration::ZERO, &gate, |_| Err("down"), |_, _| observed += 1);
        match result {
            Err(RetryError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 2);
                assert_eq!(last, "down");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(observed, 1);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let gate = ShutdownGate::new();
        let mut calls = 0;
        let _: Result<(), _> = run_with_retry(
            0,
            Duration::ZERO,
            &gate,
            |_| {
                calls += 1;
                Err(())
            },
            |_, _| {},
        );
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_cancelled_gate_stops_retrying() {
        let gate = ShutdownGate::new();
        gate.request();
        gate.request();
        let result: Result<(), RetryError<()>> =
            run_with_retry(5, Duration::from_secs(60), &gate, |_| Err(()), |_, _| {});
        assert!(matches!(result, Err(RetryError::Cancelled(Cancelled))));
    }
}
