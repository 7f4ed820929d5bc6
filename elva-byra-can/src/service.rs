//! Long lived mode: repeats the single-shot transfer, with a pause between cycles and a limit on
//! consecutive failures. The bridge itself knows nothing about either.

use log::{error, info};
use std::{fmt::Display, thread, time::Duration};

use crate::bridge::{CycleError, Transfer, WeightBridge};
use crate::can_channel::CanSender;
use crate::serial_channel::FrameSource;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Pause between two cycles.
    pub backoff: Duration,

    /// Consecutive failed cycles tolerated before giving up.
    pub retry: u8,
}

#[derive(Debug)]
pub enum ServiceError<E> {
    /// The serial source could not be opened.
    Open(E),

    /// Too many cycles in a row failed.
    RetryLimit { failures: u8, last: CycleError },
}

impl<E: std::error::Error + 'static> std::error::Error for ServiceError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Open(e) => Some(e),
            ServiceError::RetryLimit { last, .. } => Some(last),
        }
    }
}

impl<E: Display> Display for ServiceError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Open(e) => write!(f, "{e}"),
            ServiceError::RetryLimit { failures, last } => {
                write!(f, "giving up after {failures} failed cycles, last: {last}")
            }
        }
    }
}

/// Runs transfers until the retry limit is hit or the serial source can't be opened. `open` is
/// called once per cycle, so each transfer gets a fresh connection. Only returns on failure.
pub fn run<C, S, E, O, K>(
    bridge: &mut WeightBridge<C>,
    policy: &RetryPolicy,
    mut open: O,
    mut on_transfer: K,
) -> ServiceError<E>
where
    C: CanSender,
    S: FrameSource,
    O: FnMut() -> Result<S, E>,
    K: FnMut(&Transfer),
{
    let limit = policy.retry.max(1);
    let mut failures = 0;

    loop {
        let serial = match open() {
            Ok(s) => s,
            Err(e) => return ServiceError::Open(e),
        };

        match bridge.read_and_forward(serial) {
            Ok(transfer) => {
                failures = 0;
                on_transfer(&transfer);
            }
            Err(e) => {
                failures += 1;
                error!("Transfer failed ({}/{}): {}", failures, limit, e);

                if failures >= limit {
                    return ServiceError::RetryLimit { failures, last: e };
                }
            }
        }

        info!("Next transfer in {}s", policy.backoff.as_secs());
        thread::sleep(policy.backoff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::can_channel::{CanMessage, CanSendError};
    use std::{collections::VecDeque, io};

    struct Bytes(&'static [u8]);

    impl FrameSource for Bytes {
        fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            buf[..self.0.len()].copy_from_slice(self.0);
            Ok(self.0.len())
        }
    }

    #[derive(Default)]
    struct Counter(usize);

    impl CanSender for Counter {
        fn send(&mut self, _frame: &CanMessage) -> Result<(), CanSendError> {
            self.0 += 1;
            Ok(())
        }
    }

    fn policy(retry: u8) -> RetryPolicy {
        RetryPolicy {
            backoff: Duration::ZERO,
            retry,
        }
    }

    #[test]
    fn gives_up_after_consecutive_failures() {
        let mut bridge = WeightBridge::new(Counter::default());
        let mut opened = 0;

        let err = run(
            &mut bridge,
            &policy(3),
            || {
                opened += 1;
                Ok::<_, io::Error>(Bytes(b"XAAAAAAAAAA"))
            },
            |_| {},
        );

        assert!(matches!(err, ServiceError::RetryLimit { failures: 3, .. }));
        assert_eq!(opened, 3);
        assert_eq!(bridge.can().0, 0);
    }

    #[test]
    fn success_resets_failure_count() {
        let mut frames: VecDeque<&'static [u8]> = VecDeque::from(vec![
            &b"X"[..],
            &b"X"[..],
            &b"G........12"[..],
            &b"X"[..],
            &b"X"[..],
            &b"X"[..],
        ]);
        let mut bridge = WeightBridge::new(Counter::default());
        let mut transfers = vec![];

        let err = run(
            &mut bridge,
            &policy(3),
            || Ok::<_, io::Error>(Bytes(frames.pop_front().unwrap_or(&b"X"[..]))),
            |t| transfers.push(*t),
        );

        assert!(matches!(err, ServiceError::RetryLimit { .. }));
        assert!(frames.is_empty());
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].weight, 12);
        assert_eq!(bridge.can().0, 2);
    }

    #[test]
    fn open_failure_stops_immediately() {
        let mut bridge = WeightBridge::new(Counter::default());

        let err = run(
            &mut bridge,
            &policy(3),
            || Err::<Bytes, _>(io::Error::new(io::ErrorKind::NotFound, "unplugged")),
            |_| {},
        );

        assert!(matches!(err, ServiceError::Open(_)));
    }

    #[test]
    fn zero_retry_still_allows_one_attempt() {
        let mut bridge = WeightBridge::new(Counter::default());
        let mut opened = 0;

        let _ = run(
            &mut bridge,
            &policy(0),
            || {
                opened += 1;
                Ok::<_, io::Error>(Bytes(b"X"))
            },
            |_| {},
        );

        assert_eq!(opened, 1);
    }
}
