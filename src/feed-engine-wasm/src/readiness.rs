use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;

/// Bounded exponential backoff for "wait until the host is ready" loops
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub initial_ms: f64,
    pub factor: f64,
    pub max_ms: f64,
    pub max_attempts: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial_ms: 50.0,
            factor: 2.0,
            max_ms: 2000.0,
            max_attempts: 10,
        }
    }
}

impl Backoff {
    /// Delays to wait between attempts, in order
    pub fn delays(&self) -> impl Iterator<Item = f64> {
        let Backoff {
            initial_ms,
            factor,
            max_ms,
            max_attempts,
        } = *self;
        (0..max_attempts).scan(initial_ms, move |delay, _| {
            let current = delay.min(max_ms);
            *delay = (*delay * factor).min(max_ms);
            Some(current)
        })
    }

    /// Sum of all delays, i.e. the longest a wait can take
    pub fn total_ms(&self) -> f64 {
        self.delays().sum()
    }
}

/// Shared cancellation flag for pending waits
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessError {
    #[error("wait cancelled")]
    Cancelled,
    #[error("gave up after {0} attempts")]
    TimedOut(u32),
}

/// Drives a readiness check through the backoff schedule.
///
/// `sleep` is the only suspension point, so the same loop works with a
/// browser timer or with an immediate future in tests.
pub async fn wait_until<P, S, F>(
    mut ready: P,
    backoff: Backoff,
    cancel: &CancelToken,
    sleep: S,
) -> Result<u32, ReadinessError>
where
    P: FnMut() -> bool,
    S: FnMut(f64) -> F,
    F: Future<Output = ()>,
{
    wait_until_async(|| std::future::ready(ready()), backoff, cancel, sleep).await
}

/// Like `wait_until`, for checks that are themselves asynchronous, such as
/// a fetch that is retried until it succeeds
pub async fn wait_until_async<P, R, S, F>(
    mut ready: P,
    backoff: Backoff,
    cancel: &CancelToken,
    mut sleep: S,
) -> Result<u32, ReadinessError>
where
    P: FnMut() -> R,
    R: Future<Output = bool>,
    S: FnMut(f64) -> F,
    F: Future<Output = ()>,
{
    if ready().await {
        return Ok(0);
    }

    for (attempt, delay) in backoff.delays().enumerate() {
        if cancel.is_cancelled() {
            return Err(ReadinessError::Cancelled);
        }
        sleep(delay).await;
        if cancel.is_cancelled() {
            return Err(ReadinessError::Cancelled);
        }
        if ready().await {
            return Ok(attempt as u32 + 1);
        }
    }

    Err(ReadinessError::TimedOut(backoff.max_attempts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::pin;
    use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

    fn noop_waker() -> Waker {
        fn clone(_: *const ()) -> RawWaker {
            RawWaker::new(std::ptr::null(), &VTABLE)
        }
        fn noop(_: *const ()) {}
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
        unsafe { Waker::from_raw(RawWaker::new(std::ptr::null(), &VTABLE)) }
    }

    /// Poll a future that never actually suspends
    fn block_on<F: Future>(future: F) -> F::Output {
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut future = pin!(future);
        loop {
            if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
                return output;
            }
        }
    }

    #[test]
    fn test_backoff_delays_are_bounded() {
        let backoff = Backoff {
            initial_ms: 100.0,
            factor: 2.0,
            max_ms: 500.0,
            max_attempts: 5,
        };
        let delays: Vec<f64> = backoff.delays().collect();
        assert_eq!(delays, vec![100.0, 200.0, 400.0, 500.0, 500.0]);
        assert_eq!(backoff.total_ms(), 1700.0);
    }

    #[test]
    fn test_wait_until_ready_after_attempts() {
        let mut checks = 0;
        let mut slept = Vec::new();
        let result = block_on(wait_until(
            || {
                checks += 1;
                checks == 3
            },
            Backoff::default(),
            &CancelToken::new(),
            |delay| {
                slept.push(delay);
                async {}
            },
        ));

        assert_eq!(result, Ok(2));
        assert_eq!(slept, vec![50.0, 100.0]);
    }

    #[test]
    fn test_wait_until_times_out() {
        let backoff = Backoff {
            max_attempts: 3,
            ..Default::default()
        };
        let result = block_on(wait_until(|| false, backoff, &CancelToken::new(), |_| async {}));
        assert_eq!(result, Err(ReadinessError::TimedOut(3)));
    }

    #[test]
    fn test_wait_until_cancelled() {
        let token = CancelToken::new();
        let canceller = token.clone();
        let result = block_on(wait_until(
            || false,
            Backoff::default(),
            &token,
            |_| {
                canceller.cancel();
                async {}
            },
        ));
        assert_eq!(result, Err(ReadinessError::Cancelled));
    }

    #[test]
    fn test_async_check_retried_until_it_succeeds() {
        let attempts = Cell::new(0);
        let result = block_on(wait_until_async(
            || {
                attempts.set(attempts.get() + 1);
                let done = attempts.get() == 4;
                async move { done }
            },
            Backoff::default(),
            &CancelToken::new(),
            |_| async {},
        ));

        assert_eq!(result, Ok(3));
        assert_eq!(attempts.get(), 4);
    }
}
