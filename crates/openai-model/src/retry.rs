use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use pg_chat_model::ChatCompletion;
use serde_json::Value;
use tokio::time::sleep;

use crate::Error;
use crate::transport::Transport;

/// An exponential backoff with randomized intervals, clamped to
/// `[min, max]`.
///
/// Intervals start around `min` and double after each attempt. The
/// randomization keeps clients that failed together from retrying in
/// lockstep.
pub struct RandomExponential {
    inner: ExponentialBackoff,
    min: Duration,
    max: Duration,
}

impl RandomExponential {
    /// Creates a backoff bounded by `min` and `max`.
    pub fn new(min: Duration, max: Duration) -> Self {
        let max = max.max(min);
        let inner = ExponentialBackoff {
            current_interval: min,
            initial_interval: min,
            multiplier: 2.0,
            max_interval: max,
            // The attempt budget decides when to stop, not the elapsed time.
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        };
        Self { inner, min, max }
    }
}

impl Backoff for RandomExponential {
    fn reset(&mut self) {
        self.inner.reset();
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.inner
            .next_backoff()
            .map(|interval| interval.clamp(self.min, self.max))
    }
}

/// Posts `body` until an attempt succeeds or `max_attempts` attempts have
/// been made, sleeping for the intervals `backoff` yields in between.
///
/// `backoff` yielding `None` ends the retries early.
pub(crate) async fn send_with_retry<T: Transport>(
    transport: &T,
    body: &Value,
    max_attempts: u32,
    backoff: &mut (dyn Backoff + Send),
) -> Result<ChatCompletion, Error> {
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let err = match transport.post(body).await {
            Ok(completion) => {
                debug!("request succeeded after {attempt} attempt(s)");
                return Ok(completion);
            }
            Err(err) => err,
        };

        if attempt >= max_attempts {
            error!("giving up after {attempt} attempt(s): {err}");
            return Err(Error::connection(err, attempt));
        }
        let Some(delay) = backoff.next_backoff() else {
            error!("backoff stopped after {attempt} attempt(s): {err}");
            return Err(Error::connection(err, attempt));
        };

        warn!(
            "attempt {attempt}/{max_attempts} failed: {err}, retrying in \
             {delay:?}"
        );
        sleep(delay).await;
    }
}
