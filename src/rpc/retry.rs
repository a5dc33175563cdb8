//! Bounded retry with exponential backoff for idempotent reads, plus the
//! canned log messages each caller reports retries and exhaustion with.

use anyhow::{anyhow, Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_RETRY_ATTEMPTS: usize = 3;
pub const DEFAULT_RETRY_INITIAL_DELAY: Duration = Duration::from_millis(1_000);

macro_rules! log_with_retry_ctx {
    ($level:ident, $ctx:expr, $($rest:tt)*) => {{
        if let Some(subject) = $ctx.subject {
            tracing::$level!(subject = subject, $($rest)*);
        } else {
            tracing::$level!($($rest)*);
        }
    }};
}

/// Attempt budget and starting delay for one retried operation. The delay
/// doubles after every failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            initial_delay: DEFAULT_RETRY_INITIAL_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
        }
    }

    /// Pause taken after the failed attempt with 0-based index `attempt`:
    /// `initial_delay * 2^attempt`, saturating.
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let exponent = u32::try_from(attempt).unwrap_or(u32::MAX);
        let multiplier = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(multiplier)
    }
}

/// Log labels describing how a retried operation reports its attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryMessages {
    pub retry: &'static str,
    pub exhausted: &'static str,
}

pub const PROPOSAL_COUNT_RETRY: RetryMessages = RetryMessages {
    retry: "proposalCount call failed; retrying",
    exhausted: "proposalCount call exhausted retries",
};

pub const NAME_LOOKUP_RETRY: RetryMessages = RetryMessages {
    retry: "ENS reverse lookup failed; retrying",
    exhausted: "ENS reverse lookup exhausted retries",
};

/// Context handed to [`retry_with_backoff`]: log labels, an optional subject
/// (address, identifier) attached to every log line, and an optional
/// cancellation token that interrupts the backoff sleep.
#[derive(Debug, Clone, Copy)]
pub struct RetryContext<'a> {
    subject: Option<&'a str>,
    messages: &'a RetryMessages,
    cancellation: Option<&'a CancellationToken>,
}

impl<'a> RetryContext<'a> {
    pub fn new(messages: &'a RetryMessages) -> Self {
        Self {
            subject: None,
            messages,
            cancellation: None,
        }
    }

    pub fn with_subject(mut self, subject: &'a str) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn with_cancellation(mut self, token: &'a CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    fn log_retry(&self, attempt: usize, backoff: Duration, err: &Error) {
        let backoff_ms = duration_to_millis(backoff);
        log_with_retry_ctx!(
            warn,
            self,
            attempt,
            backoff_ms,
            error = %err,
            "{}",
            self.messages.retry
        );
    }

    fn log_exhausted(&self, attempt: usize, err: &Error) {
        log_with_retry_ctx!(error, self, attempt, error = %err, "{}", self.messages.exhausted);
    }
}

/// Runs `operation` up to `policy.max_attempts` times. After each failure it
/// sleeps `policy.delay_for_attempt(i)` and tries again; once the budget is
/// spent the last error is returned unchanged. No sleep follows the final
/// attempt.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    context: RetryContext<'_>,
    mut operation: F,
) -> Result<T>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if let Some(token) = context.cancellation {
            if token.is_cancelled() {
                return Err(anyhow!("retry cancelled"));
            }
        }

        attempt += 1;
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= max_attempts {
                    context.log_exhausted(attempt, &err);
                    return Err(err);
                }

                let backoff = policy.delay_for_attempt(attempt - 1);
                context.log_retry(attempt, backoff, &err);
                sleep_with_cancellation(backoff, context.cancellation).await?;
            }
        }
    }
}

async fn sleep_with_cancellation(
    delay: Duration,
    cancellation: Option<&CancellationToken>,
) -> Result<()> {
    if let Some(token) = cancellation {
        tokio::select! {
            _ = token.cancelled() => Err(anyhow!("retry cancelled")),
            _ = sleep(delay) => Ok(()),
        }
    } else {
        sleep(delay).await;
        Ok(())
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
