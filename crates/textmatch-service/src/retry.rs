use std::time::Duration;

use textmatch_core::config::BackendSettings;
use textmatch_core::error::{Error, Result};

/// Timeout and retry budget for a blocking backend call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_on_timeout: bool,
    pub backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&BackendSettings::default())
    }
}

impl From<&BackendSettings> for RetryPolicy {
    fn from(settings: &BackendSettings) -> Self {
        Self {
            timeout: settings.timeout(),
            max_retries: settings.max_retries,
            retry_on_timeout: settings.retry_on_timeout,
            backoff: Duration::from_millis(settings.backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
        }
    }
}

impl RetryPolicy {
    /// Same timeout, single attempt. Used for startup checks.
    pub fn once(&self) -> Self {
        Self { max_retries: 0, retry_on_timeout: false, ..self.clone() }
    }

    /// Run `call` on the blocking pool, retrying timeouts (when enabled) and
    /// transient unavailability with exponential backoff plus jitter.
    ///
    /// Any other backend error is returned on first occurrence. Exhausting the
    /// budget yields `Error::BackendUnavailable`.
    pub async fn run<T, F>(&self, op: &str, call: F) -> Result<T>
    where
        T: Send + 'static,
        F: Fn() -> anyhow::Result<T> + Clone + Send + 'static,
    {
        let mut delay = self.backoff;
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let task = tokio::task::spawn_blocking(call.clone());
            let failure = match tokio::time::timeout(self.timeout, task).await {
                Ok(Ok(Ok(value))) => return Ok(value),
                Ok(Ok(Err(err))) => match classify(err) {
                    Error::BackendUnavailable(cause) => cause,
                    other => return Err(other),
                },
                Ok(Err(join_err)) => return Err(Error::Operation(format!("{op}: backend task failed: {join_err}"))),
                Err(_) if self.retry_on_timeout => format!("timed out after {:?}", self.timeout),
                Err(_) => return Err(Error::BackendUnavailable(format!("{op}: timed out after {:?}", self.timeout))),
            };

            if attempt > self.max_retries {
                return Err(Error::BackendUnavailable(format!("{op}: {failure} (gave up after {attempt} attempts)")));
            }
            tracing::warn!(op, attempt, %failure, "backend call failed, retrying");
            let jitter = Duration::from_millis(rand::random::<u64>() % 50);
            tokio::time::sleep(delay + jitter).await;
            delay = (delay * 2).min(self.max_backoff);
        }
    }
}

/// Backends report typed failures through `anyhow`; anything untyped is a plain backend error.
fn classify(err: anyhow::Error) -> Error {
    err.downcast::<Error>().unwrap_or_else(|other| Error::Backend(format!("{other:#}")))
}
