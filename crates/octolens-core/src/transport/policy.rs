//! The single call wrapper applied to every remote call: concurrency limit,
//! status classification and fixed-delay retry.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::{HttpRequest, HttpResponse, Transport, classify};
use crate::error::{Error, Result};

/// Bounded attempt count with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub delay: Duration,
}

impl RetryPolicy {
    /// At least one attempt is always made.
    pub fn new(attempts: usize, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// Applies the retry policy and concurrency limiter around a [`Transport`].
///
/// Cloning shares the limiter, so every clone counts against the same permits.
#[derive(Debug, Clone)]
pub struct CallPolicy {
    retry: RetryPolicy,
    limiter: Arc<Semaphore>,
}

impl CallPolicy {
    /// Policy allowing at most `max_concurrent_requests` exchanges in flight.
    pub fn new(retry: RetryPolicy, max_concurrent_requests: usize) -> Self {
        Self {
            retry,
            limiter: Arc::new(Semaphore::new(max_concurrent_requests.max(1))),
        }
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Permits currently free in the limiter.
    pub fn available_permits(&self) -> usize {
        self.limiter.available_permits()
    }

    /// Issue the request, classify the response and retry transient failures.
    pub async fn execute(
        &self,
        transport: &dyn Transport,
        request: &HttpRequest,
    ) -> Result<HttpResponse> {
        self.execute_allowing(transport, request, &[]).await
    }

    /// Like [`execute`](Self::execute), but responses whose status is listed in
    /// `passthrough` are returned unclassified and never retried.
    pub async fn execute_allowing(
        &self,
        transport: &dyn Transport,
        request: &HttpRequest,
        passthrough: &[u16],
    ) -> Result<HttpResponse> {
        let mut attempt = 0_usize;
        loop {
            attempt += 1;
            let outcome = {
                // Held for the exchange only, never across the retry delay.
                let _permit = self
                    .limiter
                    .acquire()
                    .await
                    .map_err(|_| Error::Network("concurrency limiter closed".into()))?;
                debug!(method = ?request.method, url = %request.url, attempt, "remote call");
                transport.request(request).await
            };

            let outcome = match outcome {
                Ok(response) if passthrough.contains(&response.status) => Ok(response),
                Ok(response) => classify(response),
                Err(err) => Err(err),
            };

            match outcome {
                Err(err) if err.is_retryable() && attempt < self.retry.attempts => {
                    warn!(
                        url = %request.url,
                        attempt,
                        max_attempts = self.retry.attempts,
                        error = %err,
                        "remote call failed, retrying"
                    );
                    tokio::time::sleep(self.retry.delay).await;
                }
                other => return other,
            }
        }
    }
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self::new(RetryPolicy::default(), 10)
    }
}
