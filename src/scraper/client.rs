//! Blocking HTTP client with a politeness delay between requests and retries for transient failures.

use std::time::{Duration, Instant};
use tracing::{debug, warn};

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DELAY_SECS: u64 = 2;
const MAX_REDIRECTS: usize = 10;

/// Default number of attempts for get_with_retry (initial plus retries).
const DEFAULT_RETRY_COUNT: u32 = 3;
const DEFAULT_BACKOFF_SECS: [u64; 2] = [1, 2];
/// Backoff for HTTP 429: the site wants us gone for a while.
const BACKOFF_429_SECS: [u64; 4] = [30, 60, 90, 120];

/// Blocking HTTP client that enforces a delay between requests.
#[derive(Debug)]
pub struct PoliteClient {
    inner: reqwest::blocking::Client,
    delay: Duration,
    last_request: Option<Instant>,
    retry_count: u32,
    backoff_secs: Vec<u64>,
}

impl PoliteClient {
    /// Build a polite client with default User-Agent, timeout, delay and retries.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::builder().build()
    }

    pub fn builder() -> PoliteClientBuilder {
        PoliteClientBuilder::default()
    }

    /// Single GET without retries. Sleeps until the configured delay has passed since the last request.
    pub fn get(&mut self, url: &str) -> Result<reqwest::blocking::Response, reqwest::Error> {
        self.wait_delay();
        let result = self.inner.get(url).send();
        self.last_request = Some(Instant::now());
        result
    }

    /// GET with retries for timeouts, connection errors, HTTP 5xx and HTTP 429.
    ///
    /// Other statuses (including 4xx) are returned as a response for the caller to inspect.
    /// The final attempt's outcome is returned as-is.
    pub fn get_with_retry(
        &mut self,
        url: &str,
    ) -> Result<reqwest::blocking::Response, reqwest::Error> {
        let max_attempts = self.retry_count.max(1);
        let mut attempt = 0;
        loop {
            let result = self.get(url);
            attempt += 1;
            if attempt >= max_attempts {
                return result;
            }
            let retry_after = match &result {
                Ok(response) if response.status().as_u16() == 429 => {
                    Some(backoff_for(&BACKOFF_429_SECS, attempt, 60))
                }
                Ok(response) if response.status().is_server_error() => {
                    Some(backoff_for(&self.backoff_secs, attempt, 1))
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    Some(backoff_for(&self.backoff_secs, attempt, 1))
                }
                _ => None,
            };
            let Some(backoff) = retry_after else {
                return result;
            };
            match &result {
                Ok(response) => warn!(
                    url,
                    status = response.status().as_u16(),
                    attempt,
                    backoff_secs = backoff,
                    "retrying"
                ),
                Err(e) => warn!(url, error = %e, attempt, backoff_secs = backoff, "retrying"),
            }
            std::thread::sleep(Duration::from_secs(backoff));
        }
    }

    fn wait_delay(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                let remaining = self.delay - elapsed;
                debug!(wait_ms = remaining.as_millis() as u64, "politeness delay");
                std::thread::sleep(remaining);
            }
        }
    }
}

/// Backoff after the `attempt`-th (1-based) failure; the last entry is reused when the list is short.
fn backoff_for(schedule: &[u64], attempt: u32, fallback: u64) -> u64 {
    let index = attempt.saturating_sub(1) as usize;
    schedule
        .get(index)
        .or_else(|| schedule.last())
        .copied()
        .unwrap_or(fallback)
}

/// Builder for PoliteClient with optional User-Agent, delay, timeout, and retry settings.
#[derive(Debug)]
pub struct PoliteClientBuilder {
    user_agent: Option<String>,
    delay_secs: u64,
    timeout_secs: u64,
    retry_count: u32,
    retry_backoff_secs: Vec<u64>,
}

impl Default for PoliteClientBuilder {
    fn default() -> Self {
        Self {
            user_agent: None,
            delay_secs: DEFAULT_DELAY_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry_count: DEFAULT_RETRY_COUNT,
            retry_backoff_secs: DEFAULT_BACKOFF_SECS.to_vec(),
        }
    }
}

impl PoliteClientBuilder {
    /// Set a custom User-Agent. If not set, a browser-like default is used.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Delay between requests in seconds. Default 2.
    pub fn delay_secs(mut self, secs: u64) -> Self {
        self.delay_secs = secs;
        self
    }

    /// Request timeout in seconds. Default 30.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Number of HTTP attempts for transient failures (default 3, minimum 1).
    pub fn retry_count(mut self, n: u32) -> Self {
        self.retry_count = n.max(1);
        self
    }

    /// Backoff delays in seconds before each retry (e.g. [1, 2, 4]). If shorter than
    /// retry_count - 1, the last value is reused; if empty, doubling from 1s is used.
    pub fn retry_backoff_secs(mut self, secs: Vec<u64>) -> Self {
        self.retry_backoff_secs = secs;
        self
    }

    pub fn build(self) -> Result<PoliteClient, reqwest::Error> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let inner = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .user_agent(user_agent)
            .timeout(Duration::from_secs(self.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        let backoff_secs = if self.retry_backoff_secs.is_empty() {
            let n = self.retry_count.saturating_sub(1) as usize;
            (0..n).map(|i| 1u64 << i.min(4)).collect::<Vec<_>>()
        } else {
            self.retry_backoff_secs
        };
        Ok(PoliteClient {
            inner,
            delay: Duration::from_secs(self.delay_secs),
            last_request: None,
            retry_count: self.retry_count,
            backoff_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_reuses_last_value() {
        assert_eq!(backoff_for(&[1, 2], 1, 9), 1);
        assert_eq!(backoff_for(&[1, 2], 2, 9), 2);
        assert_eq!(backoff_for(&[1, 2], 5, 9), 2);
        assert_eq!(backoff_for(&[], 1, 9), 9);
    }

    #[test]
    fn empty_backoff_doubles_from_one() -> Result<(), reqwest::Error> {
        let client = PoliteClient::builder()
            .retry_count(4)
            .retry_backoff_secs(Vec::new())
            .build()?;
        assert_eq!(client.backoff_secs, vec![1, 2, 4]);
        assert_eq!(client.retry_count, 4);
        Ok(())
    }

    #[test]
    fn retry_count_has_floor_of_one() -> Result<(), reqwest::Error> {
        let client = PoliteClient::builder().retry_count(0).build()?;
        assert_eq!(client.retry_count, 1);
        Ok(())
    }

    #[test]
    fn builder_applies_delay() -> Result<(), reqwest::Error> {
        let client = PoliteClient::builder().delay_secs(7).build()?;
        assert_eq!(client.delay, Duration::from_secs(7));
        assert!(client.last_request.is_none());
        Ok(())
    }
}
