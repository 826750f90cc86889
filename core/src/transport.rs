//! Blocking HTTP execution with connection-level retries.
//!
//! # Design
//! `Transport` owns a single `ureq::Agent`, so connections are pooled across
//! calls and the agent can be shared between threads. Status codes are
//! returned as data (`http_status_as_error(false)`); interpreting them is
//! the client's job. Redirects are not followed, so a 3xx reaches the status
//! check too. Bodies are read as raw bytes with no size cap. Only failures
//! to establish a connection are retried. Once the request is on the wire a
//! timeout or error is final, and any HTTP response, 5xx included, is
//! returned as-is.

use std::fmt;
use std::io::ErrorKind;
use std::thread;
use std::time::Duration;

use crate::config::ValidatedConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub struct Transport {
    agent: ureq::Agent,
    retries: u32,
    retry_backoff: Duration,
}

impl Transport {
    pub(crate) fn new(config: &ValidatedConfig) -> Self {
        let timeout = Some(config.timeout);
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .timeout_connect(timeout)
            .timeout_send_request(timeout)
            .timeout_recv_response(timeout)
            .timeout_recv_body(timeout)
            .build()
            .new_agent();

        Self {
            agent,
            retries: config.retries,
            retry_backoff: config.retry_backoff,
        }
    }

    /// Execute `request`, re-attempting connection failures up to `retries`
    /// times.
    pub fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.attempt(request) {
                Ok(response) => return Ok(response),
                Err(source) if is_connect_failure(&source) && attempts <= self.retries => {
                    let delay = backoff_delay(self.retry_backoff, attempts);
                    tracing::warn!(
                        url = %request.url,
                        attempt = attempts,
                        retries = self.retries,
                        ?delay,
                        error = %source,
                        "connection failed, retrying"
                    );
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                }
                Err(source) => return Err(ApiError::TransportError { attempts, source }),
            }
        }
    }

    fn attempt(&self, request: &HttpRequest) -> Result<HttpResponse, ureq::Error> {
        let mut builder = match request.method {
            HttpMethod::Get => self.agent.get(&request.url),
        };
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        let mut response = builder.call()?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                let value = v.to_str().unwrap_or_default();
                (k.as_str().to_string(), value.to_string())
            })
            .collect();
        let body = response.body_mut().with_config().limit(u64::MAX).read_to_vec()?;

        Ok(HttpResponse { status, headers, body })
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("retries", &self.retries)
            .field("retry_backoff", &self.retry_backoff)
            .finish_non_exhaustive()
    }
}

/// Whether `err` happened before a connection was established.
fn is_connect_failure(err: &ureq::Error) -> bool {
    match err {
        ureq::Error::ConnectionFailed | ureq::Error::HostNotFound => true,
        ureq::Error::Timeout(ureq::Timeout::Connect | ureq::Timeout::Resolve) => true,
        ureq::Error::Io(e) => matches!(
            e.kind(),
            ErrorKind::ConnectionRefused
                | ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::NotConnected
                | ErrorKind::AddrNotAvailable
        ),
        _ => false,
    }
}

/// Delay before the retry that follows failed attempt number `attempt`:
/// nothing after the first failure, then `backoff`, `2 * backoff`, ...
fn backoff_delay(backoff: Duration, attempt: u32) -> Duration {
    if attempt <= 1 {
        return Duration::ZERO;
    }
    let factor = 1u32 << (attempt - 2).min(16);
    backoff.saturating_mul(factor)
}
