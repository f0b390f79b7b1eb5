use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::time::Instant;
use url::Url;

use crate::domain::TestConfiguration;
use crate::metrics::{ErrorKind, Exchange, RequestOutcome};

use super::classify::classify_error;

/// One request/response exchange against the target.
///
/// Implementations never fail: transport problems are reported as
/// [`Exchange::Failure`]. Timing and the overall timeout are applied by
/// [`RequestExecutor`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn exchange(&self) -> Exchange;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    method: reqwest::Method,
    url: Url,
    body: Option<String>,
}

impl HttpTransport {
    #[must_use]
    pub fn new(client: Client, config: &TestConfiguration) -> Self {
        Self {
            client,
            method: config.method.into(),
            url: config.url.clone(),
            body: config.body.clone(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn exchange(&self) -> Exchange {
        let mut request = self.client.request(self.method.clone(), self.url.clone());
        if let Some(body) = self.body.as_ref() {
            request = request.body(body.clone());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                let kind = classify_error(&err);
                tracing::debug!("Request failed ({}): {}", kind, err);
                return Exchange::Failure(kind);
            }
        };

        let status = response.status().as_u16();
        match drain_response_body(response).await {
            Ok(bytes) => Exchange::Response { status, bytes },
            Err(err) => {
                let kind = classify_error(&err);
                tracing::debug!("Reading response body failed ({}): {}", kind, err);
                Exchange::Failure(kind)
            }
        }
    }
}

async fn drain_response_body(response: reqwest::Response) -> Result<u64, reqwest::Error> {
    let mut stream = response.bytes_stream();
    let mut total_bytes: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let bytes = chunk?;
        total_bytes = total_bytes.saturating_add(u64::try_from(bytes.len()).unwrap_or(u64::MAX));
    }
    Ok(total_bytes)
}

pub(crate) struct InflightGuard<'counter> {
    counter: &'counter AtomicU64,
}

impl<'counter> InflightGuard<'counter> {
    pub(crate) fn acquire(counter: &'counter Arc<AtomicU64>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self {
            counter: counter.as_ref(),
        }
    }
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        loop {
            let current = self.counter.load(Ordering::Relaxed);
            let Some(next) = current.checked_sub(1) else {
                break;
            };
            if self
                .counter
                .compare_exchange(current, next, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }
        }
    }
}

/// Issues single requests, timing each one against the run start.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    timeout: Duration,
    run_start: Instant,
    in_flight: Arc<AtomicU64>,
}

impl RequestExecutor {
    #[must_use]
    pub const fn new(
        transport: Arc<dyn Transport>,
        timeout: Duration,
        run_start: Instant,
        in_flight: Arc<AtomicU64>,
    ) -> Self {
        Self {
            transport,
            timeout,
            run_start,
            in_flight,
        }
    }

    /// Requests currently between issue and completion.
    #[must_use]
    pub fn in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub async fn execute(&self, sequence: u64) -> RequestOutcome {
        let _in_flight = InflightGuard::acquire(&self.in_flight);
        let issued_at = Utc::now();
        let start = Instant::now();

        let exchange = match tokio::time::timeout(self.timeout, self.transport.exchange()).await {
            Ok(exchange) => exchange,
            Err(_elapsed) => Exchange::Failure(ErrorKind::Timeout),
        };

        RequestOutcome {
            sequence,
            offset: start.saturating_duration_since(self.run_start),
            issued_at,
            latency: start.elapsed(),
            exchange,
        }
    }
}
