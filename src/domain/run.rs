use std::time::Duration;

use url::Url;

use crate::args::{GRACE_PERIOD_PADDING, HttpMethod, PositiveU64, PositiveUsize, TesterArgs};
use crate::error::{AppError, AppResult, ValidationError};

/// Validated, immutable description of one load-test run.
///
/// Built once before any request is issued and shared read-only (behind an
/// `Arc`) by the scheduler, executor and reporters.
#[derive(Debug, Clone)]
pub struct TestConfiguration {
    pub url: Url,
    pub total_requests: PositiveU64,
    pub concurrency: PositiveUsize,
    pub method: HttpMethod,
    pub body: Option<String>,
    pub headers: Vec<(String, String)>,
    pub request_timeout: Duration,
    pub keep_alive: bool,
    pub verify_tls: bool,
    pub batch_size: PositiveU64,
    pub cooldown: Duration,
    pub grace_period: Duration,
    pub retain_outcomes: bool,
}

impl TestConfiguration {
    /// A single-batch GET run with default timeouts.
    #[must_use]
    pub fn new(url: Url, total_requests: PositiveU64, concurrency: PositiveUsize) -> Self {
        let request_timeout = Duration::from_secs(30);
        Self {
            url,
            total_requests,
            concurrency,
            method: HttpMethod::Get,
            body: None,
            headers: Vec::new(),
            request_timeout,
            keep_alive: true,
            verify_tls: true,
            batch_size: total_requests,
            cooldown: Duration::ZERO,
            grace_period: request_timeout.saturating_add(GRACE_PERIOD_PADDING),
            retain_outcomes: false,
        }
    }

    /// Validates merged CLI/config arguments.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL is missing, malformed, not http(s), or
    /// has no host.
    pub fn from_args(args: &TesterArgs) -> AppResult<Self> {
        let raw_url = args
            .url
            .as_deref()
            .ok_or_else(|| AppError::validation(ValidationError::MissingUrl))?;
        let url = parse_target_url(raw_url)?;

        let grace_period = args.grace_period.unwrap_or_else(|| {
            args.request_timeout
                .saturating_add(GRACE_PERIOD_PADDING)
        });

        Ok(Self {
            url,
            total_requests: args.requests,
            concurrency: args.concurrency,
            method: args.method,
            body: args.body.clone(),
            headers: args.headers.clone(),
            request_timeout: args.request_timeout,
            keep_alive: !args.no_keep_alive,
            verify_tls: !args.no_verify_ssl,
            batch_size: args.batch_size.unwrap_or(args.requests),
            cooldown: args.cooldown,
            grace_period,
            retain_outcomes: args.csv.is_some(),
        })
    }

    /// `min(C, N)`: more workers than requests would only idle.
    #[must_use]
    pub fn effective_concurrency(&self) -> usize {
        let total = usize::try_from(self.total_requests.get()).unwrap_or(usize::MAX);
        self.concurrency.get().min(total)
    }

    #[must_use]
    pub fn effective_batch_size(&self) -> u64 {
        self.batch_size.get().min(self.total_requests.get())
    }
}

fn parse_target_url(raw: &str) -> AppResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|err| {
        AppError::validation(ValidationError::InvalidUrl {
            url: raw.to_owned(),
            source: err,
        })
    })?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(AppError::validation(ValidationError::UnsupportedScheme {
                scheme: other.to_owned(),
            }));
        }
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(AppError::validation(ValidationError::UrlMissingHost));
    }
    Ok(url)
}
