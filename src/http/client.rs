use std::time::Duration;

use reqwest::Client;
use reqwest::header::{CONNECTION, HeaderMap, HeaderName, HeaderValue};

use crate::args::{DEFAULT_USER_AGENT, HttpMethod};
use crate::domain::TestConfiguration;
use crate::error::{AppError, AppResult, HttpError};

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
        }
    }
}

/// Builds the shared client used by every request of a run.
///
/// # Errors
///
/// Returns an error when a configured header is invalid or the TLS backend
/// cannot be initialized.
pub fn build_client(config: &TestConfiguration) -> AppResult<Client> {
    let headers = build_headers(&config.headers, config.keep_alive)?;

    let mut client_builder = Client::builder()
        .timeout(config.request_timeout)
        .connect_timeout(config.request_timeout)
        .user_agent(DEFAULT_USER_AGENT)
        .default_headers(headers);

    if !config.keep_alive {
        client_builder = client_builder
            .pool_max_idle_per_host(0)
            .pool_idle_timeout(Some(Duration::from_secs(0)));
    }

    if !config.verify_tls {
        client_builder = client_builder
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true);
    }

    match client_builder.build() {
        Ok(client) => Ok(client),
        Err(err) => {
            tracing::error!("Failed to build HTTP client: {}", err);
            Err(AppError::http(HttpError::BuildClientFailed { source: err }))
        }
    }
}

pub(crate) fn build_headers(
    headers: &[(String, String)],
    keep_alive: bool,
) -> AppResult<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len().saturating_add(1));
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|err| {
            AppError::http(HttpError::InvalidHeaderName {
                header: key.clone(),
                source: err,
            })
        })?;
        let val = HeaderValue::from_str(value).map_err(|err| {
            AppError::http(HttpError::InvalidHeaderValue {
                header: key.clone(),
                source: err,
            })
        })?;
        map.append(name, val);
    }
    if !keep_alive {
        map.insert(CONNECTION, HeaderValue::from_static("close"));
    }
    Ok(map)
}
