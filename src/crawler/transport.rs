//! HTTP transport
//!
//! This module handles all HTTP requests for the crawler:
//! - Building the shared HTTP client with user agent and timeouts
//! - Single GET requests that either yield a non-empty body or fail
//! - Retrying transient failures according to a `RetryPolicy`

use crate::config::CrawlerConfig;
use crate::crawler::retry::{classify_failure, RetryDecision, RetryPolicy};
use crate::FetchError;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches the body of `url` with a single GET request
///
/// Non-success statuses and empty bodies are failures, just like transport
/// errors.
pub async fn fetch_bytes(client: &Client, url: &Url) -> Result<Vec<u8>, FetchError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;

    if body.is_empty() {
        return Err(FetchError::EmptyBody {
            url: url.to_string(),
        });
    }

    Ok(body.to_vec())
}

/// Fetches `url`, retrying transient failures
///
/// # Returns
///
/// The body of the first successful attempt, or the error of the last one.
pub async fn fetch_with_retry(
    client: &Client,
    url: &Url,
    policy: &RetryPolicy,
) -> Result<Vec<u8>, FetchError> {
    let mut attempt = 1;
    loop {
        let error = match fetch_bytes(client, url).await {
            Ok(body) => return Ok(body),
            Err(e) => e,
        };

        match policy.should_retry(classify_failure(&error), attempt) {
            RetryDecision::Retry {
                delay,
                attempt: next,
            } => {
                tracing::warn!(
                    "Attempt {} for {} failed ({}), retrying in {:?}",
                    attempt,
                    url,
                    error,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt = next;
            }
            RetryDecision::DoNotRetry { reason } => {
                tracing::debug!("Giving up on {}: {}", error.url(), reason);
                return Err(error);
            }
        }
    }
}
