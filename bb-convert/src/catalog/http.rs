//! HTTP plumbing shared by the platform clients
//!
//! Every request goes through the same rate limiter, status mapping and
//! retry policy.

use super::{CatalogError, CatalogResult, HttpSettings, RetryPolicy};
use crate::models::Platform;
use governor::{Quota, RateLimiter};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::time::Duration;

/// Longest upstream error body kept in error messages
const MAX_ERROR_BODY: usize = 200;

type DirectRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

pub(crate) struct CatalogHttp {
    client: Client,
    platform: Platform,
    rate_limiter: DirectRateLimiter,
    retry: RetryPolicy,
}

impl CatalogHttp {
    pub(crate) fn new(platform: Platform, settings: &HttpSettings) -> CatalogResult<Self> {
        let client = Client::builder()
            .user_agent(bb_common::config::get_user_agent())
            .timeout(settings.request_timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| CatalogError::RemoteError(format!("Failed to build HTTP client: {}", e)))?;

        let per_second = NonZeroU32::new(settings.requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            platform,
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
            retry: settings.retry.clone(),
        })
    }

    /// Send a request, retrying transient failures
    ///
    /// `build` is called once per attempt. Non-2xx responses are mapped to
    /// [`CatalogError`].
    pub(crate) async fn send<F>(&self, operation: &str, build: F) -> CatalogResult<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let client = &self.client;
        let limiter = &self.rate_limiter;
        let build = &build;

        self.retry
            .run(operation, || async move {
                limiter.until_ready().await;
                let response = build(client).send().await?;
                check_status(response).await
            })
            .await
    }

    /// Send a request and decode its JSON body
    pub(crate) async fn json<T, F>(&self, operation: &str, build: F) -> CatalogResult<T>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let response = self.send(operation, build).await?;
        response.json::<T>().await.map_err(|e| {
            CatalogError::RemoteError(format!(
                "Unexpected {} response to {}: {}",
                self.platform.display_name(),
                operation,
                e
            ))
        })
    }
}

async fn check_status(response: Response) -> CatalogResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after);

    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string()
    } else {
        truncate(body.trim(), MAX_ERROR_BODY)
    };

    Err(CatalogError::from_status(status.as_u16(), message, retry_after))
}

/// `Retry-After` in delta-seconds form; HTTP dates are ignored
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
