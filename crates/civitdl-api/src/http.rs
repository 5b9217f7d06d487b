//! HTTP backend abstraction and the retrying fetcher.
//!
//! `Fetcher` performs one logical request with bounded exponential backoff.
//! Catalog calls go through the `HttpBackend` trait so the client can be
//! tested against canned JSON; downloads call [`Fetcher::open`] directly to
//! stream the body.

use std::time::Duration;

use async_trait::async_trait;
use civitdl_core::RetryPolicy;
use reqwest::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::CatalogClientConfig;
use crate::error::{ApiError, ApiResult, body_sample};

// ============================================================================
// HTTP Backend Trait
// ============================================================================

/// JSON GET used by the catalog client.
///
/// Callers outside this crate go through `CatalogPort`.
#[async_trait]
pub trait HttpBackend: Send + Sync {
    /// GET `url` and decode the body as `T`.
    async fn get_json<T: DeserializeOwned + Send>(&self, url: &Url) -> ApiResult<T>;
}

// ============================================================================
// Retry classification
// ============================================================================

/// Statuses worth another attempt.
fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}

fn is_unauthorized(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

/// What a successful attempt hands back.
enum Received {
    /// Headers read, body still on the wire.
    Response(Response),
    /// Body read in full within the attempt.
    Body(Vec<u8>),
}

// ============================================================================
// Fetcher
// ============================================================================

/// `reqwest` backend with retries and the API key header.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    retry: RetryPolicy,
    api_key: Option<String>,
}

impl Fetcher {
    pub fn new(config: &CatalogClientConfig) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            retry: config.retry,
            api_key: config.api_key.clone(),
        })
    }

    pub const fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// GET `url` with authentication and retry; returns the 200 response
    /// with its body unread.
    pub async fn open(&self, url: &str) -> ApiResult<Response> {
        self.execute(self.get_request(url)?).await
    }

    /// Run `request` under the retry policy.
    ///
    /// Each attempt sends a clone of `request`. When the body cannot be
    /// cloned (a streaming body) the request is sent exactly once.
    pub async fn execute(&self, request: Request) -> ApiResult<Response> {
        match self.send(request, false).await? {
            Received::Response(response) => Ok(response),
            Received::Body(_) => Err(ApiError::InvalidResponse {
                message: "response body was consumed".to_string(),
            }),
        }
    }

    /// GET `url` and read the whole body. A failed body read counts as a
    /// failed attempt.
    pub async fn get_bytes(&self, url: &str) -> ApiResult<Vec<u8>> {
        match self.send(self.get_request(url)?, true).await? {
            Received::Body(bytes) => Ok(bytes),
            Received::Response(response) => Ok(response.bytes().await?.to_vec()),
        }
    }

    fn get_request(&self, url: &str) -> ApiResult<Request> {
        let url = Url::parse(url)?;
        let mut builder = self.client.get(url);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }
        Ok(builder.build()?)
    }

    async fn send(&self, request: Request, read_body: bool) -> ApiResult<Received> {
        let url = request.url().to_string();
        let attempts = if request.try_clone().is_some() {
            self.retry.attempts()
        } else {
            tracing::warn!(
                target: "civitdl.api",
                url = %url,
                "request body is not restartable; sending once without retries"
            );
            1
        };

        let mut pending = Some(request);
        let mut last_error: Option<ApiError> = None;

        for attempt in 1..=attempts {
            let current = if attempt < attempts {
                pending.as_ref().and_then(Request::try_clone)
            } else {
                pending.take()
            };
            let Some(current) = current else {
                break;
            };

            tracing::debug!(target: "civitdl.api", url = %url, attempt, attempts, "GET");

            match self.client.execute(current).await {
                Ok(response) => {
                    let status = response.status();
                    tracing::debug!(
                        target: "civitdl.api",
                        url = %url,
                        attempt,
                        status = status.as_u16(),
                        "response"
                    );

                    if status == StatusCode::OK {
                        if !read_body {
                            return Ok(Received::Response(response));
                        }
                        match response.bytes().await {
                            Ok(bytes) => return Ok(Received::Body(bytes.to_vec())),
                            Err(e) if attempt < attempts => {
                                let delay = self.retry.delay_after(attempt);
                                tracing::warn!(
                                    target: "civitdl.api",
                                    url = %url,
                                    attempt,
                                    delay_ms = duration_ms(delay),
                                    error = %e,
                                    "body read failed, backing off"
                                );
                                last_error = Some(e.into());
                                tokio::time::sleep(delay).await;
                                continue;
                            }
                            Err(e) => return Err(e.into()),
                        }
                    }

                    if is_unauthorized(status) {
                        return Err(ApiError::Unauthorized {
                            status: status.as_u16(),
                            url,
                        });
                    }

                    if is_retryable(status) && attempt < attempts {
                        let delay = self.retry.delay_after(attempt);
                        tracing::warn!(
                            target: "civitdl.api",
                            url = %url,
                            status = status.as_u16(),
                            attempt,
                            delay_ms = duration_ms(delay),
                            "retryable status, backing off"
                        );
                        last_error = Some(ApiError::Status {
                            status: status.as_u16(),
                            url: url.clone(),
                            body: String::new(),
                        });
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        return Err(ApiError::RateLimited {
                            attempts: attempt,
                            url,
                        });
                    }

                    let body = response.text().await.unwrap_or_default();
                    return Err(ApiError::Status {
                        status: status.as_u16(),
                        url,
                        body: body_sample(&body),
                    });
                }
                Err(e) => {
                    if attempt < attempts {
                        let delay = self.retry.delay_after(attempt);
                        tracing::warn!(
                            target: "civitdl.api",
                            url = %url,
                            attempt,
                            delay_ms = duration_ms(delay),
                            error = %e,
                            "transport error, backing off"
                        );
                        last_error = Some(e.into());
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ApiError::InvalidResponse {
            message: "no attempt was made".to_string(),
        }))
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn duration_ms(d: Duration) -> u64 {
    d.as_millis() as u64
}

#[async_trait]
impl HttpBackend for Fetcher {
    async fn get_json<T: DeserializeOwned + Send>(&self, url: &Url) -> ApiResult<T> {
        let bytes = self.get_bytes(url.as_str()).await?;
        let data: T = serde_json::from_slice(&bytes)?;
        Ok(data)
    }
}

// ============================================================================
// Fake Backend for Testing
// ============================================================================

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Canned result for the fake backend.
    #[derive(Clone)]
    pub enum Canned {
        Json(serde_json::Value),
        Status(u16),
    }

    /// Canned responses for catalog tests; unmatched URLs get a 404.
    ///
    /// Patterns are matched against the full URL in insertion order; the
    /// first pattern contained in the URL wins.
    #[derive(Default)]
    pub struct FakeBackend {
        responses: Vec<(String, Canned)>,
        requested: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_json(mut self, url_contains: &str, json: serde_json::Value) -> Self {
            self.responses
                .push((url_contains.to_string(), Canned::Json(json)));
            self
        }

        pub fn with_status(mut self, url_contains: &str, status: u16) -> Self {
            self.responses
                .push((url_contains.to_string(), Canned::Status(status)));
            self
        }

        /// URLs requested so far.
        pub fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }

        fn find_response(&self, url: &str) -> Option<Canned> {
            self.responses
                .iter()
                .find(|(pattern, _)| url.contains(pattern.as_str()))
                .map(|(_, canned)| canned.clone())
        }
    }

    #[async_trait]
    impl HttpBackend for FakeBackend {
        async fn get_json<T: DeserializeOwned + Send>(&self, url: &Url) -> ApiResult<T> {
            self.requested.lock().unwrap().push(url.to_string());
            match self.find_response(url.as_str()) {
                Some(Canned::Json(json)) => serde_json::from_value(json).map_err(Into::into),
                Some(Canned::Status(status)) if status == 401 || status == 403 => {
                    Err(ApiError::Unauthorized {
                        status,
                        url: url.to_string(),
                    })
                }
                Some(Canned::Status(429)) => Err(ApiError::RateLimited {
                    attempts: 1,
                    url: url.to_string(),
                }),
                Some(Canned::Status(status)) => Err(ApiError::Status {
                    status,
                    url: url.to_string(),
                    body: String::new(),
                }),
                None => Err(ApiError::Status {
                    status: 404,
                    url: url.to_string(),
                    body: String::new(),
                }),
            }
        }
    }
}
