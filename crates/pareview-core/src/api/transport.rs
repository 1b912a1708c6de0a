//! The dispatch seam underneath [`ApiClient`](super::ApiClient).
//!
//! `HttpTransport` talks to the backend over reqwest; tests substitute a
//! scripted fake that records what the client sent.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use tracing::debug;

use super::{ApiError, ApiRequest, ApiResponse};

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Dispatches a single request and returns whatever came back.
///
/// Implementations must not interpret status codes: a 401 is a response,
/// not an error. Only failures to obtain a response at all are `Err`.
pub trait Transport: Send + Sync {
    fn execute<'a>(&'a self, request: &'a ApiRequest) -> BoxFuture<'a, Result<ApiResponse, ApiError>>;
}

/// reqwest-backed transport.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn execute<'a>(&'a self, request: &'a ApiRequest) -> BoxFuture<'a, Result<ApiResponse, ApiError>> {
        Box::pin(async move {
            let mut builder = self
                .client
                .request(request.method.clone(), &request.url)
                .headers(request.headers.clone());
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            if let Some(ref body) = request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await?;
            let status = response.status();
            let body = response.text().await?;
            debug!(method = %request.method, url = %request.url, status = status.as_u16(), "Request completed");
            Ok(ApiResponse { status, body })
        })
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! Scripted transport for exercising the client without a network.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use reqwest::{Method, StatusCode};

    use super::*;

    /// What the client put on the wire.
    #[derive(Debug, Clone)]
    pub struct Recorded {
        pub method: Method,
        pub url: String,
        pub query: Vec<(String, String)>,
        pub bearer: Option<String>,
        pub body: Option<serde_json::Value>,
    }

    type Reply = Result<ApiResponse, ApiError>;

    /// Replies are matched by URL suffix in the order they were scripted; a
    /// request with no scripted reply gets a 500.
    #[derive(Default)]
    pub struct FakeTransport {
        replies: Mutex<Vec<(String, VecDeque<Reply>)>>,
        recorded: Mutex<Vec<Recorded>>,
        yielding: bool,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Yield to the scheduler once per call so concurrent requests
        /// interleave.
        pub fn yielding(mut self) -> Self {
            self.yielding = true;
            self
        }

        pub fn reply(&self, url_suffix: &str, status: u16, body: &str) -> &Self {
            let status = StatusCode::from_u16(status).unwrap();
            self.push(url_suffix, Ok(ApiResponse::new(status, body)));
            self
        }

        pub fn fail(&self, url_suffix: &str, message: &str) -> &Self {
            self.push(url_suffix, Err(ApiError::Transport(message.to_string())));
            self
        }

        fn push(&self, url_suffix: &str, reply: Reply) {
            let mut replies = self.replies.lock().unwrap();
            match replies.iter_mut().find(|(suffix, _)| suffix == url_suffix) {
                Some((_, queue)) => queue.push_back(reply),
                None => replies.push((url_suffix.to_string(), VecDeque::from([reply]))),
            }
        }

        pub fn recorded(&self) -> Vec<Recorded> {
            self.recorded.lock().unwrap().clone()
        }

        pub fn calls_to(&self, url_suffix: &str) -> Vec<Recorded> {
            self.recorded()
                .into_iter()
                .filter(|r| r.url.ends_with(url_suffix))
                .collect()
        }
    }

    impl Transport for FakeTransport {
        fn execute<'a>(&'a self, request: &'a ApiRequest) -> BoxFuture<'a, Result<ApiResponse, ApiError>> {
            self.recorded.lock().unwrap().push(Recorded {
                method: request.method.clone(),
                url: request.url.clone(),
                query: request.query.clone(),
                bearer: request.bearer().map(str::to_string),
                body: request.body.clone(),
            });
            let reply = {
                let mut replies = self.replies.lock().unwrap();
                // Longest suffix wins so "auth/refresh/" is not shadowed by "/".
                replies
                    .iter_mut()
                    .filter(|(suffix, _)| request.url.ends_with(suffix.as_str()))
                    .max_by_key(|(suffix, _)| suffix.len())
                    .and_then(|(_, queue)| queue.pop_front())
            };
            let yielding = self.yielding;
            Box::pin(async move {
                if yielding {
                    tokio::task::yield_now().await;
                }
                reply.unwrap_or_else(|| {
                    Ok(ApiResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "no scripted reply"))
                })
            })
        }
    }
}
