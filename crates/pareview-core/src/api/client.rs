//! API client for the price-action review backend.
//!
//! `ApiClient` attaches the session's access token to every call and, when
//! the backend rejects it with a 401, renews the token once through
//! `auth/refresh/` and replays the original request with the new token.
//! If renewal is impossible the session is cleared and an
//! [`AuthEvent::LoginRequired`] is emitted.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{Session, TokenPair};
use crate::models::User;

use super::{ApiError, ApiRequest, ApiResponse, HttpTransport, Transport};

// ============================================================================
// Constants
// ============================================================================

/// Base address used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Where the user is sent when the session cannot be recovered.
pub const LOGIN_ROUTE: &str = "/login";

const LOGIN_PATH: &str = "auth/login/";
const REFRESH_PATH: &str = "auth/refresh/";
const VERIFY_PATH: &str = "auth/verify/";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    user: User,
    tokens: TokenPair,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    token: &'a str,
}

/// Signals raised by the client for its owner to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// The session was cleared; the user must log in again at
    /// [`LOGIN_ROUTE`].
    LoginRequired { reason: String },
}

/// Validate a configured base address and strip any trailing slash.
pub fn normalize_base_url(raw: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed)
        .map_err(|e| ApiError::Validation(format!("invalid API base URL {:?}: {}", raw, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ApiError::Validation(format!(
            "API base URL must be http or https, got {}",
            parsed.scheme()
        )));
    }
    Ok(trimmed.to_string())
}

/// Authenticated client. Cloning shares the transport, session and renewal
/// lock.
pub struct ApiClient<T: Transport = HttpTransport> {
    pub(super) transport: Arc<T>,
    base_url: String,
    session: Arc<Session>,
    renewal: Arc<Mutex<()>>,
    auth_events: Option<mpsc::Sender<AuthEvent>>,
}

impl<T: Transport> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            base_url: self.base_url.clone(),
            session: Arc::clone(&self.session),
            renewal: Arc::clone(&self.renewal),
            auth_events: self.auth_events.clone(),
        }
    }
}

impl ApiClient<HttpTransport> {
    /// Create a client over HTTP.
    pub fn new(base_url: &str, session: Arc<Session>) -> Result<Self, ApiError> {
        Self::with_transport(HttpTransport::new()?, base_url, session)
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(transport: T, base_url: &str, session: Arc<Session>) -> Result<Self, ApiError> {
        Ok(Self {
            transport: Arc::new(transport),
            base_url: normalize_base_url(base_url)?,
            session,
            renewal: Arc::new(Mutex::new(())),
            auth_events: None,
        })
    }

    /// Deliver [`AuthEvent`]s to `tx`.
    pub fn with_auth_events(mut self, tx: mpsc::Sender<AuthEvent>) -> Self {
        self.auth_events = Some(tx);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Absolute URL for an endpoint path such as `instruments/`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // ===== Request pipeline =====

    /// Dispatch a request with the current access token.
    ///
    /// Any response other than a first 401 is returned unchanged, failures
    /// included. A first 401 triggers one renewal and one replay; the replay's
    /// outcome is returned whatever it is. When renewal is impossible the
    /// session is cleared and the call fails with `LoginRequired`.
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        if let Some(token) = self.session.access_token() {
            request.set_bearer(&token)?;
        }

        let response = self.transport.execute(&request).await?;
        if !response.is_unauthorized() || request.retried {
            return Ok(response);
        }

        request.retried = true;
        debug!(method = %request.method, url = %request.url, "Access token rejected, renewing");

        let rejected = request.bearer().map(str::to_string);
        let access = self.renew_access_token(rejected.as_deref()).await?;

        request.set_bearer(&access)?;
        self.transport.execute(&request).await
    }

    /// Obtain a fresh access token, storing it in the session before
    /// returning it.
    ///
    /// Renewals are serialized. A caller that waited on another renewal
    /// reuses its result instead of renewing again: if the session's token no
    /// longer matches the one that was rejected, it is already fresh. A
    /// failed renewal clears the session before the lock is released, so
    /// waiters find no refresh token rather than retrying the rejected one.
    async fn renew_access_token(&self, rejected: Option<&str>) -> Result<String, ApiError> {
        let _guard = self.renewal.lock().await;

        if let Some(current) = self.session.access_token() {
            if Some(current.as_str()) != rejected {
                debug!("Token already renewed by a concurrent request");
                return Ok(current);
            }
        }

        match self.refresh_access_token().await {
            Ok(access) => Ok(access),
            Err(e) => {
                let reason = match e {
                    ApiError::LoginRequired(reason) => reason,
                    other => format!("token renewal failed: {}", other),
                };
                self.force_login(&reason);
                Err(ApiError::LoginRequired(reason))
            }
        }
    }

    /// One `auth/refresh/` exchange. Caller holds the renewal lock.
    async fn refresh_access_token(&self) -> Result<String, ApiError> {
        let refresh = self
            .session
            .refresh_token()
            .ok_or_else(|| ApiError::LoginRequired("no refresh token available".to_string()))?;

        let request = ApiRequest::post(self.url(REFRESH_PATH)).json(&RefreshRequest { refresh: &refresh })?;
        let response = self.transport.execute(&request).await?.into_success()?;
        let body: RefreshResponse = response.json()?;
        if body.access.is_empty() {
            return Err(ApiError::InvalidResponse("refresh response had an empty access token".to_string()));
        }

        self.session.update_tokens(TokenPair {
            access: body.access.clone(),
            refresh,
        });
        info!("Access token renewed");
        Ok(body.access)
    }

    /// Clear the session and tell the owner to show the login view.
    fn force_login(&self, reason: &str) {
        warn!(reason, route = LOGIN_ROUTE, "Session cleared, login required");
        self.session.clear();
        if let Some(ref tx) = self.auth_events {
            let event = AuthEvent::LoginRequired {
                reason: reason.to_string(),
            };
            if let Err(e) = tx.try_send(event) {
                debug!(error = %e, "Auth event not delivered");
            }
        }
    }

    // ===== Authentication =====

    /// Exchange credentials for a token pair and start a session.
    ///
    /// Sent without renewal handling: a 401 here means bad credentials.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let request = ApiRequest::post(self.url(LOGIN_PATH)).json(&LoginRequest { username, password })?;
        let response = self.transport.execute(&request).await?.into_success()?;
        let body: LoginResponse = response.json()?;

        self.session.set(body.user.clone(), body.tokens);
        info!(username = %body.user.username, "Login successful");
        Ok(body.user)
    }

    /// End the session locally. The backend keeps no server-side session.
    pub fn logout(&self) {
        self.session.clear();
        info!("Logged out");
    }

    /// Ask the backend whether the current access token is still valid.
    pub async fn verify(&self) -> Result<bool, ApiError> {
        let Some(token) = self.session.access_token() else {
            return Ok(false);
        };
        let request = ApiRequest::post(self.url(VERIFY_PATH)).json(&VerifyRequest { token: &token })?;
        let response = self.transport.execute(&request).await?;
        if response.is_success() {
            Ok(true)
        } else if response.is_unauthorized() {
            Ok(false)
        } else {
            Err(response.error())
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::fake::FakeTransport;
    use reqwest::StatusCode;

    const BASE: &str = "http://localhost:8000/api/v1";
    const REFRESH_URL: &str = "auth/refresh/";

    fn user() -> User {
        User {
            id: 1,
            username: "trader".into(),
            email: String::new(),
            first_name: None,
            last_name: None,
        }
    }

    fn logged_in(access: &str, refresh: &str) -> Arc<Session> {
        let session = Arc::new(Session::in_memory());
        session.set(
            user(),
            TokenPair {
                access: access.into(),
                refresh: refresh.into(),
            },
        );
        session
    }

    fn client(fake: FakeTransport, session: Arc<Session>) -> ApiClient<FakeTransport> {
        ApiClient::with_transport(fake, BASE, session).unwrap()
    }

    fn instruments(client: &ApiClient<FakeTransport>) -> ApiRequest {
        ApiRequest::get(client.url("instruments/"))
    }

    #[tokio::test]
    async fn test_attaches_current_access_token() {
        let fake = FakeTransport::new();
        fake.reply("instruments/", 200, "[]");
        let client = client(fake, logged_in("A1", "R1"));

        let resp = client.send(instruments(&client)).await.unwrap();
        assert_eq!(resp.status, StatusCode::OK);

        let calls = client.transport.recorded();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].bearer.as_deref(), Some("A1"));
        assert_eq!(calls[0].url, "http://localhost:8000/api/v1/instruments/");
    }

    #[tokio::test]
    async fn test_no_token_no_header() {
        let fake = FakeTransport::new();
        fake.reply("instruments/", 200, "[]");
        let client = client(fake, Arc::new(Session::in_memory()));

        client.send(instruments(&client)).await.unwrap();
        assert_eq!(client.transport.recorded()[0].bearer, None);
    }

    #[tokio::test]
    async fn test_renews_once_and_replays_with_new_token() {
        let fake = FakeTransport::new();
        fake.reply("instruments/", 401, r#"{"detail": "token expired"}"#)
            .reply(REFRESH_URL, 200, r#"{"access": "A2"}"#)
            .reply("instruments/", 200, r#"[{"id": 1}]"#);
        let session = logged_in("A1", "R1");
        let client = client(fake, Arc::clone(&session));

        let resp = client.send(instruments(&client)).await.unwrap();
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body, r#"[{"id": 1}]"#);

        assert_eq!(session.access_token().as_deref(), Some("A2"));
        assert_eq!(session.refresh_token().as_deref(), Some("R1"));
        assert!(session.is_authenticated());

        let refreshes = client.transport.calls_to(REFRESH_URL);
        assert_eq!(refreshes.len(), 1);
        assert_eq!(refreshes[0].body, Some(serde_json::json!({"refresh": "R1"})));
        assert_eq!(refreshes[0].bearer, None);

        let originals = client.transport.calls_to("instruments/");
        assert_eq!(originals.len(), 2);
        assert_eq!(originals[0].bearer.as_deref(), Some("A1"));
        assert_eq!(originals[1].bearer.as_deref(), Some("A2"));
    }

    #[tokio::test]
    async fn test_missing_refresh_token_forces_login_without_renewal() {
        let fake = FakeTransport::new();
        fake.reply("instruments/", 401, "");
        let session = Arc::new(Session::in_memory());
        session.update_tokens(TokenPair {
            access: "A1".into(),
            refresh: String::new(),
        });
        let (tx, mut rx) = mpsc::channel(4);
        let client = client(fake, Arc::clone(&session)).with_auth_events(tx);

        let err = client.send(instruments(&client)).await.unwrap_err();
        assert!(matches!(err, ApiError::LoginRequired(_)));
        assert!(err.is_auth_error());

        assert!(client.transport.calls_to(REFRESH_URL).is_empty());
        assert_eq!(session.snapshot(), crate::auth::SessionData::default());
        assert!(matches!(rx.try_recv(), Ok(AuthEvent::LoginRequired { .. })));
    }

    #[tokio::test]
    async fn test_second_401_is_returned_as_is() {
        let fake = FakeTransport::new();
        fake.reply("instruments/", 401, "first")
            .reply(REFRESH_URL, 200, r#"{"access": "A2"}"#)
            .reply("instruments/", 401, "second");
        let session = logged_in("A1", "R1");
        let client = client(fake, Arc::clone(&session));

        let resp = client.send(instruments(&client)).await.unwrap();
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
        assert_eq!(resp.body, "second");
        assert_eq!(client.transport.calls_to(REFRESH_URL).len(), 1);
        assert_eq!(client.transport.calls_to("instruments/").len(), 2);
        // The renewed token stays; only renewal failure clears the session.
        assert_eq!(session.access_token().as_deref(), Some("A2"));
    }

    #[tokio::test]
    async fn test_rejected_renewal_clears_session() {
        let fake = FakeTransport::new();
        fake.reply("instruments/", 401, "")
            .reply(REFRESH_URL, 401, r#"{"detail": "Token is blacklisted"}"#);
        let session = logged_in("A1", "R1");
        let (tx, mut rx) = mpsc::channel(4);
        let client = client(fake, Arc::clone(&session)).with_auth_events(tx);

        let err = client.send(instruments(&client)).await.unwrap_err();
        assert!(matches!(err, ApiError::LoginRequired(ref r) if r.contains("renewal failed")));
        assert!(!session.is_authenticated());
        assert_eq!(session.refresh_token(), None);
        assert_eq!(client.transport.calls_to("instruments/").len(), 1);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_network_failure_during_renewal_clears_session() {
        let fake = FakeTransport::new();
        fake.reply("instruments/", 401, "").fail(REFRESH_URL, "connection reset");
        let session = logged_in("A1", "R1");
        let client = client(fake, Arc::clone(&session));

        let err = client.send(instruments(&client)).await.unwrap_err();
        assert!(matches!(err, ApiError::LoginRequired(ref r) if r.contains("connection reset")));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_malformed_renewal_body_clears_session() {
        let fake = FakeTransport::new();
        fake.reply("instruments/", 401, "").reply(REFRESH_URL, 200, r#"{"token": "x"}"#);
        let session = logged_in("A1", "R1");
        let client = client(fake, Arc::clone(&session));

        assert!(client.send(instruments(&client)).await.unwrap_err().is_auth_error());
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_other_failures_pass_through() {
        let fake = FakeTransport::new();
        fake.reply("instruments/", 503, "maintenance").reply("instruments/", 403, "forbidden");
        let session = logged_in("A1", "R1");
        let client = client(fake, Arc::clone(&session));

        let first = client.send(instruments(&client)).await.unwrap();
        assert_eq!(first.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(first.body, "maintenance");
        let second = client.send(instruments(&client)).await.unwrap();
        assert_eq!(second.status, StatusCode::FORBIDDEN);

        assert!(client.transport.calls_to(REFRESH_URL).is_empty());
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_transport_error_passes_through() {
        let fake = FakeTransport::new();
        fake.fail("instruments/", "dns failure");
        let session = logged_in("A1", "R1");
        let client = client(fake, Arc::clone(&session));

        let err = client.send(instruments(&client)).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_concurrent_401s_share_one_renewal() {
        let fake = FakeTransport::new().yielding();
        fake.reply("instruments/", 401, "")
            .reply("instruments/", 401, "")
            .reply(REFRESH_URL, 200, r#"{"access": "A2"}"#)
            .reply("instruments/", 200, "[]")
            .reply("instruments/", 200, "[]");
        let session = logged_in("A1", "R1");
        let client = client(fake, Arc::clone(&session));

        let (a, b) = tokio::join!(client.send(instruments(&client)), client.send(instruments(&client)));
        assert_eq!(a.unwrap().status, StatusCode::OK);
        assert_eq!(b.unwrap().status, StatusCode::OK);

        assert_eq!(client.transport.calls_to(REFRESH_URL).len(), 1);
        let bearers: Vec<_> = client
            .transport
            .calls_to("instruments/")
            .into_iter()
            .map(|c| c.bearer.unwrap_or_default())
            .collect();
        assert_eq!(bearers, vec!["A1", "A1", "A2", "A2"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_401s_after_rejected_renewal_refresh_once() {
        let fake = FakeTransport::new().yielding();
        fake.reply("instruments/", 401, "")
            .reply("instruments/", 401, "")
            .reply(REFRESH_URL, 401, r#"{"detail": "Token is blacklisted"}"#);
        let session = logged_in("A1", "R1");
        let client = client(fake, Arc::clone(&session));

        let (a, b) = tokio::join!(client.send(instruments(&client)), client.send(instruments(&client)));
        assert!(matches!(a, Err(ApiError::LoginRequired(_))));
        assert!(matches!(b, Err(ApiError::LoginRequired(_))));

        assert_eq!(client.transport.calls_to(REFRESH_URL).len(), 1);
        assert_eq!(client.transport.calls_to("instruments/").len(), 2);
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_starts_session() {
        let fake = FakeTransport::new();
        fake.reply(
            "auth/login/",
            200,
            r#"{"user": {"id": 1, "username": "trader", "email": "t@example.com"},
                "tokens": {"access": "A1", "refresh": "R1"}}"#,
        );
        let session = Arc::new(Session::in_memory());
        let client = client(fake, Arc::clone(&session));

        let user = client.login("trader", "secret").await.unwrap();
        assert_eq!(user.username, "trader");
        assert!(session.is_authenticated());
        assert_eq!(session.access_token().as_deref(), Some("A1"));

        let calls = client.transport.recorded();
        assert_eq!(
            calls[0].body,
            Some(serde_json::json!({"username": "trader", "password": "secret"}))
        );
    }

    #[tokio::test]
    async fn test_bad_credentials_do_not_trigger_renewal() {
        let fake = FakeTransport::new();
        fake.reply("auth/login/", 401, r#"{"detail": "No active account"}"#);
        let session = logged_in("A1", "R1");
        let client = client(fake, Arc::clone(&session));

        let err = client.login("trader", "wrong").await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
        assert!(client.transport.calls_to(REFRESH_URL).is_empty());
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let session = logged_in("A1", "R1");
        let client = client(FakeTransport::new(), Arc::clone(&session));
        client.logout();
        assert!(!session.is_authenticated());
        client.logout();
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_verify() {
        let fake = FakeTransport::new();
        fake.reply("auth/verify/", 200, "{}").reply("auth/verify/", 401, "");
        let client = client(fake, logged_in("A1", "R1"));
        assert!(client.verify().await.unwrap());
        assert!(!client.verify().await.unwrap());
        assert_eq!(
            client.transport.recorded()[0].body,
            Some(serde_json::json!({"token": "A1"}))
        );

        let anonymous = ApiClient::with_transport(FakeTransport::new(), BASE, Arc::new(Session::in_memory())).unwrap();
        assert!(!anonymous.verify().await.unwrap());
        assert!(anonymous.transport.recorded().is_empty());
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("http://localhost:8000/api/v1/").unwrap(), BASE);
        assert_eq!(normalize_base_url(" https://example.com/api ").unwrap(), "https://example.com/api");
        assert!(normalize_base_url("not a url").is_err());
        assert!(normalize_base_url("ftp://example.com").is_err());
        assert_eq!(normalize_base_url(DEFAULT_BASE_URL).unwrap(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_url_joins_paths() {
        let client = client(FakeTransport::new(), Arc::new(Session::in_memory()));
        assert_eq!(client.url("/reviews/3/"), "http://localhost:8000/api/v1/reviews/3/");
        assert_eq!(client.url("auth/refresh/"), "http://localhost:8000/api/v1/auth/refresh/");
    }
}
