use crate::decode::{error_message, is_blank};
use crate::request::RequestSpec;
use crate::{AuthError, Result};
use couchlink_core::{AuthPayload, SessionState};
use reqwest::header::{HeaderMap, SET_COOKIE};
use reqwest::{Client as HttpClient, Method, Url};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// Cookie name CouchDB uses for session tokens
const SESSION_COOKIE: &str = "AuthSession";

/// Owns the authentication state of one client.
///
/// `login` is held for the whole check-then-authenticate sequence, so
/// concurrent callers share a single `_session` round trip. `state` is only
/// locked briefly, so readers never wait on the network.
pub(crate) struct SessionManager {
    username: String,
    password: String,
    timeout: Duration,
    login: Mutex<()>,
    state: RwLock<SessionState>,
}

impl SessionManager {
    pub fn new(username: String, password: String, timeout: Duration) -> Self {
        Self {
            username,
            password,
            timeout,
            login: Mutex::new(()),
            state: RwLock::new(SessionState::default()),
        }
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn ensure_authenticated(
        &self,
        http: &HttpClient,
        session_url: Url,
    ) -> std::result::Result<SessionState, AuthError> {
        if let Some(state) = self.established().await {
            return Ok(state);
        }

        let _login = self.login.lock().await;
        // Another caller may have finished while this one waited.
        if let Some(state) = self.established().await {
            return Ok(state);
        }

        let (cookie, payload) = self.authenticate(http, session_url).await?;
        tracing::info!(
            user = payload.name.as_deref().unwrap_or(""),
            roles = ?payload.roles,
            has_cookie = cookie.is_some(),
            "Session established"
        );

        let state = SessionState {
            cookie,
            auth: Some(payload),
        };
        *self.state.write().await = state.clone();
        Ok(state)
    }

    /// Ends the server-side session and forgets the local one. Returns
    /// `false` when there was no session to end.
    ///
    /// The local session is cleared even when the server refuses the
    /// `DELETE`; the refusal is only logged. Transport failures are returned
    /// and leave the session in place.
    pub async fn logout(&self, http: &HttpClient, session_url: Url) -> Result<bool> {
        let _login = self.login.lock().await;
        let Some(state) = self.established().await else {
            return Ok(false);
        };

        let request =
            RequestSpec::new(Method::DELETE, session_url).build(http, state.cookie.as_deref())?;
        let response = http.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            let message = match response.bytes().await {
                Ok(body) => error_message(&body),
                Err(e) => e.to_string(),
            };
            tracing::warn!(status = status.as_u16(), message = %message, "Session logout refused");
        }

        *self.state.write().await = SessionState::default();
        tracing::info!("Session cleared");
        Ok(true)
    }

    async fn established(&self) -> Option<SessionState> {
        let state = self.state.read().await;
        state.auth.is_some().then(|| state.clone())
    }

    async fn authenticate(
        &self,
        http: &HttpClient,
        session_url: Url,
    ) -> std::result::Result<(Option<String>, AuthPayload), AuthError> {
        let request = RequestSpec::new(Method::POST, session_url)
            .form(vec![
                ("name".to_string(), self.username.clone()),
                ("password".to_string(), self.password.clone()),
            ])
            .timeout(self.timeout)
            .build(http, None)?;

        tracing::debug!(url = %request.url(), "Requesting session");
        let response = http.execute(request).await?;
        let status = response.status();
        let cookie = select_cookie(response.headers());
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                reason: error_message(&body),
            });
        }
        if is_blank(&body) {
            return Err(AuthError::EmptyBody);
        }

        let payload: AuthPayload = serde_json::from_slice(&body)?;
        if !payload.ok {
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                reason: "session response was not ok".to_string(),
            });
        }

        Ok((cookie, payload))
    }
}

/// Picks the cookie to send back from the `Set-Cookie` headers: the session
/// cookie when present, otherwise the last one. Attributes are dropped.
pub(crate) fn select_cookie(headers: &HeaderMap) -> Option<String> {
    let mut selected = None;
    for value in headers.get_all(SET_COOKIE) {
        let Ok(raw) = value.to_str() else {
            continue;
        };
        let pair = raw.split(';').next().unwrap_or_default().trim();
        if pair.is_empty() {
            continue;
        }
        if pair
            .split_once('=')
            .is_some_and(|(name, _)| name.trim() == SESSION_COOKIE)
        {
            return Some(pair.to_string());
        }
        selected = Some(pair.to_string());
    }
    selected
}
