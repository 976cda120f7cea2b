use crate::decode::{self, error_message};
use crate::request::{endpoint, RequestSpec};
use crate::session::SessionManager;
use crate::{ClientError, Result};
use couchlink_core::{ClientConfig, SessionState, UpdateResult};
use reqwest::{Client as HttpClient, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// CouchDB REST API Client
///
/// One pooled HTTP client and one session are shared by every operation for
/// the lifetime of the `Client`.
pub struct Client {
    config: ClientConfig,
    base_url: String,
    client: HttpClient,
    session: SessionManager,
}

impl Client {
    /// Create a new client for the server described by `config`.
    ///
    /// Nothing is validated and no request is made until the first operation.
    pub fn new(config: ClientConfig) -> Self {
        let session = SessionManager::new(
            config.username.clone(),
            config.password.clone(),
            config.request_timeout(),
        );

        Self {
            base_url: config.base_url(),
            client: HttpClient::new(),
            session,
            config,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Authenticate unless a session is already held, and return it
    pub async fn ensure_authenticated(&self) -> Result<SessionState> {
        let session_url = self.url(&["_session"], &[])?;
        Ok(self
            .session
            .ensure_authenticated(&self.client, session_url)
            .await?)
    }

    pub async fn is_authorized(&self) -> bool {
        self.session.snapshot().await.is_authorized()
    }

    pub async fn session(&self) -> SessionState {
        self.session.snapshot().await
    }

    /// End the current session, if any. The next operation authenticates again.
    pub async fn logout(&self) -> Result<bool> {
        let session_url = self.url(&["_session"], &[])?;
        self.session.logout(&self.client, session_url).await
    }

    /// List all databases on the server
    pub async fn list_databases(&self) -> Result<Vec<String>> {
        let url = self.url(&["_all_dbs"], &[])?;
        let response = self.send(RequestSpec::new(Method::GET, url)).await?;

        let status = response.status();
        let body = response.bytes().await?;
        decode::database_list(status, &body, self.config.decode_policy)
    }

    /// Fetch `/{db}/{uri}` and hand back the raw response
    pub async fn get(&self, db: &str, uri: &str, query: &[(&str, &str)]) -> Result<Response> {
        let url = self.url(&[db, uri], query)?;
        self.send(RequestSpec::new(Method::GET, url)).await
    }

    /// Fetch and decode a document; `None` when the server answers 404
    pub async fn get_document<T: DeserializeOwned>(
        &self,
        db: &str,
        uri: &str,
    ) -> Result<Option<T>> {
        let response = self.get(db, uri, &[]).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(ClientError::Server {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let doc = serde_json::from_slice(&body).map_err(ClientError::Decode)?;
        Ok(Some(doc))
    }

    /// Insert a new document; the server assigns its id
    pub async fn insert<T: Serialize + ?Sized>(&self, db: &str, body: &T) -> Result<UpdateResult> {
        let url = self.url(&[db], &[])?;
        let spec = RequestSpec::new(Method::POST, url)
            .json(body)?
            .timeout(self.config.request_timeout());
        self.write("insert", spec).await
    }

    /// Create or replace the document at `/{db}/{uri}`
    pub async fn update<T: Serialize + ?Sized>(
        &self,
        db: &str,
        uri: &str,
        body: &T,
    ) -> Result<UpdateResult> {
        let url = self.url(&[db, uri], &[])?;
        let spec = RequestSpec::new(Method::PUT, url)
            .json(body)?
            .timeout(self.config.request_timeout());
        self.write("update", spec).await
    }

    /// Delete revision `rev` of the document at `/{db}/{uri}`
    pub async fn delete(&self, db: &str, uri: &str, rev: &str) -> Result<UpdateResult> {
        let url = self.url(&[db, uri], &[("rev", rev)])?;
        self.write("delete", RequestSpec::new(Method::DELETE, url)).await
    }

    fn url(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
        endpoint(&self.base_url, segments, query)
    }

    async fn send(&self, spec: RequestSpec) -> Result<Response> {
        let session = self.ensure_authenticated().await?;
        let request = spec.build(&self.client, session.cookie.as_deref())?;

        tracing::debug!(method = %request.method(), url = %request.url(), "Sending request");
        let response = self.client.execute(request).await?;
        tracing::debug!(status = response.status().as_u16(), "Received response");
        Ok(response)
    }

    async fn write(&self, operation: &str, spec: RequestSpec) -> Result<UpdateResult> {
        let response = self.send(spec).await?;
        let status = response.status();
        let body = response.bytes().await?;
        decode::update_result(status, &body, self.config.decode_policy, operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_client_base_url() {
        let client = Client::new(ClientConfig::default());
        assert_eq!(client.base_url(), "http://127.0.0.1:5984");
    }

    #[tokio::test]
    async fn test_unparseable_base_url_reported_on_first_request() {
        let client = Client::new(ClientConfig::default().with_protocol(""));
        assert_eq!(client.base_url(), "127.0.0.1:5984");

        assert!(matches!(
            client.list_databases().await,
            Err(ClientError::InvalidUrl(_))
        ));
        assert!(matches!(
            client.ensure_authenticated().await,
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_fresh_client_is_unauthorized() {
        let client = Client::new(ClientConfig::default());
        assert!(!client.is_authorized().await);
        assert_eq!(client.session().await, SessionState::default());
    }
}
