//! HTTP transport shared by every resource fetcher.

use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use cineclub_core::{token, ClientSettings, CoreError, SessionStore};

use crate::error::ApiError;

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    settings: ClientSettings,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(settings: ClientSettings, session: SessionStore) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().use_rustls_tls().build()?;
        Ok(Self {
            http,
            settings,
            session,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.settings.api_base_url, path)
    }

    /// Request without authentication (login, register, token refresh,
    /// the AI responder).
    pub(crate) async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Response, ApiError> {
        let mut req = self.http.request(method, url);
        if let Some(b) = body {
            req = req.json(b);
        }
        Ok(req.send().await?)
    }

    /// Privileged request. Refreshes an expired access token before the
    /// call, attaches the bearer header, and on a 401 drops the session
    /// so the caller degrades to the unauthenticated state. This is the
    /// one cross-cutting contract every fetcher shares.
    pub(crate) async fn authed_request(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Response, ApiError> {
        let access = self.valid_access().await?;
        let mut req = self.http.request(method, url).bearer_auth(&access);
        if let Some(b) = body {
            req = req.json(b);
        }
        self.guard_unauthorized(url, req.send().await?).await
    }

    /// Privileged multipart upload. Same refresh and 401 contract as
    /// [`ApiClient::authed_request`]; a form cannot be cloned, which is
    /// fine since nothing here retries.
    pub(crate) async fn authed_multipart(
        &self,
        url: &str,
        form: Form,
    ) -> Result<Response, ApiError> {
        let access = self.valid_access().await?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(&access)
            .multipart(form)
            .send()
            .await?;
        self.guard_unauthorized(url, resp).await
    }

    /// The current access token, refreshed first if it has expired.
    async fn valid_access(&self) -> Result<String, ApiError> {
        let session = self.session.current().ok_or(ApiError::NotLoggedIn)?;
        if token::is_expired_now(&session.access) {
            self.refresh_access(&session.refresh).await
        } else {
            Ok(session.access)
        }
    }

    async fn guard_unauthorized(&self, url: &str, resp: Response) -> Result<Response, ApiError> {
        if resp.status() == StatusCode::UNAUTHORIZED {
            warn!("401 from {url}, dropping session");
            self.session.clear()?;
            return Err(ApiError::AuthRequired);
        }
        Ok(resp)
    }

    /// Exchange the refresh token for a new access token and persist it
    /// before the dependent request proceeds. Concurrent refreshes are
    /// last-write-wins; the tokens are idempotent strings.
    async fn refresh_access(&self, refresh: &str) -> Result<String, ApiError> {
        #[derive(Serialize)]
        struct RefreshRequest<'a> {
            refresh: &'a str,
        }
        #[derive(Deserialize)]
        struct RefreshResponse {
            access: String,
        }

        debug!("access token expired, exchanging refresh token");
        let resp = self
            .http
            .post(self.api_url("/token/refresh/"))
            .json(&RefreshRequest { refresh })
            .send()
            .await?;

        if !resp.status().is_success() {
            warn!("token refresh failed ({}), dropping session", resp.status());
            self.session.clear()?;
            return Err(ApiError::AuthRequired);
        }

        let body: RefreshResponse = resp.json().await?;
        self.session.set_access(body.access.clone())?;
        Ok(body.access)
    }

    /// Decode a 2xx JSON body; map anything else through the taxonomy.
    pub(crate) async fn expect_json<T: DeserializeOwned>(
        &self,
        resp: Response,
    ) -> Result<T, ApiError> {
        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }
        Ok(resp.json().await?)
    }

    pub(crate) async fn expect_ok(&self, resp: Response) -> Result<(), ApiError> {
        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }
        Ok(())
    }
}

pub(crate) async fn api_error(resp: Response) -> ApiError {
    let status = resp.status();
    let body: Value = resp.json().await.unwrap_or_default();
    ApiError::from_body(status, &body)
}

/// Read an image file into a multipart part. The backend only accepts
/// JPG and PNG, so anything else is rejected before the upload starts.
pub(crate) fn image_part(path: &Path) -> Result<Part, ApiError> {
    let mime = match path.extension().and_then(|e| e.to_str()) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => return Err(ApiError::rejected("image", "use a JPG or PNG image")),
    };
    let bytes = std::fs::read(path).map_err(CoreError::from)?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();
    Ok(Part::bytes(bytes).file_name(name).mime_str(mime)?)
}
