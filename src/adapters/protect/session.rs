use crate::adapters::local::fs::stream_to_file;
use crate::domain::SegmentRequest;
use crate::error::{CaptureError, SessionError};
use crate::ports::{Session, SessionFactory};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::cookie::Jar;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Name of the cookie that carries the session token after login.
const TOKEN_COOKIE: &str = "TOKEN";
const LOGIN_PATH: &str = "/api/auth/login";
const LOGOUT_PATH: &str = "/api/auth/logout";
const EXPORT_PATH: &str = "/proxy/protect/api/video/export";

/// Connection settings for the video console.
#[derive(Clone)]
pub struct ProtectSettings {
    /// Scheme and authority, e.g. `https://192.168.1.1`
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Applies to every request, including body transfer
    pub request_timeout: Duration,
    /// Consoles ship with self-signed certificates
    pub accept_invalid_certs: bool,
}

impl ProtectSettings {
    pub fn new(server: &str, username: &str, password: &str) -> Self {
        Self {
            base_url: format!("https://{}", server.trim_end_matches('/')),
            username: username.to_string(),
            password: password.to_string(),
            request_timeout: Duration::from_secs(60),
            accept_invalid_certs: true,
        }
    }
}

impl fmt::Debug for ProtectSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtectSettings")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

/// Logs in and hands out fresh [`ProtectSession`]s.
#[derive(Clone, Debug)]
pub struct ProtectConnector {
    settings: ProtectSettings,
}

impl ProtectConnector {
    pub fn new(settings: ProtectSettings) -> Self {
        Self { settings }
    }

    /// Build a new cookie-carrying client and authenticate it.
    ///
    /// Fails with `AuthFailure` on a non-success status, or when the console
    /// answers successfully without setting the token cookie.
    pub async fn login(&self) -> Result<ProtectSession, SessionError> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(jar)
            .danger_accept_invalid_certs(self.settings.accept_invalid_certs)
            .timeout(self.settings.request_timeout)
            .build()?;

        let response = client
            .post(format!("{}{}", self.settings.base_url, LOGIN_PATH))
            .form(&[
                ("username", self.settings.username.as_str()),
                ("password", self.settings.password.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::AuthFailure(format!(
                "login rejected with status {}",
                status
            )));
        }
        if !response.cookies().any(|cookie| cookie.name() == TOKEN_COOKIE) {
            return Err(SessionError::AuthFailure(
                "could not find session token".to_string(),
            ));
        }

        tracing::debug!(server = %self.settings.base_url, "authenticated");

        Ok(ProtectSession {
            client,
            base_url: self.settings.base_url.clone(),
        })
    }
}

#[async_trait]
impl SessionFactory for ProtectConnector {
    async fn connect(&self) -> Result<Box<dyn Session>, SessionError> {
        Ok(Box::new(self.login().await?))
    }
}

/// A logged-in client. The cookie jar inside `client` holds the token.
#[derive(Debug)]
pub struct ProtectSession {
    client: Client,
    base_url: String,
}

impl ProtectSession {
    fn export_request(&self, request: &SegmentRequest) -> RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url, EXPORT_PATH))
            .query(&[
                ("camera", request.camera_id.clone()),
                ("start", request.start_millis.to_string()),
                ("end", request.end_millis.to_string()),
            ])
    }

    async fn send_export(&self, request: &SegmentRequest) -> Result<Response, SessionError> {
        tracing::debug!(
            camera_id = %request.camera_id,
            start = request.start_millis,
            end = request.end_millis,
            "export request"
        );
        let response = self.export_request(request).send().await?;
        check_status(response.status())?;
        Ok(response)
    }
}

#[async_trait]
impl Session for ProtectSession {
    async fn fetch_segment(&self, request: &SegmentRequest) -> Result<Bytes, SessionError> {
        let response = self.send_export(request).await?;
        Ok(response.bytes().await?)
    }

    async fn download_segment(
        &self,
        request: &SegmentRequest,
        output: &Path,
    ) -> Result<u64, CaptureError> {
        let response = self.send_export(request).await?;
        stream_to_file(output, response.bytes_stream())
            .await
            .map_err(|source| CaptureError::Artifact {
                path: output.to_path_buf(),
                source,
            })
    }

    async fn close(&self) {
        let result = self
            .client
            .post(format!("{}{}", self.base_url, LOGOUT_PATH))
            .send()
            .await;
        if let Err(e) = result {
            tracing::debug!(error = %e, "logout failed, dropping session anyway");
        }
    }
}

/// Map a non-success export status onto the session error taxonomy.
fn check_status(status: StatusCode) -> Result<(), SessionError> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(SessionError::SessionExpired { status })
        }
        _ => Err(SessionError::SegmentUnavailable { status }),
    }
}
