//! HTTP client for the catalog API.
//!
//! Mirrors the server routes one method each. The session token returned by
//! [`HubClient::login`] is kept on the client and sent as a bearer
//! credential on admin calls; there is no refresh, so an expired session
//! surfaces as an auth failure and the caller logs in again.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use byhub_shared::constants::UPLOAD_FILE_FIELD;
use byhub_shared::{AppFieldsInput, SafetyReport};

use crate::error::ClientError;
use crate::view::{decode_listing, CatalogView};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const PACKAGE_MIME: &str = "application/vnd.android.package-archive";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub token: String,
    pub username: String,
}

/// A downloaded package binary.
#[derive(Debug, Clone)]
pub struct Download {
    pub file_name: String,
    pub data: Bytes,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginUser {
    username: String,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
    user: LoginUser,
}

#[derive(Deserialize)]
struct UploadResponse {
    id: Uuid,
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    name: &'a str,
    description: &'a str,
}

#[derive(Deserialize)]
struct AnalyzeResponse {
    report: SafetyReport,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone)]
pub struct HubClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl HubClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            token: None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn logout(&mut self) {
        self.token = None;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let token = self.token.as_deref().ok_or(ClientError::NotLoggedIn)?;
        Ok(request.bearer_auth(token))
    }

    /// Log in and keep the session token for subsequent admin calls.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<LoginOutcome, ClientError> {
        let response = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        let body: LoginResponse = decode(check(response).await?).await?;
        self.token = Some(body.token.clone());

        info!(user = %body.user.username, "Logged in");
        Ok(LoginOutcome {
            token: body.token,
            username: body.user.username,
        })
    }

    pub async fn list_apps(&self) -> Result<CatalogView, ClientError> {
        let response = self.http.get(self.url("/api/apps")).send().await?;
        let body: serde_json::Value = decode(check(response).await?).await?;

        let view = decode_listing(body)?;
        debug!(count = view.records().len(), skipped = view.skipped(), "Fetched catalog");
        Ok(view)
    }

    /// Upload a package binary with its metadata. Returns the new record id.
    pub async fn upload_app(
        &self,
        fields: &AppFieldsInput,
        file_name: &str,
        data: impl Into<Bytes>,
    ) -> Result<Uuid, ClientError> {
        let data: Bytes = data.into();
        let size = data.len();

        let part = Part::stream(reqwest::Body::from(data))
            .file_name(file_name.to_string())
            .mime_str(PACKAGE_MIME)?;

        let form = Form::new()
            .text("name", fields.name.clone())
            .text("version", fields.version.clone())
            .text("developer", fields.developer.clone())
            .text("category", fields.category.clone())
            .text("description", fields.description.clone())
            .text("size", fields.size.clone())
            .text("iconUrl", fields.icon_url.clone())
            .part(UPLOAD_FILE_FIELD, part);

        let request = self.authorized(self.http.post(self.url("/api/apps/upload")))?;
        let response = request.multipart(form).send().await?;
        let body: UploadResponse = decode(check(response).await?).await?;

        info!(id = %body.id, name = %fields.name, size, "Uploaded app");
        Ok(body.id)
    }

    pub async fn update_app(&self, id: Uuid, fields: &AppFieldsInput) -> Result<(), ClientError> {
        let request = self.authorized(self.http.put(self.url(&format!("/api/apps/{id}"))))?;
        check(request.json(fields).send().await?).await?;
        Ok(())
    }

    pub async fn delete_app(&self, id: Uuid) -> Result<(), ClientError> {
        let request = self.authorized(self.http.delete(self.url(&format!("/api/apps/{id}"))))?;
        check(request.send().await?).await?;
        Ok(())
    }

    pub async fn download_app(&self, id: Uuid) -> Result<Download, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/api/apps/{id}/download")))
            .send()
            .await?;
        let response = check(response).await?;

        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_file_name)
            .unwrap_or_else(|| format!("{id}.apk"));
        let data = response.bytes().await?;

        Ok(Download { file_name, data })
    }

    /// Request an advisory safety report. The report is never stored.
    pub async fn analyze(&self, name: &str, description: &str) -> Result<SafetyReport, ClientError> {
        let request = self.authorized(self.http.post(self.url("/api/apps/analyze")))?;
        let response = request
            .json(&AnalyzeRequest { name, description })
            .send()
            .await?;

        let body: AnalyzeResponse = decode(check(response).await?).await?;
        Ok(body.report)
    }
}

/// Turn a non-success response into [`ClientError::Http`].
async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|b| b.error)
        .unwrap_or(text);

    Err(ClientError::Http {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}

fn disposition_file_name(value: &str) -> Option<String> {
    value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}
