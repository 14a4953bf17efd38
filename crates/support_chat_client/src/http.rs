//! crates/support_chat_client/src/http.rs
//!
//! The reqwest-backed transport adapter. The session cookie set at login
//! lives in the client's cookie store and rides along on every call.

use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use serde_json::json;

use crate::api::{AuthApi, ChatApi, ClientError, FileUpload, TurnDto};

/// HTTP implementation of [`AuthApi`] and [`ChatApi`].
#[derive(Clone)]
pub struct HttpClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpClient {
    /// `base_url` is the server origin, e.g. `http://localhost:3000`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turns a non-success response into a `ClientError::Api`, pulling
    /// the message out of the server's error envelope when present.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
            .unwrap_or_default();
        Err(ClientError::Api { status, message })
    }
}

#[derive(Deserialize)]
struct UserEnvelope {
    user: UserDto,
}

#[derive(Deserialize)]
struct UserDto {
    username: String,
}

#[derive(Deserialize)]
struct HistoryEnvelope {
    messages: Vec<TurnDto>,
}

#[derive(Deserialize)]
struct MessageEnvelope {
    message: String,
}

#[async_trait]
impl AuthApi for HttpClient {
    async fn register(
        &self,
        username: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url("/api/auth/register"))
            .json(&json!({
                "username": username,
                "password": password,
                "confirm_password": confirm_password,
            }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn current_user(&self) -> Result<String, ClientError> {
        let response = self.http.get(self.url("/api/auth/user")).send().await?;
        let envelope: UserEnvelope = Self::check(response).await?.json().await?;
        Ok(envelope.user.username)
    }

    async fn logout(&self) -> Result<(), ClientError> {
        let response = self.http.post(self.url("/api/auth/logout")).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl ChatApi for HttpClient {
    async fn history(&self) -> Result<Vec<TurnDto>, ClientError> {
        let response = self.http.get(self.url("/api/chat")).send().await?;
        let envelope: HistoryEnvelope = Self::check(response).await?.json().await?;
        Ok(envelope.messages)
    }

    async fn send(&self, message: &str, file: Option<FileUpload>) -> Result<String, ClientError> {
        let mut form = multipart::Form::new();
        if !message.trim().is_empty() {
            form = form.text("message", message.to_string());
        }
        if let Some(upload) = file {
            let part = multipart::Part::bytes(upload.data)
                .file_name(upload.filename)
                .mime_str(&upload.content_type)?;
            form = form.part("file", part);
        }

        let response = self
            .http
            .post(self.url("/api/chat"))
            .multipart(form)
            .send()
            .await?;
        let envelope: MessageEnvelope = Self::check(response).await?.json().await?;
        Ok(envelope.message)
    }
}
