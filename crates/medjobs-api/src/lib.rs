// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Blocking REST client for the employer backend plus the collection
//! fetcher and mutation dispatcher built on it.

pub mod auth;
pub mod error;
pub mod fetcher;
pub mod mutation;

pub use auth::{login, register, session_from_response};
pub use error::{ApiError, GENERIC_ERROR, NETWORK_ERROR, error_messages};
pub use fetcher::{CollectionFetcher, FetchOptions, FetchUpdate};
pub use mutation::{MutationDispatcher, MutationOutcome, Rejection, submit_form};

use anyhow::{Context, Result, bail};
use medjobs_app::{ImageUpload, MutationMethod, SessionHandle};
use reqwest::Method;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::error::parse_body;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    http: HttpClient,
    session: SessionHandle,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration, session: SessionHandle) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("api.base_url must not be empty");
        }
        let parsed = Url::parse(&base_url)
            .with_context(|| format!("api.base_url {base_url:?} is not a valid URL"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "api.base_url {base_url:?} uses scheme {:?}; use http or https",
                parsed.scheme()
            );
        }
        if timeout.is_zero() {
            bail!("api.timeout must be positive");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn get_json(&self, path: &str) -> Result<Value, ApiError> {
        tracing::debug!(path, "GET");
        let request = self.authorized(self.http.get(self.endpoint(path)));
        self.execute(path, request)
    }

    pub fn send_json(
        &self,
        method: MutationMethod,
        path: &str,
        body: &Value,
    ) -> Result<Value, ApiError> {
        tracing::debug!(method = method.as_str(), path, "send json");
        let mut request =
            self.authorized(self.http.request(http_method(method), self.endpoint(path)));
        if !body.is_null() {
            request = request.json(body);
        }
        self.execute(path, request)
    }

    /// Sends `fields` as text parts and the image as a file part.
    pub fn send_multipart(
        &self,
        method: MutationMethod,
        path: &str,
        fields: &Value,
        file_field: &str,
        upload: &ImageUpload,
    ) -> Result<Value, ApiError> {
        tracing::debug!(method = method.as_str(), path, file = %upload.file_name, "send multipart");
        let mut form = Form::new();
        if let Value::Object(fields) = fields {
            for (name, value) in fields {
                let text = match value {
                    Value::String(text) => text.clone(),
                    Value::Null => continue,
                    other => other.to_string(),
                };
                form = form.text(name.clone(), text);
            }
        }
        let part = Part::bytes(upload.data.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime_type)
            .map_err(|source| self.transport(source))?;
        form = form.part(file_field.to_owned(), part);

        let request = self
            .authorized(self.http.request(http_method(method), self.endpoint(path)))
            .multipart(form);
        self.execute(path, request)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(reqwest::header::ACCEPT, "application/json");
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn execute(&self, path: &str, request: RequestBuilder) -> Result<Value, ApiError> {
        let response = request.send().map_err(|source| self.transport(source))?;
        self.finish(path, response)
    }

    fn finish(&self, path: &str, response: Response) -> Result<Value, ApiError> {
        let status = response.status().as_u16();
        let text = response.text().map_err(|source| self.transport(source))?;
        let body = parse_body(&text);
        if is_success(status) {
            Ok(body)
        } else {
            tracing::warn!(path, status, "request rejected");
            Err(ApiError::status(status, body))
        }
    }

    fn transport(&self, source: reqwest::Error) -> ApiError {
        ApiError::Transport {
            base_url: self.base_url.clone(),
            source,
        }
    }
}

/// Only 200 and 201 count as success.
pub const fn is_success(status: u16) -> bool {
    matches!(status, 200 | 201)
}

fn http_method(method: MutationMethod) -> Method {
    match method {
        MutationMethod::Post => Method::POST,
        MutationMethod::Put => Method::PUT,
        MutationMethod::Delete => Method::DELETE,
    }
}
