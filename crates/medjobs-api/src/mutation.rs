// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use medjobs_app::{
    FormPayload, ImageUpload, MutationMethod, Notification, Notifier, RequestState,
};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{ApiError, Client};

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    /// `None` when the request never reached the server.
    pub status: Option<u16>,
    pub body: Value,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    Succeeded(Value),
    Rejected(Rejection),
}

impl MutationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Succeeded(payload) => Some(payload),
            Self::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(rejection) => Some(rejection),
            Self::Succeeded(_) => None,
        }
    }
}

impl From<ApiError> for Rejection {
    fn from(error: ApiError) -> Self {
        let messages = error.user_messages();
        match error {
            ApiError::Status { status, body, .. } => Self {
                status: Some(status),
                body,
                messages,
            },
            ApiError::Transport { .. } | ApiError::Decode { .. } => Self {
                status: None,
                body: Value::Null,
                messages,
            },
        }
    }
}

/// Write-side request against one endpoint. Notifies the user on every
/// outcome and keeps the last response around for inspection.
pub struct MutationDispatcher {
    client: Client,
    path: String,
    method: MutationMethod,
    notifier: Arc<dyn Notifier>,
    state: Mutex<RequestState<Value>>,
    response: Mutex<Option<Value>>,
}

impl MutationDispatcher {
    pub fn new(
        client: Client,
        path: impl Into<String>,
        method: MutationMethod,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            client,
            path: path.into(),
            method,
            notifier,
            state: Mutex::new(RequestState::Idle),
            response: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> MutationMethod {
        self.method
    }

    pub fn loading(&self) -> bool {
        lock(&self.state).is_loading()
    }

    pub fn state(&self) -> RequestState<Value> {
        lock(&self.state).clone()
    }

    /// Raw body of the last settled request, success or failure.
    pub fn response(&self) -> Option<Value> {
        lock(&self.response).clone()
    }

    pub fn dispatch(&self, body: &Value, label: &str) -> MutationOutcome {
        self.run(label, |client| client.send_json(self.method, &self.path, body))
    }

    pub fn dispatch_multipart(
        &self,
        fields: &Value,
        file_field: &str,
        upload: &ImageUpload,
        label: &str,
    ) -> MutationOutcome {
        self.run(label, |client| {
            client.send_multipart(self.method, &self.path, fields, file_field, upload)
        })
    }

    fn run(
        &self,
        label: &str,
        send: impl FnOnce(&Client) -> Result<Value, ApiError>,
    ) -> MutationOutcome {
        let _guard = LoadingGuard::enter(&self.state);
        tracing::debug!(method = self.method.as_str(), path = %self.path, label, "dispatch");

        match send(&self.client) {
            Ok(payload) => {
                self.notifier.notify(Notification::success(label));
                *lock(&self.response) = Some(payload.clone());
                *lock(&self.state) = RequestState::Succeeded(payload.clone());
                MutationOutcome::Succeeded(payload)
            }
            Err(error) => {
                tracing::warn!(path = %self.path, label, "mutation failed: {error}");
                let rejection = Rejection::from(error);
                for message in &rejection.messages {
                    self.notifier.notify(Notification::error(message.clone()));
                }
                *lock(&self.response) = Some(rejection.body.clone());
                *lock(&self.state) = RequestState::Failed(rejection.messages.join("; "));
                MutationOutcome::Rejected(rejection)
            }
        }
    }
}

/// Resets a still-loading state when the call unwinds.
struct LoadingGuard<'a> {
    state: &'a Mutex<RequestState<Value>>,
}

impl<'a> LoadingGuard<'a> {
    fn enter(state: &'a Mutex<RequestState<Value>>) -> Self {
        *lock(state) = RequestState::Loading;
        Self { state }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        if state.is_loading() {
            *state = RequestState::Idle;
        }
    }
}

/// Validates a form locally, then sends it to its own endpoint. Local
/// validation failures are notified without touching the network.
pub fn submit_form(
    client: &Client,
    notifier: Arc<dyn Notifier>,
    form: &FormPayload,
) -> MutationOutcome {
    if let Err(error) = form.validate() {
        let message = error.to_string();
        notifier.notify(Notification::error(message.clone()));
        return MutationOutcome::Rejected(Rejection {
            status: None,
            body: Value::Null,
            messages: vec![message],
        });
    }

    let dispatcher = MutationDispatcher::new(client.clone(), form.path(), form.method(), notifier);
    let label = form.action_label();
    match form.multipart_image() {
        Some(image) => dispatcher.dispatch_multipart(&form.body(), "image", image, &label),
        None => dispatcher.dispatch(&form.body(), &label),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
