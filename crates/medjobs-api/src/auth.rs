// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use medjobs_app::{
    FormPayload, LoginFormInput, MutationMethod, RegisterFormInput, Session, SessionUser,
};
use serde_json::Value;
use time::OffsetDateTime;

use crate::{ApiError, Client};

pub fn login(client: &Client, form: &LoginFormInput) -> Result<Session> {
    form.validate()?;
    authenticate(client, &FormPayload::Login(form.clone()))
}

pub fn register(client: &Client, form: &RegisterFormInput) -> Result<Session> {
    form.validate()?;
    authenticate(client, &FormPayload::Register(form.clone()))
}

fn authenticate(client: &Client, form: &FormPayload) -> Result<Session> {
    let path = form.path();
    let response = client.send_json(MutationMethod::Post, &path, &form.body())?;
    let session = session_from_response(&path, &response)?;
    tracing::info!(user = %session.user.id, "authenticated");
    Ok(session)
}

/// Builds a session from an auth response: `{token, user}` at the top level
/// or nested under `data`.
pub fn session_from_response(path: &str, response: &Value) -> Result<Session, ApiError> {
    let envelope = match response.get("data") {
        Some(data) if data.get("token").is_some() || data.get("access_token").is_some() => data,
        _ => response,
    };

    let token = ["token", "access_token"]
        .iter()
        .find_map(|key| envelope.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Decode {
            path: path.to_owned(),
            reason: "response has no token".to_owned(),
        })?;

    let user = envelope
        .get("user")
        .cloned()
        .ok_or_else(|| ApiError::Decode {
            path: path.to_owned(),
            reason: "response has no user".to_owned(),
        })?;
    let user: SessionUser = serde_json::from_value(user).map_err(|error| ApiError::Decode {
        path: path.to_owned(),
        reason: format!("invalid user: {error}"),
    })?;

    Ok(Session {
        token: token.to_owned(),
        user,
        signed_in_at: Some(OffsetDateTime::now_utc()),
    })
}
