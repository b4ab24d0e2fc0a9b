// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde_json::Value;
use thiserror::Error;

pub const GENERIC_ERROR: &str = "Something went wrong -- try again";
pub const NETWORK_ERROR: &str = "Network error -- check your connection and try again";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("cannot reach {base_url} -- check [api].base_url and your connection ({source})")]
    Transport {
        base_url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("server error ({status}): {}", summary(.messages))]
    Status {
        status: u16,
        body: Value,
        messages: Vec<String>,
    },

    #[error("unexpected response from {path}: {reason}")]
    Decode { path: String, reason: String },
}

impl ApiError {
    pub(crate) fn status(status: u16, body: Value) -> Self {
        let messages = error_messages(&body);
        Self::Status {
            status,
            body,
            messages,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Messages to show the user, one per notification.
    pub fn user_messages(&self) -> Vec<String> {
        match self {
            Self::Transport { .. } => vec![NETWORK_ERROR.to_owned()],
            Self::Status { messages, .. } if !messages.is_empty() => messages.clone(),
            Self::Status { .. } | Self::Decode { .. } => vec![GENERIC_ERROR.to_owned()],
        }
    }
}

fn summary(messages: &[String]) -> String {
    if messages.is_empty() {
        GENERIC_ERROR.to_owned()
    } else {
        messages.join("; ")
    }
}

/// Flattens a failure body into display messages.
///
/// An `errors` object yields one message per entry, array entries flattened
/// in order. Otherwise the `error` or `message` string is used. Short plain
/// text bodies are passed through.
pub fn error_messages(body: &Value) -> Vec<String> {
    if let Some(errors) = body.get("errors") {
        let mut messages = Vec::new();
        match errors {
            Value::Object(fields) => {
                for value in fields.values() {
                    push_flattened(value, &mut messages);
                }
            }
            Value::Array(_) => push_flattened(errors, &mut messages),
            _ => {}
        }
        if !messages.is_empty() {
            return messages;
        }
    }

    for key in ["error", "message"] {
        if let Some(text) = body.get(key).and_then(Value::as_str)
            && !text.trim().is_empty()
        {
            return vec![text.to_owned()];
        }
    }

    if let Value::String(text) = body
        && !text.trim().is_empty()
        && text.len() < 100
        && !text.contains('<')
    {
        return vec![text.trim().to_owned()];
    }

    Vec::new()
}

fn push_flattened(value: &Value, messages: &mut Vec<String>) {
    match value {
        Value::Array(entries) => {
            for entry in entries {
                push_flattened(entry, messages);
            }
        }
        Value::String(text) => messages.push(text.clone()),
        Value::Null => {}
        other => messages.push(other.to_string()),
    }
}

/// Parses a response body, keeping non-JSON text as a string value.
pub(crate) fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::{ApiError, GENERIC_ERROR, error_messages, parse_body};
    use serde_json::json;

    #[test]
    fn errors_map_is_flattened_in_order() {
        let body = json!({
            "errors": {
                "email": ["has already been taken", "is invalid"],
                "name": "can't be blank",
                "age": 18,
            }
        });
        assert_eq!(
            error_messages(&body),
            vec![
                "has already been taken".to_owned(),
                "is invalid".to_owned(),
                "can't be blank".to_owned(),
                "18".to_owned(),
            ]
        );
    }

    #[test]
    fn falls_back_to_error_then_message() {
        assert_eq!(error_messages(&json!({"error": "Forbidden"})), vec!["Forbidden"]);
        assert_eq!(error_messages(&json!({"message": "Gone"})), vec!["Gone"]);
        assert_eq!(
            error_messages(&json!({"errors": {}, "message": "Invalid data"})),
            vec!["Invalid data"]
        );
        assert!(error_messages(&json!({"status": "fail"})).is_empty());
    }

    #[test]
    fn plain_text_bodies_pass_through_when_short() {
        assert_eq!(error_messages(&parse_body("Bad Gateway")), vec!["Bad Gateway"]);
        assert!(error_messages(&parse_body("<html>oops</html>")).is_empty());
        assert!(error_messages(&parse_body("")).is_empty());
    }

    #[test]
    fn status_without_messages_uses_generic_text() {
        let error = ApiError::status(500, json!({}));
        assert_eq!(error.user_messages(), vec![GENERIC_ERROR.to_owned()]);
        assert!(error.to_string().contains("server error (500)"));
    }
}
