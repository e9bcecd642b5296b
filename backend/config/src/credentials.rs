//! Service-account credential bundle for the vision backend.
//!
//! The bundle usually arrives through a single environment variable, which
//! deployment tooling tends to mangle: escaped quotes, literal `\n` sequences,
//! raw newlines inside the key, or a base64 wrapper. Parsing tries each
//! repair in turn and keeps the first that yields a complete bundle.

use base64::{engine::general_purpose, Engine};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("credential bundle could not be parsed: {0}")]
    Unparseable(String),

    #[error("credential bundle is missing `{0}`")]
    MissingField(&'static str),
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccountCredentials {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub private_key: String,
    #[serde(default)]
    pub client_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
}

impl std::fmt::Debug for ServiceAccountCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountCredentials")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"***")
            .finish()
    }
}

impl ServiceAccountCredentials {
    /// Build a bundle from its three parts (e.g. separate env vars).
    pub fn from_parts(
        project_id: impl Into<String>,
        private_key: impl Into<String>,
        client_email: impl Into<String>,
    ) -> Result<Self, CredentialsError> {
        Self {
            project_id: project_id.into(),
            private_key: private_key.into(),
            client_email: client_email.into(),
            token_uri: None,
        }
        .normalized()
    }

    /// Parse a bundle, repairing common env-var corruption.
    pub fn parse(raw: &str) -> Result<Self, CredentialsError> {
        let raw = raw.trim();
        let mut last_error = String::from("empty input");

        for candidate in repair_candidates(raw) {
            match serde_json::from_str::<ServiceAccountCredentials>(&candidate) {
                Ok(creds) => return creds.normalized(),
                Err(e) => last_error = e.to_string(),
            }
        }

        Err(CredentialsError::Unparseable(last_error))
    }

    fn normalized(mut self) -> Result<Self, CredentialsError> {
        self.private_key = self.private_key.replace("\\n", "\n");
        if self.project_id.trim().is_empty() {
            return Err(CredentialsError::MissingField("project_id"));
        }
        if self.private_key.trim().is_empty() {
            return Err(CredentialsError::MissingField("private_key"));
        }
        if self.client_email.trim().is_empty() {
            return Err(CredentialsError::MissingField("client_email"));
        }
        Ok(self)
    }
}

/// Candidate JSON texts, most faithful first.
fn repair_candidates(raw: &str) -> Vec<String> {
    let mut out = vec![raw.to_string()];

    // A JSON string literal wrapping the object.
    if let Ok(inner) = serde_json::from_str::<String>(raw) {
        out.push(inner);
    }

    // Escaped quotes without the outer literal.
    if raw.contains("\\\"") {
        out.push(raw.replace("\\\"", "\""));
    }

    // Raw control characters inside string values.
    out.push(sanitize_control_chars(raw));

    for engine in [&general_purpose::STANDARD, &general_purpose::URL_SAFE] {
        if let Ok(decoded) = engine.decode(raw) {
            if let Ok(text) = String::from_utf8(decoded) {
                out.push(sanitize_control_chars(&text));
                out.push(text);
            }
        }
    }

    out
}

fn sanitize_control_chars(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '\n' | '\u{2028}' | '\u{2029}' => out.push_str("\\n"),
            '\u{a0}' => out.push(' '),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}
