//! OAuth2 JWT-bearer token exchange for service-account credentials.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use docextract_config::ServiceAccountCredentials;
use docextract_core::ExtractError;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::transport::{classify_send_error, service_error, with_deadline};

pub const VISION_SCOPE: &str = "https://www.googleapis.com/auth/cloud-vision";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3_600;
/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_after: DateTime<Utc>,
}

/// Issues access tokens for one service account, caching between calls.
pub struct TokenProvider {
    http: reqwest::Client,
    credentials: ServiceAccountCredentials,
    token_uri: String,
    timeout: Duration,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(
        http: reqwest::Client,
        credentials: ServiceAccountCredentials,
        token_uri: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            credentials,
            token_uri: token_uri.into(),
            timeout,
            cached: Mutex::new(None),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.credentials.project_id
    }

    /// A valid access token, fetched only when the cached one is near expiry.
    pub async fn access_token(&self) -> Result<String, ExtractError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.refresh_after > Utc::now() {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.fetch().await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String, ExtractError> {
        let claims = Claims {
            iss: &self.credentials.client_email,
            scope: VISION_SCOPE,
            aud: &self.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
            .map_err(|e| ExtractError::Configuration(format!("service-account private key is unusable: {e}")))?;
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| ExtractError::Configuration(format!("could not sign token assertion: {e}")))
    }

    async fn fetch(&self) -> Result<CachedToken, ExtractError> {
        let now = Utc::now();
        let assertion = self.assertion(now)?;
        debug!(token_uri = %self.token_uri, client = %self.credentials.client_email, "Requesting access token");

        let body: TokenResponse = with_deadline(self.timeout, async {
            let resp = self
                .http
                .post(&self.token_uri)
                .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
                .send()
                .await
                .map_err(|e| classify_send_error(e, self.timeout))?;
            if !resp.status().is_success() {
                return Err(service_error(resp).await);
            }
            resp.json::<TokenResponse>()
                .await
                .map_err(|e| ExtractError::InvalidResponse(format!("token response: {e}")))
        })
        .await?;

        let lifetime = (body.expires_in - EXPIRY_MARGIN_SECS).max(0);
        Ok(CachedToken {
            value: body.access_token,
            refresh_after: now + ChronoDuration::seconds(lifetime),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation};

    const TEST_KEY: &str = include_str!("../tests/fixtures/service_account_key.pem");

    #[derive(Debug, Deserialize)]
    struct DecodedClaims {
        iss: String,
        scope: String,
        aud: String,
    }

    #[test]
    fn assertion_is_signed_rs256_with_expected_claims() {
        let creds = ServiceAccountCredentials::from_parts("proj", TEST_KEY, "svc@proj.iam.gserviceaccount.com").unwrap();
        let provider = TokenProvider::new(
            reqwest::Client::new(),
            creds,
            "https://oauth2.example/token",
            Duration::from_secs(5),
        );
        let jwt = provider.assertion(Utc::now()).unwrap();

        let header = jsonwebtoken::decode_header(&jwt).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);

        // Signature is checked elsewhere by the token endpoint; inspect claims only.
        let mut validation = Validation::new(Algorithm::RS256);
        validation.insecure_disable_signature_validation();
        validation.set_audience(&["https://oauth2.example/token"]);
        let data = jsonwebtoken::decode::<DecodedClaims>(&jwt, &DecodingKey::from_secret(b""), &validation).unwrap();
        assert_eq!(data.claims.iss, "svc@proj.iam.gserviceaccount.com");
        assert_eq!(data.claims.scope, VISION_SCOPE);
        assert_eq!(data.claims.aud, "https://oauth2.example/token");
    }

    #[test]
    fn bad_key_is_configuration_error() {
        let creds = ServiceAccountCredentials::from_parts("proj", "not a pem", "svc@proj").unwrap();
        let provider = TokenProvider::new(reqwest::Client::new(), creds, "http://t", Duration::from_secs(1));
        let err = provider.assertion(Utc::now()).unwrap_err();
        assert!(matches!(err, ExtractError::Configuration(_)));
    }
}
