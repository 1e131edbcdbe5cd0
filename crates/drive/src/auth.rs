//! OAuth access tokens for a service account (JWT bearer grant).

use crate::credentials::ServiceAccountKey;
use chrono::{DateTime, Duration, Utc};
use itt_core::{AppError, AppResult};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Tokens are renewed this long before they expire.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
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
    expires_at: DateTime<Utc>,
}

/// Exchanges a signed assertion for an access token and caches it.
pub struct TokenSource {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    scope: String,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    pub fn new(key: ServiceAccountKey, http: reqwest::Client) -> AppResult<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            AppError::Config(format!("Service-account private key is not valid RSA PEM: {}", e))
        })?;

        Ok(Self {
            key,
            encoding_key,
            scope: DRIVE_READONLY_SCOPE.to_string(),
            http,
            cached: Mutex::new(None),
        })
    }

    fn claims(&self, now: DateTime<Utc>) -> Claims {
        Claims {
            iss: self.key.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.key.token_uri.clone(),
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        }
    }

    fn assertion(&self, now: DateTime<Utc>) -> AppResult<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        jsonwebtoken::encode(&header, &self.claims(now), &self.encoding_key)
            .map_err(|e| AppError::Drive(format!("Failed to sign token request: {}", e)))
    }

    /// A valid bearer token, fetching a new one when the cached one is
    /// missing or about to expire.
    pub async fn access_token(&self) -> AppResult<String> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref() {
            if token.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) > now {
                return Ok(token.value.clone());
            }
        }

        tracing::debug!("Requesting access token for {}", self.key.client_email);
        let assertion = self.assertion(now)?;
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| AppError::Drive(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Drive(format!(
                "Token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Drive(format!("Invalid token response: {}", e)))?;

        let value = token.access_token;
        *cached = Some(CachedToken {
            value: value.clone(),
            expires_at: now + Duration::seconds(token.expires_in),
        });

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(private_key: &str) -> ServiceAccountKey {
        ServiceAccountKey {
            client_email: "sync@itt.iam.gserviceaccount.com".to_string(),
            private_key: private_key.to_string(),
            private_key_id: Some("k1".to_string()),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
        }
    }

    #[test]
    fn test_invalid_pem_is_config_error() {
        let result = TokenSource::new(key("not a pem"), reqwest::Client::new());
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_claims_serialization() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let claims = Claims {
            iss: "sync@itt.iam.gserviceaccount.com".to_string(),
            scope: DRIVE_READONLY_SCOPE.to_string(),
            aud: "https://oauth2.googleapis.com/token".to_string(),
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["scope"], DRIVE_READONLY_SCOPE);
        assert_eq!(json["exp"].as_i64().unwrap() - json["iat"].as_i64().unwrap(), 3600);
    }

    #[test]
    fn test_token_response_defaults_expiry() {
        let token: TokenResponse = serde_json::from_str(r#"{"access_token": "ya29"}"#).unwrap();
        assert_eq!(token.access_token, "ya29");
        assert_eq!(token.expires_in, 3600);
    }
}
