use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{ReindexError, Result};
use crate::settings::{Settings, GRAPH_SCOPE};

const EXPIRY_SKEW_SECS: i64 = 10;

const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Bearer credential for the Graph API.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Credential(token.into())
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }

    pub fn is_expired(&self) -> bool {
        is_token_expired_at(&self.0, chrono::Utc::now().timestamp())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(..)")
    }
}

#[derive(Deserialize)]
struct Claims {
    // NumericDate; may carry a fractional part.
    exp: Option<f64>,
}

/// A token counts as expired within the skew window before `exp`, or when
/// its payload cannot be read.
pub fn is_token_expired_at(token: &str, now: i64) -> bool {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return true;
    }
    let exp = PAYLOAD_ENGINE
        .decode(parts[1])
        .ok()
        .and_then(|bytes| serde_json::from_slice::<Claims>(&bytes).ok())
        .and_then(|claims| claims.exp)
        .filter(|exp| exp.is_finite());
    match exp {
        Some(exp) => now >= (exp.floor() as i64).saturating_sub(EXPIRY_SKEW_SECS),
        None => true,
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Client-credentials token source with an in-memory cache.
pub struct TokenProvider {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    // Held across the exchange so concurrent callers share one refresh.
    cached: Mutex<Option<Credential>>,
}

impl TokenProvider {
    pub fn new(http: reqwest::Client, settings: &Settings) -> Self {
        TokenProvider {
            http,
            token_url: format!(
                "{}/{}/oauth2/v2.0/token",
                settings.authority_host, settings.tenant_id
            ),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            cached: Mutex::new(None),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_credential(mut self, credential: Credential) -> Self {
        self.cached = Mutex::new(Some(credential));
        self
    }

    pub async fn get_token(&self) -> Result<Credential> {
        let mut cached = self.cached.lock().await;
        if let Some(credential) = cached.as_ref() {
            if !credential.is_expired() {
                return Ok(credential.clone());
            }
        }

        info!("fetching access token...");
        let credential = self.exchange().await?;
        info!("token fetched.");
        *cached = Some(credential.clone());
        Ok(credential)
    }

    async fn exchange(&self) -> Result<Credential> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
                ("scope", GRAPH_SCOPE),
            ])
            .send()
            .await
            .map_err(|e| ReindexError::Auth(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReindexError::Auth(format!("token endpoint returned {}", status)));
        }
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| ReindexError::Auth(e.to_string()))?;
        Ok(Credential::new(body.access_token))
    }
}

/// Build an unsigned JWT-shaped token with the given `exp` claim.
#[cfg(test)]
pub(crate) fn fake_token(exp: i64) -> String {
    let header = PAYLOAD_ENGINE.encode(br#"{"alg":"none"}"#);
    let payload = PAYLOAD_ENGINE.encode(format!(r#"{{"exp":{}}}"#, exp));
    format!("{}.{}.sig", header, payload)
}
