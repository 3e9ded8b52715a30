// src/services/identity.rs

use async_trait::async_trait;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;

use crate::models::rep::IdentityUser;

/// Causes are kept distinct so the auth gate can return a different 401
/// reason for each.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Authentication token is invalid or expired.")]
    InvalidToken,

    #[error("Authentication token has no subject.")]
    MissingSubject,

    #[error("User record could not be found.")]
    UserNotFound,

    #[error("Identity provider is unavailable.")]
    Unavailable,
}

/// Boundary to the external identity provider. Verification yields a stable
/// uid; the full user record (email included) is always resolved live and
/// never persisted.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify_token(&self, token: &str) -> Result<String, IdentityError>;
    async fn get_user(&self, uid: &str) -> Result<IdentityUser, IdentityError>;
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[allow(dead_code)]
    exp: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GatewayUser {
    uid: String,
    email: Option<String>,
    display_name: Option<String>,
}

/// Production identity provider: verifies the gateway's HS256 tokens locally
/// and looks the user record up over HTTP.
pub struct GatewayIdentityProvider {
    decoding_key: DecodingKey,
    http: reqwest::Client,
    api_url: String,
}

impl GatewayIdentityProvider {
    pub fn new(jwt_secret: String, api_url: String) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(jwt_secret.as_ref()),
            http: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl IdentityProvider for GatewayIdentityProvider {
    async fn verify_token(&self, token: &str) -> Result<String, IdentityError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|_| IdentityError::InvalidToken)?;

        if data.claims.sub.is_empty() {
            return Err(IdentityError::MissingSubject);
        }
        Ok(data.claims.sub)
    }

    async fn get_user(&self, uid: &str) -> Result<IdentityUser, IdentityError> {
        let url = format!("{}/v1/users/{}", self.api_url, uid);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|_| IdentityError::Unavailable)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(IdentityError::UserNotFound);
        }
        if !response.status().is_success() {
            return Err(IdentityError::Unavailable);
        }

        let user = response
            .json::<GatewayUser>()
            .await
            .map_err(|_| IdentityError::Unavailable)?;

        Ok(IdentityUser {
            uid: user.uid,
            email: user.email,
            display_name: user.display_name,
        })
    }
}
