//! Identity tokens
//!
//! The portal's auth provider issues HS256 JWTs whose `sub` is the user's id.
//! The engine never authenticates anyone; it only checks the signature and
//! expiry and trusts the resolved identity.

use chrono::{Duration, Utc};
use engage_core::Snowflake;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display name shown in notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Claims {
    pub fn user_id(&self) -> Result<Snowflake, AppError> {
        Snowflake::parse(&self.sub).map_err(|_| AppError::InvalidToken)
    }
}

#[derive(Clone)]
pub struct IdentityVerifier {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
    issuer: Option<String>,
}

impl IdentityVerifier {
    #[must_use]
    pub fn new(secret: &str, issuer: Option<String>) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            issuer,
        }
    }

    /// Validate signature, expiry and (if configured) issuer
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => AppError::InvalidToken,
            }
        })?;
        // reject tokens whose subject is not an id up front
        data.claims.user_id()?;
        Ok(data.claims)
    }

    /// Mint a token the way the auth provider would. Used by local tooling
    /// and tests; production tokens come from the provider.
    pub fn issue(
        &self,
        user_id: Snowflake,
        name: Option<&str>,
        ttl: Duration,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: self.issuer.clone(),
            email: None,
            name: name.map(String::from),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(anyhow::anyhow!("failed to encode token: {e}")))
    }
}

impl std::fmt::Debug for IdentityVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityVerifier")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}
