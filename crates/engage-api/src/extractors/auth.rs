//! Authentication extractor
//!
//! Resolves the caller from a bearer token issued by the portal's auth
//! provider. The display name claim is carried into notification text.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use engage_core::{Actor, Snowflake};

use crate::response::ApiError;
use crate::state::AppState;

/// Authenticated caller
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub actor: Actor,
}

impl AuthUser {
    pub fn user_id(&self) -> Snowflake {
        self.actor.id
    }

    /// Verify a raw token against the configured verifier
    pub fn from_token(state: &AppState, token: &str) -> Result<Self, ApiError> {
        let claims = state.verifier().verify(token).map_err(|e| {
            tracing::warn!(error = %e, "Rejected identity token");
            ApiError::App(e)
        })?;
        let id = claims.user_id()?;
        Ok(Self {
            actor: Actor {
                id,
                display_name: claims.name,
            },
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::MissingAuth)?;

        let app_state = AppState::from_ref(state);
        AuthUser::from_token(&app_state, bearer.token())
    }
}
