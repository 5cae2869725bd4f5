use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::security::{self, Role};
use crate::core::state::AppState;

/// Identity carried by a verified bearer token.
#[derive(Debug, Clone)]
pub(crate) struct CurrentUser {
    pub(crate) user_id: i64,
    pub(crate) role: Role,
}

impl CurrentUser {
    /// Assessment authoring and full-content reads are limited to teachers and admins.
    pub(crate) fn require_staff(&self) -> Result<(), ApiError> {
        match self.role {
            Role::Admin | Role::Teacher => Ok(()),
            Role::Student => Err(ApiError::Forbidden("Teacher or admin role required")),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let claims = security::verify_token(token, app_state.settings())
            .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;

        Ok(CurrentUser { user_id: claims.user_id, role: claims.role })
    }
}
