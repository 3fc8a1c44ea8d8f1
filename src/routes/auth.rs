use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::state::AppState;

/// Authenticated caller, resolved from the `Authorization: Bearer` header via
/// the identity provider. Rejects with 401 when the header is missing or the
/// token resolves to nobody.
pub struct ApiUser(pub Uuid);

impl FromRequestParts<AppState> for ApiUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ServiceError::Unauthenticated)?;

        let user_id = state
            .identity
            .current_user(token)
            .await?
            .ok_or(ServiceError::Unauthenticated)?;

        Ok(ApiUser(user_id))
    }
}
