use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::{claims::TokenKind, jwt::JwtKeys};
use crate::{
    error::ApiError,
    state::AppState,
    users::repo_types::{Role, User},
};

/// The authenticated caller, reloaded from the user store on every request.
pub struct AuthUser(pub User);

/// An authenticated caller with the doctor role.
pub struct DoctorUser(pub User);

/// An authenticated caller with the admin role.
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Access denied. No token provided."))?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::unauthorized("Invalid authorization scheme"))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            ApiError::unauthorized("Invalid or expired token")
        })?;

        if claims.kind != TokenKind::Access {
            return Err(ApiError::unauthorized("Access token required"));
        }

        let user = state
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Invalid token. User not found."))?;

        if !user.is_active {
            warn!(user_id = %user.id, "inactive account used a valid token");
            return Err(ApiError::unauthorized("Account is deactivated"));
        }

        Ok(AuthUser(user))
    }
}

async fn require_role(parts: &mut Parts, state: &AppState, role: Role) -> Result<User, ApiError> {
    let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
    if user.role != role {
        warn!(user_id = %user.id, role = user.role.as_str(), required = role.as_str(), "role check failed");
        return Err(ApiError::forbidden(format!(
            "Access denied. {} role required.",
            role.as_str()
        )));
    }
    Ok(user)
}

#[async_trait]
impl FromRequestParts<AppState> for DoctorUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Doctor).await.map(DoctorUser)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Admin).await.map(AdminUser)
    }
}
