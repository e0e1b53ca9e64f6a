use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        check_password, check_profile, clean_name, AuthPayload, ChangePasswordRequest,
        LoginRequest, RefreshRequest, RegisterRequest, SetActiveRequest, UpdateProfileRequest,
    },
    repo::DuplicateEmail,
    repo_types::{NewUser, Role, User},
};
use crate::{
    auth::{hash_password, is_valid_email, verify_password, AdminUser, AuthUser, DoctorUser, JwtKeys},
    error::{ApiError, ApiResult},
    extract::{AppJson, AppPath},
    response::{ApiResponse, MessageResponse},
    state::AppState,
};

fn issue_tokens(state: &AppState, user: User) -> ApiResult<AuthPayload> {
    let keys = JwtKeys::from_ref(state);
    let token = keys.sign_access(user.id, user.role)?;
    let refresh_token = keys.sign_refresh(user.id, user.role)?;
    Ok(AuthPayload {
        user,
        token,
        refresh_token,
    })
}

fn required(value: Option<String>, field: &str) -> ApiResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("{field} is required")))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<AuthPayload>>)> {
    let name = clean_name(&required(payload.name, "Name")?)?;
    let email = required(payload.email, "Email")?.trim().to_lowercase();
    let password = required(payload.password, "Password")?;

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::bad_request("Please enter a valid email"));
    }
    check_password(&password)?;

    let role = match payload.role.as_deref() {
        None => Role::Patient,
        Some(r) => match Role::parse(r) {
            Some(Role::Admin) => {
                warn!(email = %email, "attempt to self-register as admin");
                return Err(ApiError::bad_request("Role cannot be self-assigned"));
            }
            Some(role) => role,
            None => return Err(ApiError::bad_request("Role must be patient or doctor")),
        },
    };

    if state.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::Conflict("User already exists with this email".into()));
    }

    let password_hash = hash_password(&password)?;
    let user = state
        .users
        .create(NewUser {
            name,
            email,
            password_hash,
            role,
        })
        .await
        .map_err(|e| {
            if e.is::<DuplicateEmail>() {
                warn!("email registered concurrently");
                ApiError::Conflict("User already exists with this email".into())
            } else {
                ApiError::Internal(e)
            }
        })?;

    info!(user_id = %user.id, email = %user.email, role = user.role.as_str(), "user registered");
    let payload = issue_tokens(&state, user)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(payload, "User registered successfully")),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> ApiResult<Json<ApiResponse<AuthPayload>>> {
    let email = required(payload.email, "Email")?.trim().to_lowercase();
    let password = required(payload.password, "Password")?;

    let Some(mut user) = state.users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(ApiError::unauthorized("Invalid credentials"));
    };

    if !verify_password(&password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    if !user.is_active {
        warn!(user_id = %user.id, "login to deactivated account");
        return Err(ApiError::unauthorized("Account is deactivated"));
    }

    state.users.touch_last_login(user.id).await?;
    if let Some(fresh) = state.users.find_by_id(user.id).await? {
        user = fresh;
    }

    info!(user_id = %user.id, "user logged in");
    let payload = issue_tokens(&state, user)?;
    Ok(Json(ApiResponse::with_message(payload, "Login successful")))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshRequest>,
) -> ApiResult<Json<ApiResponse<AuthPayload>>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&payload.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        ApiError::unauthorized("Invalid refresh token")
    })?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    let payload = issue_tokens(&state, user)?;
    Ok(Json(ApiResponse::ok(payload)))
}

#[instrument(skip(user), fields(user_id = %user.id))]
pub async fn get_profile(AuthUser(user): AuthUser) -> ApiResult<Json<ApiResponse<User>>> {
    Ok(Json(ApiResponse::ok(user)))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> ApiResult<Json<ApiResponse<User>>> {
    let name = payload.name.as_deref().map(clean_name).transpose()?;
    if let Some(profile) = &payload.profile {
        check_profile(profile)?;
    }

    let updated = state
        .users
        .update_profile(user.id, name, payload.profile)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!("profile updated");
    Ok(Json(ApiResponse::with_message(
        updated,
        "Profile updated successfully",
    )))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let current = required(payload.current_password, "Current password")?;
    let new = required(payload.new_password, "New password")?;

    if !verify_password(&current, &user.password_hash)? {
        warn!("change-password with wrong current password");
        return Err(ApiError::bad_request("Current password is incorrect"));
    }
    check_password(&new)?;

    let hash = hash_password(&new)?;
    state.users.update_password(user.id, &hash).await?;

    info!("password changed");
    Ok(Json(MessageResponse::new("Password changed successfully")))
}

#[instrument(skip(state, doctor), fields(doctor_id = %doctor.id))]
pub async fn list_patients(
    State(state): State<AppState>,
    DoctorUser(doctor): DoctorUser,
) -> ApiResult<Json<ApiResponse<Vec<User>>>> {
    let patients = state.users.list_patients_of(doctor.id).await?;
    Ok(Json(ApiResponse::ok(patients)))
}

#[instrument(skip(state, _admin))]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Json<ApiResponse<Vec<User>>>> {
    let users = state.users.list_all().await?;
    Ok(Json(ApiResponse::ok(users)))
}

#[instrument(skip(state, admin, payload), fields(admin_id = %admin.id))]
pub async fn set_user_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(user_id): AppPath<Uuid>,
    AppJson(payload): AppJson<SetActiveRequest>,
) -> ApiResult<Json<ApiResponse<User>>> {
    if user_id == admin.id && !payload.is_active {
        return Err(ApiError::bad_request("Cannot deactivate your own account"));
    }
    let user = state
        .users
        .set_active(user_id, payload.is_active)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!(user_id = %user.id, is_active = user.is_active, "user status changed");
    let message = if user.is_active {
        "User activated"
    } else {
        "User deactivated"
    };
    Ok(Json(ApiResponse::with_message(user, message)))
}
