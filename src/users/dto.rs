use serde::{Deserialize, Serialize};

use super::repo_types::{User, UserProfile};
use crate::error::ApiError;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_NAME_LEN: usize = 50;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub profile: Option<UserProfile>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

/// Body of a successful register/login/refresh.
#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub user: User,
    pub token: String,
    pub refresh_token: String,
}

/// Trims `name` and enforces the length rules.
pub fn clean_name(name: &str) -> Result<String, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Name is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

pub fn check_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn check_profile(profile: &UserProfile) -> Result<(), ApiError> {
    if matches!(profile.height, Some(h) if !h.is_finite() || h < 0.0) {
        return Err(ApiError::bad_request("Height must be a positive number"));
    }
    if matches!(profile.weight, Some(w) if !w.is_finite() || w < 0.0) {
        return Err(ApiError::bad_request("Weight must be a positive number"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(clean_name("  Asha ").unwrap(), "Asha");
        assert!(clean_name("   ").is_err());
        assert!(clean_name(&"x".repeat(51)).is_err());
        assert!(clean_name(&"x".repeat(50)).is_ok());
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(check_password("12345").is_err());
        assert!(check_password("123456").is_ok());
    }

    #[test]
    fn negative_weight_is_rejected() {
        let profile = UserProfile {
            weight: Some(-3.0),
            ..Default::default()
        };
        assert!(check_profile(&profile).is_err());
    }
}
