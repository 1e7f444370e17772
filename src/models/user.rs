use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{RoleName, VerificationChannel, user_entity};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "s3cret!")]
    pub password: String,
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[schema(example = "+15550001111")]
    pub mobile_number: String,
    #[schema(example = "Alice Liddell")]
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "s3cret!")]
    pub password: String,
}

/// Session bundle returned on successful login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub username: String,
    pub email_verified: bool,
    pub mobile_verified: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerificationRequest {
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "042913")]
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OtpRequest {
    #[schema(example = "alice")]
    pub username: String,
    /// "email" or "mobile"
    #[serde(rename = "type")]
    #[schema(example = "email")]
    pub channel_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub mobile_number: String,
    pub full_name: String,
    pub email_verified: bool,
    pub mobile_verified: bool,
    pub active: bool,
    pub roles: Vec<RoleName>,
    pub pending_verifications: Vec<VerificationChannel>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl UserResponse {
    pub fn from_model(user: user_entity::Model, roles: Vec<RoleName>) -> Self {
        let pending_verifications = user.pending_channels();
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            mobile_number: user.mobile_number,
            full_name: user.full_name,
            email_verified: user.email_verified,
            mobile_verified: user.mobile_verified,
            active: user.active,
            roles,
            pending_verifications,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}
