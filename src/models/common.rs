use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::VerificationChannel;
use crate::models::{
    AuthResponse, MovieResponse, PaymentMethodResponse, PurchaseResponse, RefreshTokenResponse,
    UserResponse,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[aliases(
    UserApiResponse = ApiResponse<UserResponse>,
    AuthApiResponse = ApiResponse<AuthResponse>,
    RefreshApiResponse = ApiResponse<RefreshTokenResponse>,
    MovieApiResponse = ApiResponse<MovieResponse>,
    PurchaseApiResponse = ApiResponse<PurchaseResponse>,
    PaymentMethodListApiResponse = ApiResponse<Vec<PaymentMethodResponse>>,
)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    /// 尚未验证的渠道，仅 UNVERIFIED_ACCOUNT 携带
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<Vec<VerificationChannel>>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn error(error: ApiError) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(error),
        }
    }
}
