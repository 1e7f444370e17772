use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::entities::VerificationChannel;
use crate::models::{ApiError, ApiResponse};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("{}", unverified_message(.0))]
    UnverifiedAccount(Vec<VerificationChannel>),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{}", invalid_verification_message(.expired))]
    InvalidVerification { expired: bool },

    #[error("Payment blocked: {0}")]
    PaymentBlocked(String),

    #[error("You have already purchased this movie")]
    AlreadyPurchased,

    #[error("Configuration fault: {0}")]
    ConfigurationFault(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),
}

fn unverified_message(pending: &[VerificationChannel]) -> &'static str {
    let email = pending.contains(&VerificationChannel::Email);
    let mobile = pending.contains(&VerificationChannel::Mobile);
    match (email, mobile) {
        (true, true) => "Both email and mobile number need to be verified",
        (true, false) => "Email needs to be verified",
        (false, true) => "Mobile number needs to be verified",
        (false, false) => "Account needs to be verified",
    }
}

fn invalid_verification_message(expired: &bool) -> &'static str {
    if *expired {
        "Verification code has expired"
    } else {
        "Invalid or expired verification code"
    }
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::AlreadyExists(_) => "ALREADY_EXISTS",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::UnverifiedAccount(_) => "UNVERIFIED_ACCOUNT",
            AppError::InvalidToken(_) => "INVALID_TOKEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidVerification { expired: true } => "VERIFICATION_EXPIRED",
            AppError::InvalidVerification { expired: false } => "INVALID_VERIFICATION",
            AppError::PaymentBlocked(_) => "PAYMENT_BLOCKED",
            AppError::AlreadyPurchased => "ALREADY_PURCHASED",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::Forbidden => "FORBIDDEN",
            AppError::ExternalApiError(_) => "EXTERNAL_API_ERROR",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::ConfigurationFault(_) => "CONFIGURATION_FAULT",
            _ => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::AlreadyExists(_) | AppError::AlreadyPurchased => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            AppError::UnverifiedAccount(_) | AppError::PaymentBlocked(_) | AppError::Forbidden => {
                StatusCode::FORBIDDEN
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidVerification { .. } | AppError::ValidationError(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::ExternalApiError(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let message = if status_code.is_server_error() {
            log::error!("{}: {self}", self.error_code());
            match self {
                AppError::DatabaseError(_) => "Database error".to_string(),
                AppError::ExternalApiError(msg) => msg.clone(),
                _ => "Internal server error".to_string(),
            }
        } else {
            match self {
                AppError::InvalidCredentials
                | AppError::InvalidToken(_)
                | AppError::UnverifiedAccount(_)
                | AppError::PaymentBlocked(_)
                | AppError::Forbidden => log::warn!("Request refused: {self}"),
                _ => {}
            }
            self.to_string()
        };

        let pending = match self {
            AppError::UnverifiedAccount(pending) => Some(pending.clone()),
            _ => None,
        };

        HttpResponse::build(status_code).json(ApiResponse::error(ApiError {
            code: self.error_code().to_string(),
            message,
            pending,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::AlreadyExists("Username is already taken".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::UnverifiedAccount(vec![VerificationChannel::Mobile]).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::NotFound("User".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::InvalidVerification { expired: true }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::AlreadyPurchased.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::ConfigurationFault("Role USER is not found".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unverified_message() {
        let both = AppError::UnverifiedAccount(vec![
            VerificationChannel::Email,
            VerificationChannel::Mobile,
        ]);
        assert_eq!(
            both.to_string(),
            "Both email and mobile number need to be verified"
        );
        let mobile = AppError::UnverifiedAccount(vec![VerificationChannel::Mobile]);
        assert_eq!(mobile.to_string(), "Mobile number needs to be verified");
    }

    #[test]
    fn test_server_errors_do_not_leak_details() {
        let resp = AppError::ConfigurationFault("Role USER is not found".into()).error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
