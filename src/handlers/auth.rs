use actix_web::{HttpResponse, ResponseError, Result, web};

use crate::entities::VerificationChannel;
use crate::error::AppError;
use crate::models::*;
use crate::services::{AuthService, VerificationService};

fn parse_channel(value: &str) -> Result<VerificationChannel, AppError> {
    VerificationChannel::parse(value).ok_or_else(|| {
        AppError::ValidationError(format!(
            "Invalid verification type: {value}. Expected 'email' or 'mobile'"
        ))
    })
}

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "注册成功，验证码已发送", body = UserResponse),
        (status = 400, description = "请求参数错误"),
        (status = 409, description = "用户名、邮箱或手机号已被占用")
    )
)]
pub async fn register(
    auth_service: web::Data<AuthService>,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    match auth_service.register(request.into_inner()).await {
        Ok(user) => Ok(HttpResponse::Created().json(ApiResponse::success_with_message(
            user,
            "User registered successfully. Please check your email and phone for verification codes.",
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "登录成功", body = AuthResponse),
        (status = 401, description = "用户名或密码错误"),
        (status = 403, description = "邮箱或手机号未验证")
    )
)]
pub async fn login(
    auth_service: web::Data<AuthService>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    match auth_service.authenticate(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/verify/{channel}",
    tag = "auth",
    params(
        ("channel" = String, Path, description = "email 或 mobile")
    ),
    request_body = VerificationRequest,
    responses(
        (status = 200, description = "验证成功"),
        (status = 400, description = "验证码无效或已过期"),
        (status = 404, description = "用户不存在")
    )
)]
pub async fn verify(
    verification_service: web::Data<VerificationService>,
    path: web::Path<String>,
    request: web::Json<VerificationRequest>,
) -> Result<HttpResponse> {
    let channel = match parse_channel(&path.into_inner()) {
        Ok(channel) => channel,
        Err(e) => return Ok(e.error_response()),
    };

    match verification_service
        .verify(&request.username, request.code.trim(), channel)
        .await
    {
        Ok(_) => {
            let message = match channel {
                VerificationChannel::Email => "Email verified successfully",
                VerificationChannel::Mobile => "Mobile number verified successfully",
            };
            Ok(HttpResponse::Ok().json(ApiResponse::message(message)))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/resend-otp",
    tag = "auth",
    request_body = OtpRequest,
    responses(
        (status = 200, description = "验证码已重新发送"),
        (status = 400, description = "验证类型无效"),
        (status = 404, description = "用户不存在")
    )
)]
pub async fn resend_otp(
    verification_service: web::Data<VerificationService>,
    request: web::Json<OtpRequest>,
) -> Result<HttpResponse> {
    let channel = match parse_channel(&request.channel_type) {
        Ok(channel) => channel,
        Err(e) => return Ok(e.error_response()),
    };

    match verification_service.resend(&request.username, channel).await {
        Ok(()) => {
            let message = match channel {
                VerificationChannel::Email => "Verification email sent successfully",
                VerificationChannel::Mobile => "Verification SMS sent successfully",
            };
            Ok(HttpResponse::Ok().json(ApiResponse::message(message)))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "auth",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "刷新令牌成功", body = RefreshTokenResponse),
        (status = 401, description = "无效的刷新令牌")
    )
)]
pub async fn refresh(
    auth_service: web::Data<AuthService>,
    request: web::Json<RefreshTokenRequest>,
) -> Result<HttpResponse> {
    match auth_service.refresh(&request.refresh_token).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    request_body = LogoutRequest,
    responses(
        (status = 200, description = "登出成功")
    )
)]
pub async fn logout(
    auth_service: web::Data<AuthService>,
    request: Option<web::Json<LogoutRequest>>,
) -> Result<HttpResponse> {
    let refresh_token = request.and_then(|r| r.into_inner().refresh_token);
    match auth_service.logout(refresh_token.as_deref()).await {
        Ok(()) => {
            Ok(HttpResponse::Ok().json(ApiResponse::message("Logged out successfully")))
        }
        Err(e) => Ok(e.error_response()),
    }
}

pub fn auth_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/verify/{channel}", web::post().to(verify))
            .route("/resend-otp", web::post().to(resend_otp))
            .route("/refresh", web::post().to(refresh))
            .route("/logout", web::post().to(logout)),
    );
}
