use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, Set, SqlErr, TransactionTrait,
};
use tokio::sync::Mutex;

use crate::entities::{RoleName, VerificationChannel, user_entity};
use crate::error::{AppError, AppResult};
use crate::models::{AuthResponse, LoginRequest, RefreshTokenResponse, RegisterRequest, UserResponse};
use crate::services::{RoleService, VerificationService};
use crate::utils::*;

pub const TOKEN_TYPE: &str = "Bearer";

#[derive(Clone)]
pub struct AuthService {
    pool: DatabaseConnection,
    jwt_service: JwtService,
    role_service: RoleService,
    verification_service: VerificationService,
    // 唯一性检查与插入在进程内串行
    registration_lock: Arc<Mutex<()>>,
}

impl AuthService {
    pub fn new(
        pool: DatabaseConnection,
        jwt_service: JwtService,
        role_service: RoleService,
        verification_service: VerificationService,
    ) -> Self {
        Self {
            pool,
            jwt_service,
            role_service,
            verification_service,
            registration_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> AppResult<UserResponse> {
        // 验证输入参数
        validate_username(&request.username)?;
        validate_password(&request.password)?;
        validate_email(&request.email)?;
        validate_mobile_number(&request.mobile_number)?;
        validate_required("Full name", &request.full_name)?;

        let password_hash = hash_password(&request.password)?;

        let (user, email_code, mobile_code) = {
            let _guard = self.registration_lock.lock().await;
            let txn = self.pool.begin().await?;

            if self.exists(&txn, user_entity::Column::Username, &request.username).await? {
                return Err(AppError::AlreadyExists("Username is already taken".to_string()));
            }
            if self.exists(&txn, user_entity::Column::Email, &request.email).await? {
                return Err(AppError::AlreadyExists("Email is already in use".to_string()));
            }
            if self
                .exists(&txn, user_entity::Column::MobileNumber, &request.mobile_number)
                .await?
            {
                return Err(AppError::AlreadyExists(
                    "Mobile number is already in use".to_string(),
                ));
            }

            let role = self
                .role_service
                .find_by_name(&txn, RoleName::User)
                .await?
                .ok_or_else(|| AppError::ConfigurationFault("Role USER is not found".to_string()))?;

            let now = Utc::now();
            let user = user_entity::ActiveModel {
                username: Set(request.username),
                password_hash: Set(password_hash),
                email: Set(request.email),
                mobile_number: Set(request.mobile_number),
                full_name: Set(request.full_name.trim().to_string()),
                email_verified: Set(false),
                mobile_verified: Set(false),
                active: Set(true),
                created_at: Set(now),
                updated_at: Set(now),
                last_login_at: Set(None),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(map_registration_conflict)?;

            self.role_service.assign(&txn, user.id, &role).await?;

            let email_code = self
                .verification_service
                .issue_code(&txn, user.id, VerificationChannel::Email)
                .await?;
            let mobile_code = self
                .verification_service
                .issue_code(&txn, user.id, VerificationChannel::Mobile)
                .await?;

            txn.commit().await?;
            (user, email_code, mobile_code)
        };

        log::info!("User registered: {} (id={})", user.username, user.id);

        // 账号已提交，投递失败不回滚
        self.verification_service
            .dispatch(VerificationChannel::Email, user.email.clone(), email_code);
        self.verification_service.dispatch(
            VerificationChannel::Mobile,
            user.mobile_number.clone(),
            mobile_code,
        );

        Ok(UserResponse::from_model(user, vec![RoleName::User]))
    }

    async fn exists(
        &self,
        txn: &sea_orm::DatabaseTransaction,
        column: user_entity::Column,
        value: &str,
    ) -> AppResult<bool> {
        let found = user_entity::Entity::find()
            .filter(column.eq(value))
            .one(txn)
            .await?;
        Ok(found.is_some())
    }

    pub async fn authenticate(&self, request: LoginRequest) -> AppResult<AuthResponse> {
        let user = user_entity::Entity::find()
            .filter(user_entity::Column::Username.eq(request.username.as_str()))
            .one(&self.pool)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        // 验证密码
        if !user.active || !verify_password(&request.password, &user.password_hash)? {
            return Err(AppError::InvalidCredentials);
        }

        if !user.is_fully_verified() {
            return Err(AppError::UnverifiedAccount(user.pending_channels()));
        }

        let mut am = user.into_active_model();
        am.last_login_at = Set(Some(Utc::now()));
        let user = am.update(&self.pool).await?;

        let token = self
            .jwt_service
            .generate_access_token(user.id, &user.username)?;
        let refresh_token = self
            .jwt_service
            .generate_refresh_token(user.id, &user.username)?;

        log::info!("User logged in: {}", user.username);

        Ok(AuthResponse {
            token,
            refresh_token,
            token_type: TOKEN_TYPE.to_string(),
            expires_in: self.jwt_service.get_access_token_expires_in(),
            username: user.username,
            email_verified: user.email_verified,
            mobile_verified: user.mobile_verified,
        })
    }

    /// 用刷新令牌换取新的访问令牌，刷新令牌本身不轮换
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<RefreshTokenResponse> {
        let claims = self.jwt_service.verify_refresh_token(refresh_token)?;
        let user_id = claims.user_id()?;

        let user = user_entity::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .filter(|u| u.active)
            .ok_or_else(|| AppError::InvalidToken("Account no longer exists".to_string()))?;

        let token = self
            .jwt_service
            .generate_access_token(user.id, &user.username)?;

        Ok(RefreshTokenResponse {
            token,
            token_type: TOKEN_TYPE.to_string(),
            expires_in: self.jwt_service.get_access_token_expires_in(),
        })
    }

    /// 无状态令牌，服务端无需吊销
    pub async fn logout(&self, refresh_token: Option<&str>) -> AppResult<()> {
        if let Some(token) = refresh_token {
            if let Ok(claims) = self.jwt_service.verify_refresh_token(token) {
                log::info!("User logged out: {}", claims.username);
            }
        }
        Ok(())
    }

    pub async fn get_user(&self, user_id: i64) -> AppResult<UserResponse> {
        let user = user_entity::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let roles = self.role_service.roles_for_user(user.id).await?;
        Ok(UserResponse::from_model(user, roles))
    }
}

fn map_registration_conflict(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            log::warn!("Registration lost a uniqueness race: {detail}");
            AppError::AlreadyExists("Account already exists".to_string())
        }
        _ => AppError::DatabaseError(err),
    }
}
