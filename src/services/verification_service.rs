use std::sync::Arc;

use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, Set, TransactionTrait,
};

use crate::config::OtpConfig;
use crate::entities::{VerificationChannel, user_entity, verification_entity};
use crate::error::{AppError, AppResult};
use crate::external::{Notification, Notifier};
use crate::utils::{KeyedLocks, generate_otp};

/// 一次性验证码的生成、发送、校验与重发
#[derive(Clone)]
pub struct VerificationService {
    pool: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
    otp: OtpConfig,
    locks: KeyedLocks<(i64, VerificationChannel)>,
}

impl VerificationService {
    pub fn new(pool: DatabaseConnection, notifier: Arc<dyn Notifier>, otp: OtpConfig) -> Self {
        Self {
            pool,
            notifier,
            otp,
            locks: KeyedLocks::new(),
        }
    }

    /// 替换该渠道未使用的验证码并异步投递
    pub async fn send_verification(
        &self,
        user: &user_entity::Model,
        channel: VerificationChannel,
    ) -> AppResult<()> {
        let code = {
            let _guard = self.locks.lock((user.id, channel)).await;
            let txn = self.pool.begin().await?;
            let code = self.issue_code(&txn, user.id, channel).await?;
            txn.commit().await?;
            code
        };

        self.dispatch(channel, destination_for(user, channel), code);
        Ok(())
    }

    /// Deletes unused codes for the pair and stores a fresh one on `conn`.
    ///
    /// The caller owns the transaction and must hold the `(user_id, channel)`
    /// lock, or be working on an account no other request can see yet.
    pub(crate) async fn issue_code<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i64,
        channel: VerificationChannel,
    ) -> AppResult<String> {
        verification_entity::Entity::delete_many()
            .filter(verification_entity::Column::UserId.eq(user_id))
            .filter(verification_entity::Column::Channel.eq(channel))
            .filter(verification_entity::Column::Used.eq(false))
            .exec(conn)
            .await?;

        let now = Utc::now();
        let code = generate_otp(self.otp.length);
        verification_entity::ActiveModel {
            user_id: Set(user_id),
            code: Set(code.clone()),
            channel: Set(channel),
            expires_at: Set(now + Duration::seconds(self.otp.expires_in)),
            used: Set(false),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(conn)
        .await?;

        Ok(code)
    }

    /// 后台投递，失败只记录日志
    pub(crate) fn dispatch(&self, channel: VerificationChannel, destination: String, code: String) {
        let notifier = self.notifier.clone();
        let notification =
            Notification::verification_code(channel, &destination, &code, self.otp.expires_in);
        tokio::spawn(async move {
            if let Err(e) = notifier.send(&notification).await {
                log::error!("Failed to deliver {channel} verification code to {destination}: {e}");
            }
        });
    }

    pub async fn verify(
        &self,
        username: &str,
        code: &str,
        channel: VerificationChannel,
    ) -> AppResult<user_entity::Model> {
        let user = user_entity::Entity::find()
            .filter(user_entity::Column::Username.eq(username))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found with username: {username}")))?;

        let _guard = self.locks.lock((user.id, channel)).await;
        let txn = self.pool.begin().await?;

        let record = verification_entity::Entity::find()
            .filter(verification_entity::Column::UserId.eq(user.id))
            .filter(verification_entity::Column::Channel.eq(channel))
            .filter(verification_entity::Column::Code.eq(code))
            .filter(verification_entity::Column::Used.eq(false))
            .one(&txn)
            .await?
            .ok_or(AppError::InvalidVerification { expired: false })?;

        let now = Utc::now();
        if record.is_expired_at(now) {
            verification_entity::Entity::delete_by_id(record.id)
                .exec(&txn)
                .await?;
            txn.commit().await?;
            log::info!("Expired {channel} code presented by {username}, deleted");
            return Err(AppError::InvalidVerification { expired: true });
        }

        let mut am = record.into_active_model();
        am.used = Set(true);
        am.update(&txn).await?;

        let mut am = user.into_active_model();
        match channel {
            VerificationChannel::Email => am.email_verified = Set(true),
            VerificationChannel::Mobile => am.mobile_verified = Set(true),
        }
        am.updated_at = Set(now);
        let user = am.update(&txn).await?;

        txn.commit().await?;
        log::info!("{channel} verified for user {username}");
        Ok(user)
    }

    pub async fn resend(&self, username: &str, channel: VerificationChannel) -> AppResult<()> {
        let user = user_entity::Entity::find()
            .filter(user_entity::Column::Username.eq(username))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found with username: {username}")))?;

        self.send_verification(&user, channel).await
    }

    /// 清理过期超过一个有效期且未使用的验证码
    pub async fn purge_expired(&self) -> AppResult<u64> {
        let cutoff = Utc::now() - Duration::seconds(self.otp.expires_in);
        let result = verification_entity::Entity::delete_many()
            .filter(verification_entity::Column::Used.eq(false))
            .filter(verification_entity::Column::ExpiresAt.lt(cutoff))
            .exec(&self.pool)
            .await?;
        Ok(result.rows_affected)
    }
}

fn destination_for(user: &user_entity::Model, channel: VerificationChannel) -> String {
    match channel {
        VerificationChannel::Email => user.email.clone(),
        VerificationChannel::Mobile => user.mobile_number.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::notifier::testing::RecordingNotifier;
    use crate::models::RegisterRequest;
    use crate::services::test_support::{TestApp, code_from};
    use sea_orm::PaginatorTrait;

    fn alice() -> RegisterRequest {
        RegisterRequest {
            username: "alice".to_string(),
            password: "s3cret!".to_string(),
            email: "alice@x.com".to_string(),
            mobile_number: "+15550001111".to_string(),
            full_name: "Alice Liddell".to_string(),
        }
    }

    async fn unused_codes(app: &TestApp, user_id: i64, channel: VerificationChannel) -> Vec<verification_entity::Model> {
        verification_entity::Entity::find()
            .filter(verification_entity::Column::UserId.eq(user_id))
            .filter(verification_entity::Column::Channel.eq(channel))
            .filter(verification_entity::Column::Used.eq(false))
            .all(&app.db)
            .await
            .unwrap()
    }

    async fn expire_all(app: &TestApp, user_id: i64, channel: VerificationChannel) {
        verification_entity::Entity::update_many()
            .col_expr(
                verification_entity::Column::ExpiresAt,
                sea_orm::sea_query::Expr::value(Utc::now() - Duration::seconds(10)),
            )
            .filter(verification_entity::Column::UserId.eq(user_id))
            .filter(verification_entity::Column::Channel.eq(channel))
            .exec(&app.db)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_verify_marks_code_used_and_sets_flag() {
        let app = TestApp::new().await;
        let user = app.auth.register(alice()).await.unwrap();
        let sent = app.wait_for_notifications(2).await;
        let email = sent
            .iter()
            .find(|n| n.channel == VerificationChannel::Email)
            .unwrap();

        let updated = app
            .verification
            .verify("alice", &code_from(email), VerificationChannel::Email)
            .await
            .unwrap();
        assert!(updated.email_verified);
        assert!(!updated.mobile_verified);
        assert!(unused_codes(&app, user.id, VerificationChannel::Email).await.is_empty());

        let again = app
            .verification
            .verify("alice", &code_from(email), VerificationChannel::Email)
            .await;
        assert!(matches!(again, Err(AppError::InvalidVerification { expired: false })));
    }

    #[tokio::test]
    async fn test_code_is_bound_to_its_channel() {
        let app = TestApp::new().await;
        app.auth.register(alice()).await.unwrap();
        let sent = app.wait_for_notifications(2).await;
        let email = sent
            .iter()
            .find(|n| n.channel == VerificationChannel::Email)
            .unwrap();

        let result = app
            .verification
            .verify("alice", &code_from(email), VerificationChannel::Mobile)
            .await;
        // 极小概率两个渠道生成相同验证码
        let mobile = sent
            .iter()
            .find(|n| n.channel == VerificationChannel::Mobile)
            .unwrap();
        if code_from(email) != code_from(mobile) {
            assert!(matches!(result, Err(AppError::InvalidVerification { expired: false })));
        }
    }

    #[tokio::test]
    async fn test_wrong_code_is_rejected() {
        let app = TestApp::new().await;
        let user = app.auth.register(alice()).await.unwrap();
        let sent = app.wait_for_notifications(2).await;
        let email = sent
            .iter()
            .find(|n| n.channel == VerificationChannel::Email)
            .unwrap();

        // 每位数字加一，保证与下发的验证码不同
        let wrong: String = code_from(email)
            .chars()
            .map(|c| {
                let d = c.to_digit(10).unwrap();
                char::from_digit((d + 1) % 10, 10).unwrap()
            })
            .collect();
        assert_ne!(wrong, code_from(email));

        let result = app
            .verification
            .verify("alice", &wrong, VerificationChannel::Email)
            .await;
        assert!(matches!(result, Err(AppError::InvalidVerification { expired: false })));

        let stored = user_entity::Entity::find_by_id(user.id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.email_verified);
        assert_eq!(unused_codes(&app, user.id, VerificationChannel::Email).await.len(), 1);
    }

    #[tokio::test]
    async fn test_resend_invalidates_previous_code() {
        let app = TestApp::new().await;
        let user = app.auth.register(alice()).await.unwrap();
        app.wait_for_notifications(2).await;
        let old = unused_codes(&app, user.id, VerificationChannel::Email).await;
        assert_eq!(old.len(), 1);
        let old_code = old[0].code.clone();

        // 新旧验证码偶有相同，重发直到不同
        let mut new_code = old_code.clone();
        while new_code == old_code {
            app.verification
                .resend("alice", VerificationChannel::Email)
                .await
                .unwrap();
            let fresh = unused_codes(&app, user.id, VerificationChannel::Email).await;
            assert_eq!(fresh.len(), 1);
            new_code = fresh[0].code.clone();
        }

        let result = app
            .verification
            .verify("alice", &old_code, VerificationChannel::Email)
            .await;
        assert!(matches!(result, Err(AppError::InvalidVerification { expired: false })));

        let verified = app
            .verification
            .verify("alice", &new_code, VerificationChannel::Email)
            .await
            .unwrap();
        assert!(verified.email_verified);
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let app = TestApp::new().await;
        let result = app
            .verification
            .verify("nobody", "123456", VerificationChannel::Email)
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let result = app.verification.resend("nobody", VerificationChannel::Email).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_expired_code_is_deleted_then_resend_recovers() {
        let app = TestApp::new().await;
        let user = app.auth.register(alice()).await.unwrap();
        let sent = app.wait_for_notifications(2).await;
        let mobile = sent
            .iter()
            .find(|n| n.channel == VerificationChannel::Mobile)
            .unwrap();

        expire_all(&app, user.id, VerificationChannel::Mobile).await;
        let result = app
            .verification
            .verify("alice", &code_from(mobile), VerificationChannel::Mobile)
            .await;
        assert!(matches!(result, Err(AppError::InvalidVerification { expired: true })));
        assert!(unused_codes(&app, user.id, VerificationChannel::Mobile).await.is_empty());

        app.verification
            .resend("alice", VerificationChannel::Mobile)
            .await
            .unwrap();
        let sent = app.wait_for_notifications(3).await;
        let fresh = unused_codes(&app, user.id, VerificationChannel::Mobile).await;
        assert_eq!(fresh.len(), 1);
        assert!(!fresh[0].is_expired_at(Utc::now()));
        assert_eq!(fresh[0].code, code_from(&sent[2]));

        let verified = app
            .verification
            .verify("alice", &fresh[0].code, VerificationChannel::Mobile)
            .await
            .unwrap();
        assert!(verified.mobile_verified);
    }

    #[tokio::test]
    async fn test_concurrent_resends_leave_one_unused_code() {
        let app = TestApp::new().await;
        let user = app.auth.register(alice()).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..5 {
            let service = app.verification.clone();
            handles.push(tokio::spawn(async move {
                service.resend("alice", VerificationChannel::Email).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert_eq!(unused_codes(&app, user.id, VerificationChannel::Email).await.len(), 1);
        assert_eq!(unused_codes(&app, user.id, VerificationChannel::Mobile).await.len(), 1);
    }

    #[tokio::test]
    async fn test_delivery_failure_is_absorbed() {
        let app = TestApp::with_notifier(RecordingNotifier::failing()).await;
        let user = app.auth.register(alice()).await.unwrap();
        app.wait_for_notifications(2).await;

        app.verification
            .resend("alice", VerificationChannel::Email)
            .await
            .unwrap();
        assert_eq!(unused_codes(&app, user.id, VerificationChannel::Email).await.len(), 1);
    }

    #[tokio::test]
    async fn test_purge_removes_only_stale_unused_codes() {
        let app = TestApp::new().await;
        let user = app.auth.register(alice()).await.unwrap();

        verification_entity::Entity::update_many()
            .col_expr(
                verification_entity::Column::ExpiresAt,
                sea_orm::sea_query::Expr::value(Utc::now() - Duration::hours(2)),
            )
            .filter(verification_entity::Column::UserId.eq(user.id))
            .filter(verification_entity::Column::Channel.eq(VerificationChannel::Email))
            .exec(&app.db)
            .await
            .unwrap();

        assert_eq!(app.verification.purge_expired().await.unwrap(), 1);
        let remaining = verification_entity::Entity::find().count(&app.db).await.unwrap();
        assert_eq!(remaining, 1);
    }
}
