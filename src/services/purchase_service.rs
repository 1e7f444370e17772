use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionTrait,
};

use crate::config::PurchaseConfig;
use crate::entities::{
    PaymentMethod, PurchaseStatus, movie_entity, purchase_entity, user_entity,
};
use crate::error::{AppError, AppResult};
use crate::external::PaymentProcessor;
use crate::middlewares::AuthContext;
use crate::models::{PaymentMethodResponse, PurchaseRequest, PurchaseResponse};
use crate::services::MovieService;
use crate::utils::KeyedLocks;

#[derive(Clone)]
pub struct PurchaseService {
    pool: DatabaseConnection,
    movie_service: MovieService,
    payment_processor: Arc<dyn PaymentProcessor>,
    config: PurchaseConfig,
    locks: KeyedLocks<(i64, i64)>,
}

impl PurchaseService {
    pub fn new(
        pool: DatabaseConnection,
        movie_service: MovieService,
        payment_processor: Arc<dyn PaymentProcessor>,
        config: PurchaseConfig,
    ) -> Self {
        Self {
            pool,
            movie_service,
            payment_processor,
            config,
            locks: KeyedLocks::new(),
        }
    }

    /// 购买影片
    ///
    /// 1. 账号与影片必须存在
    /// 2. 邮箱与手机均已验证
    /// 3. 同一 (用户, 影片) 最多一条 COMPLETED 记录
    /// 4. 扣款成功后写入 COMPLETED 记录
    pub async fn purchase(
        &self,
        ctx: &AuthContext,
        request: PurchaseRequest,
    ) -> AppResult<PurchaseResponse> {
        let user_id = ctx.user_id;
        let movie_id = request.movie_id;
        let _guard = self.locks.lock((user_id, movie_id)).await;

        let txn = self.pool.begin().await?;

        let user = user_entity::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let movie = self
            .movie_service
            .find_model(&txn, movie_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Movie not found with ID: {movie_id}")))?;

        if !user.is_fully_verified() {
            return Err(AppError::PaymentBlocked(
                "Email and mobile number must be verified before purchasing".to_string(),
            ));
        }

        let already = purchase_entity::Entity::find()
            .filter(purchase_entity::Column::UserId.eq(user_id))
            .filter(purchase_entity::Column::MovieId.eq(movie_id))
            .filter(purchase_entity::Column::Status.eq(PurchaseStatus::Completed))
            .one(&txn)
            .await?;
        if already.is_some() {
            return Err(AppError::AlreadyPurchased);
        }

        let amount = self.config.price_cents;
        // 支付在事务内进行：接入真实网关时，整个网络往返都会占用一个连接池连接
        let transaction_id = self
            .payment_processor
            .process(
                request.payment_method,
                &request.payment_details,
                amount,
                &self.config.currency,
            )
            .await?;

        let now = Utc::now();
        let record = purchase_entity::ActiveModel {
            user_id: Set(user_id),
            movie_id: Set(movie_id),
            amount: Set(amount),
            currency: Set(self.config.currency.clone()),
            payment_method: Set(request.payment_method),
            transaction_id: Set(Some(transaction_id)),
            status: Set(PurchaseStatus::Completed),
            entitlement_key: Set(Some(purchase_entity::entitlement_key(user_id, movie_id))),
            purchase_date: Set(now),
            completed_date: Set(Some(now)),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(map_entitlement_conflict)?;

        txn.commit().await?;

        log::info!(
            "Purchase completed: user={} movie={} transaction={}",
            user.username,
            movie.id,
            record.transaction_id.as_deref().unwrap_or_default()
        );
        Ok(PurchaseResponse::from_model(record, Some(movie.title)))
    }

    /// 只返回当前登录用户自己的记录
    pub async fn list_purchases(&self, ctx: &AuthContext) -> AppResult<Vec<PurchaseResponse>> {
        let records = purchase_entity::Entity::find()
            .filter(purchase_entity::Column::UserId.eq(ctx.user_id))
            .order_by_desc(purchase_entity::Column::PurchaseDate)
            .order_by_desc(purchase_entity::Column::Id)
            .all(&self.pool)
            .await?;

        let movie_ids: Vec<i64> = records.iter().map(|r| r.movie_id).collect();
        let titles: HashMap<i64, String> = if movie_ids.is_empty() {
            HashMap::new()
        } else {
            movie_entity::Entity::find()
                .filter(movie_entity::Column::Id.is_in(movie_ids))
                .all(&self.pool)
                .await?
                .into_iter()
                .map(|m| (m.id, m.title))
                .collect()
        };

        Ok(records
            .into_iter()
            .map(|r| {
                let title = titles.get(&r.movie_id).cloned();
                PurchaseResponse::from_model(r, title)
            })
            .collect())
    }

    pub fn list_payment_methods(&self) -> Vec<PaymentMethodResponse> {
        payment_methods()
    }
}

pub fn payment_methods() -> Vec<PaymentMethodResponse> {
    let describe = |code, name: &str, description: &str| PaymentMethodResponse {
        code,
        name: name.to_string(),
        description: description.to_string(),
        enabled: true,
    };
    vec![
        describe(
            PaymentMethod::CreditCard,
            "Credit Card",
            "Pay with Visa, Mastercard, or American Express",
        ),
        describe(PaymentMethod::DebitCard, "Debit Card", "Pay with your bank debit card"),
        describe(PaymentMethod::Paypal, "PayPal", "Pay with your PayPal account"),
    ]
}

fn map_entitlement_conflict(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::AlreadyPurchased,
        _ => AppError::DatabaseError(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::VerificationChannel;
    use crate::external::PaymentDetails;
    use crate::models::{MovieSearchRequest, RegisterRequest};
    use crate::services::test_support::TestApp;
    use sea_orm::{IntoActiveModel, PaginatorTrait};

    async fn register(app: &TestApp, username: &str, mobile: &str, verified: bool) -> AuthContext {
        let user = app
            .auth
            .register(RegisterRequest {
                username: username.to_string(),
                password: "s3cret!".to_string(),
                email: format!("{username}@x.com"),
                mobile_number: mobile.to_string(),
                full_name: username.to_string(),
            })
            .await
            .unwrap();

        if verified {
            let model = user_entity::Entity::find_by_id(user.id)
                .one(&app.db)
                .await
                .unwrap()
                .unwrap();
            let mut am = model.into_active_model();
            am.email_verified = Set(true);
            am.mobile_verified = Set(true);
            am.update(&app.db).await.unwrap();
        }

        AuthContext {
            user_id: user.id,
            username: user.username,
        }
    }

    async fn first_movie(app: &TestApp) -> i64 {
        app.movies.seed_sample_movies().await.unwrap();
        let page = app.movies.search(&MovieSearchRequest::default()).await.unwrap();
        page.content[0].id
    }

    fn buy(movie_id: i64) -> PurchaseRequest {
        PurchaseRequest {
            movie_id,
            payment_method: PaymentMethod::CreditCard,
            payment_details: PaymentDetails {
                card_number: Some("4111111111111111".to_string()),
                card_expiry: Some("12/30".to_string()),
                card_cvv: Some("123".to_string()),
                card_holder_name: Some("Alice".to_string()),
            },
        }
    }

    async fn completed_count(app: &TestApp, ctx: &AuthContext, movie_id: i64) -> u64 {
        purchase_entity::Entity::find()
            .filter(purchase_entity::Column::UserId.eq(ctx.user_id))
            .filter(purchase_entity::Column::MovieId.eq(movie_id))
            .filter(purchase_entity::Column::Status.eq(PurchaseStatus::Completed))
            .count(&app.db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_purchase_then_duplicate_is_rejected() {
        let app = TestApp::new().await;
        let ctx = register(&app, "alice", "+15550001111", true).await;
        let movie_id = first_movie(&app).await;

        let first = app.purchases.purchase(&ctx, buy(movie_id)).await.unwrap();
        assert_eq!(first.status, PurchaseStatus::Completed);
        assert_eq!(first.amount, 999);
        assert_eq!(first.currency, "USD");
        assert!(first.transaction_id.is_some());
        assert_eq!(first.completed_date, Some(first.purchase_date));
        assert_eq!(first.movie_title.as_deref(), Some("Forrest Gump"));

        assert!(matches!(
            app.purchases.purchase(&ctx, buy(movie_id)).await,
            Err(AppError::AlreadyPurchased)
        ));
        assert_eq!(completed_count(&app, &ctx, movie_id).await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_purchases_complete_once() {
        let app = TestApp::new().await;
        let ctx = register(&app, "alice", "+15550001111", true).await;
        let movie_id = first_movie(&app).await;

        let mut handles = Vec::new();
        for _ in 0..6 {
            let service = app.purchases.clone();
            let ctx = ctx.clone();
            handles.push(tokio::spawn(async move {
                service.purchase(&ctx, buy(movie_id)).await
            }));
        }

        let mut completed = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => completed += 1,
                Err(AppError::AlreadyPurchased) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(completed, 1);
        assert_eq!(completed_count(&app, &ctx, movie_id).await, 1);
    }

    #[tokio::test]
    async fn test_unique_entitlement_backs_the_lock() {
        let app = TestApp::new().await;
        let ctx = register(&app, "alice", "+15550001111", true).await;
        let movie_id = first_movie(&app).await;
        app.purchases.purchase(&ctx, buy(movie_id)).await.unwrap();

        let now = Utc::now();
        let duplicate = purchase_entity::ActiveModel {
            user_id: Set(ctx.user_id),
            movie_id: Set(movie_id),
            amount: Set(999),
            currency: Set("USD".to_string()),
            payment_method: Set(PaymentMethod::Paypal),
            transaction_id: Set(None),
            status: Set(PurchaseStatus::Completed),
            entitlement_key: Set(Some(purchase_entity::entitlement_key(ctx.user_id, movie_id))),
            purchase_date: Set(now),
            completed_date: Set(Some(now)),
            ..Default::default()
        }
        .insert(&app.db)
        .await
        .map_err(map_entitlement_conflict);
        assert!(matches!(duplicate, Err(AppError::AlreadyPurchased)));
    }

    #[tokio::test]
    async fn test_unverified_account_is_blocked() {
        let app = TestApp::new().await;
        let ctx = register(&app, "alice", "+15550001111", false).await;
        let movie_id = first_movie(&app).await;

        assert!(matches!(
            app.purchases.purchase(&ctx, buy(movie_id)).await,
            Err(AppError::PaymentBlocked(_))
        ));

        // 只验证邮箱仍然不够
        let sent = app.wait_for_notifications(2).await;
        let email = sent
            .iter()
            .find(|n| n.channel == VerificationChannel::Email)
            .unwrap();
        app.verification
            .verify("alice", &crate::services::test_support::code_from(email), VerificationChannel::Email)
            .await
            .unwrap();
        assert!(matches!(
            app.purchases.purchase(&ctx, buy(movie_id)).await,
            Err(AppError::PaymentBlocked(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_movie_or_user_is_not_found() {
        let app = TestApp::new().await;
        let ctx = register(&app, "alice", "+15550001111", true).await;
        assert!(matches!(
            app.purchases.purchase(&ctx, buy(4242)).await,
            Err(AppError::NotFound(_))
        ));

        let ghost = AuthContext {
            user_id: 9999,
            username: "ghost".to_string(),
        };
        let movie_id = first_movie(&app).await;
        assert!(matches!(
            app.purchases.purchase(&ghost, buy(movie_id)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_purchases_is_scoped_to_caller() {
        let app = TestApp::new().await;
        let alice = register(&app, "alice", "+15550001111", true).await;
        let bob = register(&app, "bob", "+15550002222", true).await;
        let movie_id = first_movie(&app).await;

        app.purchases.purchase(&alice, buy(movie_id)).await.unwrap();

        let mine = app.purchases.list_purchases(&alice).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].user_id, alice.user_id);
        assert!(app.purchases.list_purchases(&bob).await.unwrap().is_empty());

        // 同一影片不同用户互不影响
        app.purchases.purchase(&bob, buy(movie_id)).await.unwrap();
    }

    #[test]
    fn test_payment_methods() {
        let methods = payment_methods();
        let codes: Vec<PaymentMethod> = methods.iter().map(|m| m.code).collect();
        assert_eq!(
            codes,
            vec![PaymentMethod::CreditCard, PaymentMethod::DebitCard, PaymentMethod::Paypal]
        );
        assert!(methods.iter().all(|m| m.enabled));
        assert_eq!(methods[2].name, "PayPal");
    }
}
