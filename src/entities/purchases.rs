use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "FAILED")]
    Failed,
    #[sea_orm(string_value = "REFUNDED")]
    Refunded,
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PurchaseStatus::Pending => write!(f, "PENDING"),
            PurchaseStatus::Completed => write!(f, "COMPLETED"),
            PurchaseStatus::Failed => write!(f, "FAILED"),
            PurchaseStatus::Refunded => write!(f, "REFUNDED"),
        }
    }
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "CREDIT_CARD")]
    CreditCard,
    #[sea_orm(string_value = "DEBIT_CARD")]
    DebitCard,
    #[sea_orm(string_value = "PAYPAL")]
    Paypal,
    #[sea_orm(string_value = "APPLE_PAY")]
    ApplePay,
    #[sea_orm(string_value = "GOOGLE_PAY")]
    GooglePay,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::CreditCard => write!(f, "CREDIT_CARD"),
            PaymentMethod::DebitCard => write!(f, "DEBIT_CARD"),
            PaymentMethod::Paypal => write!(f, "PAYPAL"),
            PaymentMethod::ApplePay => write!(f, "APPLE_PAY"),
            PaymentMethod::GooglePay => write!(f, "GOOGLE_PAY"),
        }
    }
}

/// 购买记录。`entitlement_key` 只在 COMPLETED 行上写入，唯一索引保证同一用户同一影片最多一条完成记录。
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "purchases")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub movie_id: i64,
    /// 金额(美分)
    pub amount: i64,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub status: PurchaseStatus,
    #[sea_orm(unique)]
    pub entitlement_key: Option<String>,
    pub purchase_date: DateTime<Utc>,
    pub completed_date: Option<DateTime<Utc>>,
}

pub fn entitlement_key(user_id: i64, movie_id: i64) -> String {
    format!("{user_id}:{movie_id}")
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
