use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{PaymentMethod, PurchaseStatus, purchase_entity};
use crate::external::PaymentDetails;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    #[schema(example = 1)]
    pub movie_id: i64,
    pub payment_method: PaymentMethod,
    #[serde(flatten)]
    pub payment_details: PaymentDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResponse {
    pub id: i64,
    pub user_id: i64,
    pub movie_id: i64,
    pub movie_title: Option<String>,
    /// 金额(美分)
    pub amount: i64,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub status: PurchaseStatus,
    pub purchase_date: DateTime<Utc>,
    pub completed_date: Option<DateTime<Utc>>,
}

impl PurchaseResponse {
    pub fn from_model(p: purchase_entity::Model, movie_title: Option<String>) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id,
            movie_id: p.movie_id,
            movie_title,
            amount: p.amount,
            currency: p.currency,
            payment_method: p.payment_method,
            transaction_id: p.transaction_id,
            status: p.status,
            purchase_date: p.purchase_date,
            completed_date: p.completed_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct PaymentMethodResponse {
    pub code: PaymentMethod,
    pub name: String,
    pub description: String,
    pub enabled: bool,
}
