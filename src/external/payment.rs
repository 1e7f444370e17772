use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::PaymentMethod;
use crate::error::AppResult;

/// Card data supplied with a purchase. Only forwarded to the processor, never stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub card_number: Option<String>,
    pub card_expiry: Option<String>,
    pub card_cvv: Option<String>,
    pub card_holder_name: Option<String>,
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Charges `amount` cents and returns the processor's transaction identifier.
    async fn process(
        &self,
        method: PaymentMethod,
        details: &PaymentDetails,
        amount: i64,
        currency: &str,
    ) -> AppResult<String>;
}

/// Stand-in for a payment gateway: always succeeds.
#[derive(Clone, Default)]
pub struct SimulatedPaymentProcessor;

#[async_trait]
impl PaymentProcessor for SimulatedPaymentProcessor {
    async fn process(
        &self,
        method: PaymentMethod,
        _details: &PaymentDetails,
        amount: i64,
        currency: &str,
    ) -> AppResult<String> {
        log::info!("Processing payment with method: {method}, amount: {amount} ({currency} cents)");
        let transaction_id = Uuid::new_v4().to_string();
        log::info!("Payment processed successfully. Transaction ID: {transaction_id}");
        Ok(transaction_id)
    }
}
