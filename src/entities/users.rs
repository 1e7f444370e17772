use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub username: String,
    pub password_hash: String,
    #[sea_orm(unique)]
    pub email: String,
    #[sea_orm(unique)]
    pub mobile_number: String,
    pub full_name: String,
    pub email_verified: bool,
    pub mobile_verified: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl Model {
    /// Channels that still need a successful OTP verification.
    pub fn pending_channels(&self) -> Vec<super::VerificationChannel> {
        let mut pending = Vec::new();
        if !self.email_verified {
            pending.push(super::VerificationChannel::Email);
        }
        if !self.mobile_verified {
            pending.push(super::VerificationChannel::Mobile);
        }
        pending
    }

    pub fn is_fully_verified(&self) -> bool {
        self.email_verified && self.mobile_verified
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
