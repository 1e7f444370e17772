pub use sea_orm_migration::prelude::*;

mod m20251018_000001_create_accounts;
mod m20251018_000002_create_verifications;
mod m20251018_000003_create_catalog;
mod m20251018_000004_create_purchases;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251018_000001_create_accounts::Migration),
            Box::new(m20251018_000002_create_verifications::Migration),
            Box::new(m20251018_000003_create_catalog::Migration),
            Box::new(m20251018_000004_create_purchases::Migration),
        ]
    }
}
