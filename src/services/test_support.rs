use std::sync::Arc;

use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};

use crate::config::{OtpConfig, PurchaseConfig};
use crate::external::notifier::testing::RecordingNotifier;
use crate::external::{Notification, SimulatedPaymentProcessor};
use crate::services::{AuthService, MovieService, PurchaseService, RoleService, VerificationService};
use crate::utils::JwtService;

pub async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

/// Fully wired services over a fresh in-memory database.
pub struct TestApp {
    pub db: DatabaseConnection,
    pub notifier: RecordingNotifier,
    pub auth: AuthService,
    pub verification: VerificationService,
    pub movies: MovieService,
    pub purchases: PurchaseService,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_notifier(RecordingNotifier::default()).await
    }

    pub async fn with_notifier(notifier: RecordingNotifier) -> Self {
        let db = setup_db().await;
        let roles = RoleService::new(db.clone());
        roles.seed_roles().await.unwrap();

        let verification =
            VerificationService::new(db.clone(), Arc::new(notifier.clone()), OtpConfig::default());
        let jwt = JwtService::new("test-secret", 3600, 86_400);
        let auth = AuthService::new(db.clone(), jwt, roles, verification.clone());
        let movies = MovieService::new(db.clone());
        let purchases = PurchaseService::new(
            db.clone(),
            movies.clone(),
            Arc::new(SimulatedPaymentProcessor),
            PurchaseConfig::default(),
        );

        Self {
            db,
            notifier,
            auth,
            verification,
            movies,
            purchases,
        }
    }

    /// Waits for the spawned deliveries to reach the recording notifier.
    pub async fn wait_for_notifications(&self, count: usize) -> Vec<Notification> {
        for _ in 0..200 {
            let sent = self.notifier.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("expected {count} notifications, got {}", self.notifier.sent().len());
    }
}

/// Extracts the code from a verification message body.
pub fn code_from(notification: &Notification) -> String {
    notification
        .body
        .lines()
        .next()
        .and_then(|line| line.rsplit(' ').next())
        .unwrap()
        .to_string()
}
