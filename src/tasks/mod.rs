//! Background scheduled tasks.
//!
//! Call `spawn_all` once during startup.

use crate::services::VerificationService;

const PURGE_INTERVAL_SECS: u64 = 60 * 60;

pub fn spawn_all(verification_service: VerificationService) {
    // 每小时清理过期未使用的验证码
    tokio::spawn(async move {
        loop {
            match verification_service.purge_expired().await {
                Ok(n) if n > 0 => log::info!("Purged expired verification codes: {n}"),
                Ok(_) => {}
                Err(e) => log::error!("Failed to purge verification codes: {e:?}"),
            }
            tokio::time::sleep(std::time::Duration::from_secs(PURGE_INTERVAL_SECS)).await;
        }
    });
}
