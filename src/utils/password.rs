use bcrypt::{hash, verify};
use crate::error::{AppError, AppResult};

#[cfg(not(test))]
const HASH_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const HASH_COST: u32 = 4;

/// 验证密码长度
pub fn validate_password(password: &str) -> AppResult<()> {
    let len = password.chars().count();
    if !(6..=120).contains(&len) {
        return Err(AppError::ValidationError(
            "Password must be between 6 and 120 characters".to_string(),
        ));
    }
    Ok(())
}

/// 对密码进行哈希
pub fn hash_password(password: &str) -> AppResult<String> {
    hash(password, HASH_COST)
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {e}")))
}

/// 验证密码
pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    verify(password, hash)
        .map_err(|e| AppError::InternalError(format!("Password verification failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret1").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"x".repeat(121)).is_err());
    }

    #[test]
    fn test_hash_and_verify_password() {
        let password = "Password123";
        let hashed = hash_password(password).unwrap();

        assert!(verify_password(password, &hashed).unwrap());
        assert!(!verify_password("WrongPassword", &hashed).unwrap());
    }
}
