use crate::error::{AppError, AppResult};
use regex::Regex;
use std::sync::OnceLock;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("valid email regex")
    })
}

fn mobile_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("valid mobile regex"))
}

pub fn validate_username(username: &str) -> AppResult<()> {
    let len = username.chars().count();
    if !(3..=50).contains(&len) {
        return Err(AppError::ValidationError(
            "Username must be between 3 and 50 characters".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> AppResult<()> {
    if !email_regex().is_match(email) {
        return Err(AppError::ValidationError("Email should be valid".to_string()));
    }
    Ok(())
}

/// 手机号格式: 可选 "+" 前缀, 7-15 位数字
pub fn validate_mobile_number(mobile: &str) -> AppResult<()> {
    if !mobile_regex().is_match(mobile) {
        return Err(AppError::ValidationError(
            "Mobile number is invalid".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_required(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::ValidationError(format!("{field} is required")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("alice@x.com").is_ok());
        assert!(validate_email("alice.smith+movies@mail.example.org").is_ok());
        assert!(validate_email("alice@").is_err());
        assert!(validate_email("alice").is_err());
    }

    #[test]
    fn test_validate_mobile_number() {
        assert!(validate_mobile_number("+15550001111").is_ok());
        assert!(validate_mobile_number("5550001111").is_ok());
        assert!(validate_mobile_number("+1 555 000").is_err());
        assert!(validate_mobile_number("12").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("al").is_err());
    }
}
