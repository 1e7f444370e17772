use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub otp: OtpConfig,
    #[serde(default)]
    pub purchase: PurchaseConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64,  // seconds
    pub refresh_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpConfig {
    pub length: usize,
    pub expires_in: i64, // seconds
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            length: 6,
            expires_in: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseConfig {
    /// Flat catalog price in cents
    pub price_cents: i64,
    pub currency: String,
}

impl Default for PurchaseConfig {
    fn default() -> Self {
        Self {
            price_cents: 999,
            currency: "USD".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NotificationConfig {
    #[serde(default)]
    pub twilio: TwilioConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_phone: String,
}

impl TwilioConfig {
    pub fn is_configured(&self) -> bool {
        !self.account_sid.trim().is_empty()
            && !self.auth_token.trim().is_empty()
            && !self.from_phone.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EmailConfig {
    pub api_key: String,
    pub sender_email: String,
    #[serde(default)]
    pub sender_name: Option<String>,
}

impl EmailConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.sender_email.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SeedConfig {
    #[serde(default)]
    pub sample_movies: bool,
}

fn get_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::parse(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let database_url = get_env("DATABASE_URL").ok_or(
                    "DATABASE_URL is not set and no config.toml was found",
                )?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 86_400i64),
                        refresh_token_expires_in: get_env_parse(
                            "JWT_REFRESH_EXPIRES_IN",
                            604_800i64,
                        ),
                    },
                    otp: OtpConfig::default(),
                    purchase: PurchaseConfig::default(),
                    notification: NotificationConfig::default(),
                    seed: SeedConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn parse(config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        toml::from_str(config_str)
            .map_err(|e| format!("Failed to parse config file: {e}").into())
    }

    // 环境变量覆盖（即便文件存在时也覆盖）
    fn apply_env_overrides(&mut self) {
        if let Some(v) = get_env("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(p) = get_env("SERVER_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = p;
        }
        if let Some(v) = get_env("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(mc) = get_env("DB_MAX_CONNECTIONS").and_then(|v| v.parse().ok()) {
            self.database.max_connections = mc;
        }
        if let Some(v) = get_env("JWT_SECRET") {
            self.jwt.secret = v;
        }
        if let Some(n) = get_env("JWT_ACCESS_EXPIRES_IN").and_then(|v| v.parse().ok()) {
            self.jwt.access_token_expires_in = n;
        }
        if let Some(n) = get_env("JWT_REFRESH_EXPIRES_IN").and_then(|v| v.parse().ok()) {
            self.jwt.refresh_token_expires_in = n;
        }
        if let Some(n) = get_env("OTP_LENGTH").and_then(|v| v.parse().ok()) {
            self.otp.length = n;
        }
        if let Some(n) = get_env("OTP_EXPIRES_IN").and_then(|v| v.parse().ok()) {
            self.otp.expires_in = n;
        }
        if let Some(n) = get_env("PURCHASE_PRICE_CENTS").and_then(|v| v.parse().ok()) {
            self.purchase.price_cents = n;
        }
        if let Some(v) = get_env("PURCHASE_CURRENCY") {
            self.purchase.currency = v;
        }
        if let Some(v) = get_env("TWILIO_ACCOUNT_SID") {
            self.notification.twilio.account_sid = v;
        }
        if let Some(v) = get_env("TWILIO_AUTH_TOKEN") {
            self.notification.twilio.auth_token = v;
        }
        if let Some(v) = get_env("TWILIO_FROM_PHONE") {
            self.notification.twilio.from_phone = v;
        }
        if let Some(v) = get_env("EMAIL_API_KEY") {
            self.notification.email.api_key = v;
        }
        if let Some(v) = get_env("EMAIL_SENDER") {
            self.notification.email.sender_email = v;
        }
        if let Some(v) = get_env("EMAIL_SENDER_NAME") {
            self.notification.email.sender_name = Some(v);
        }
        if let Some(b) = get_env("SEED_SAMPLE_MOVIES").and_then(|v| v.parse().ok()) {
            self.seed.sample_movies = b;
        }
    }

    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.otp.length == 0 || self.otp.length > 12 {
            return Err(format!("otp.length must be between 1 and 12, got {}", self.otp.length).into());
        }
        if self.otp.expires_in <= 0 {
            return Err("otp.expires_in must be positive".into());
        }
        if self.purchase.price_cents <= 0 {
            return Err("purchase.price_cents must be positive".into());
        }
        if self.jwt.secret.is_empty() {
            return Err("jwt.secret must not be empty".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config_uses_defaults() {
        let config = Config::parse(
            r#"
            [server]
            host = "127.0.0.1"
            port = 8080

            [database]
            url = "postgres://localhost/cinema"
            max_connections = 5

            [jwt]
            secret = "secret"
            access_token_expires_in = 3600
            refresh_token_expires_in = 86400
            "#,
        )
        .unwrap();

        assert_eq!(config.otp.length, 6);
        assert_eq!(config.otp.expires_in, 300);
        assert_eq!(config.purchase.price_cents, 999);
        assert!(!config.notification.twilio.is_configured());
        assert!(!config.notification.email.is_configured());
        assert!(!config.seed.sample_movies);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_length_otp() {
        let mut config = Config::parse(
            r#"
            [server]
            host = "127.0.0.1"
            port = 8080

            [database]
            url = "postgres://localhost/cinema"
            max_connections = 5

            [jwt]
            secret = "secret"
            access_token_expires_in = 3600
            refresh_token_expires_in = 86400

            [otp]
            length = 4
            expires_in = 120
            "#,
        )
        .unwrap();
        assert_eq!(config.otp.length, 4);

        config.otp.length = 0;
        assert!(config.validate().is_err());
    }
}
