//! # Notification Service 設定
//!
//! 環境変数から Notification Service サーバーの設定を読み込む。
//!
//! 未設定の配信設定はエラーにしない（フォールバック配信になる）。
//! 値の形式が不正な場合のみ [`ConfigError`] を返す。

use std::{env, time::Duration};

use receiptoverse_domain::delivery::{
    DEFAULT_API_BASE_URL,
    DEFAULT_FROM_ADDRESS,
    DEFAULT_SMTP_PORT,
    EmailSettings,
    Environment,
    mask_secret,
};
use thiserror::Error;

/// デフォルトのバインドアドレス
const DEFAULT_HOST: &str = "0.0.0.0";

/// デフォルトのポート番号
const DEFAULT_PORT: u16 = 3000;

/// ウェルカムメール内リンクのデフォルト
pub const DEFAULT_APP_BASE_URL: &str = "https://receiptoverse.com";

/// 起動時の診断ログに出す配信設定のキー
const EMAIL_KEYS: [&str; 9] = [
    "SENDGRID_API_KEY",
    "SENDGRID_BASE_URL",
    "EMAIL_HOST",
    "EMAIL_PORT",
    "EMAIL_SECURE",
    "EMAIL_USER",
    "EMAIL_PASS",
    "EMAIL_FROM",
    "EMAIL_SEND_TIMEOUT_SECS",
];

/// 値を伏せて出力するキー
const SECRET_KEYS: [&str; 2] = ["SENDGRID_API_KEY", "EMAIL_PASS"];

/// 設定読み込みエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{key} は有効な数値である必要があります: {value}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{key} は true または false である必要があります: {value}")]
    InvalidBool { key: &'static str, value: String },

    #[error("{key} は 1 以上である必要があります: {value}")]
    NotPositive { key: &'static str, value: String },
}

/// Notification Service サーバーの設定
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// バインドアドレス
    pub host:         String,
    /// ポート番号
    pub port:         u16,
    /// ウェルカムメール内リンクのベース URL
    pub app_base_url: String,
    /// 配信設定
    pub email:        EmailSettings,
}

impl ServiceConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 任意の参照関数から設定を読み込む
    ///
    /// 空文字列は未設定として扱う。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = get("APP_ENV")
            .or_else(|| get("NODE_ENV"))
            .map(|mode| Environment::from_mode(&mode))
            .unwrap_or_default();

        let email = EmailSettings {
            api_key: get("SENDGRID_API_KEY"),
            api_base_url: get("SENDGRID_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            smtp_host: get("EMAIL_HOST"),
            smtp_port: parse_number("EMAIL_PORT", get("EMAIL_PORT"))?
                .unwrap_or(DEFAULT_SMTP_PORT),
            smtp_secure: parse_bool("EMAIL_SECURE", get("EMAIL_SECURE"))?.unwrap_or(true),
            smtp_user: get("EMAIL_USER"),
            smtp_password: get("EMAIL_PASS"),
            from_address: get("EMAIL_FROM").unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string()),
            environment,
            send_timeout: parse_secs("EMAIL_SEND_TIMEOUT_SECS", get("EMAIL_SEND_TIMEOUT_SECS"))?
                .unwrap_or(EmailSettings::default().send_timeout),
        };

        Ok(Self {
            host: get("NOTIFICATION_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_number("NOTIFICATION_PORT", get("NOTIFICATION_PORT"))?
                .unwrap_or(DEFAULT_PORT),
            app_base_url: get("APP_BASE_URL").unwrap_or_else(|| DEFAULT_APP_BASE_URL.to_string()),
            email,
        })
    }
}

/// 配信設定の診断情報を出力する
///
/// どのキーが設定されているかを示す。API キーとパスワードは末尾 4 文字以外を伏せる。
pub fn log_email_diagnostics(lookup: impl Fn(&str) -> Option<String>) {
    for key in EMAIL_KEYS {
        let value = match lookup(key) {
            Some(v) if SECRET_KEYS.contains(&key) => mask_secret(&v),
            Some(v) => v,
            None => "未設定".to_string(),
        };
        tracing::debug!(key, value = %value, "配信設定");
    }
}

fn parse_number<T: std::str::FromStr>(
    key: &'static str,
    value: Option<String>,
) -> Result<Option<T>, ConfigError> {
    value
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber { key, value: v })
        })
        .transpose()
}

/// 秒数を 1 以上の期間として読む
///
/// 0 は受け付けない。
fn parse_secs(key: &'static str, value: Option<String>) -> Result<Option<Duration>, ConfigError> {
    match parse_number::<u64>(key, value.clone())? {
        Some(0) => Err(ConfigError::NotPositive {
            key,
            value: value.unwrap_or_default(),
        }),
        secs => Ok(secs.map(Duration::from_secs)),
    }
}

fn parse_bool(key: &'static str, value: Option<String>) -> Result<Option<bool>, ConfigError> {
    value
        .map(|v| match v.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(ConfigError::InvalidBool { key, value: v }),
        })
        .transpose()
}
