//! # 配信設定とプロバイダ選択
//!
//! 起動時に一度だけ読み込んだ設定から、使用する配信プロバイダを決定する。
//!
//! ## 設計方針
//!
//! - **純粋関数による選択**: [`ProviderSelection::resolve`] は I/O を行わない。
//!   環境変数の読み込みはアプリケーション層の責務
//! - **設定不足はエラーではない**: 何も設定されていなければフォールバック配信になる
//! - **秘密情報の保護**: `Debug` 出力と起動ログでは API キー・パスワードをマスクする
//!
//! ## 選択の優先順位
//!
//! | 優先度 | 条件 | 選択 |
//! |---|------|------|
//! | 1 | API キーが設定されている | [`ProviderSelection::ApiProvider`] |
//! | 2 | SMTP ホスト・ユーザー・パスワードがすべて設定されている | [`ProviderSelection::SmtpProvider`]（設定済み） |
//! | 3 | 開発環境 | [`ProviderSelection::SmtpProvider`]（テストアカウント） |
//! | 4 | 上記以外 | [`ProviderSelection::Fallback`] |

use std::time::Duration;

use crate::notification::DeliveryProvider;

/// SendGrid API のデフォルトベース URL
pub const DEFAULT_API_BASE_URL: &str = "https://api.sendgrid.com";

/// デフォルトの差出人
pub const DEFAULT_FROM_ADDRESS: &str = "ReceiptoVerse <noreply@receiptoverse.com>";

/// SMTP のデフォルトポート（暗黙的 TLS）
pub const DEFAULT_SMTP_PORT: u16 = 465;

/// SMTP 送信のデフォルト期限
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(20);

/// 実行環境
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Environment {
    /// 開発環境（テスト受信箱を使用できる）
    Development,
    /// 本番環境
    #[default]
    Production,
}

impl Environment {
    /// 環境名から実行環境を判定する
    ///
    /// `development` 以外はすべて本番扱いとする。
    pub fn from_mode(mode: &str) -> Self {
        if mode.trim().eq_ignore_ascii_case("development") {
            Self::Development
        } else {
            Self::Production
        }
    }
}

/// 配信設定のスナップショット
///
/// プロセス起動時に一度だけ作成し、以後は変更しない。
#[derive(Clone)]
pub struct EmailSettings {
    /// SendGrid API キー
    pub api_key:       Option<String>,
    /// SendGrid API ベース URL
    pub api_base_url:  String,
    /// SMTP ホスト
    pub smtp_host:     Option<String>,
    /// SMTP ポート
    pub smtp_port:     u16,
    /// 暗黙的 TLS を使うか（`false` の場合は STARTTLS）
    pub smtp_secure:   bool,
    /// SMTP ユーザー
    pub smtp_user:     Option<String>,
    /// SMTP パスワード
    pub smtp_password: Option<String>,
    /// 差出人（`Name <address>` 形式）
    pub from_address:  String,
    /// 実行環境
    pub environment:   Environment,
    /// SMTP 送信の期限
    pub send_timeout:  Duration,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            api_key:       None,
            api_base_url:  DEFAULT_API_BASE_URL.to_string(),
            smtp_host:     None,
            smtp_port:     DEFAULT_SMTP_PORT,
            smtp_secure:   true,
            smtp_user:     None,
            smtp_password: None,
            from_address:  DEFAULT_FROM_ADDRESS.to_string(),
            environment:   Environment::default(),
            send_timeout:  DEFAULT_SEND_TIMEOUT,
        }
    }
}

impl std::fmt::Debug for EmailSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailSettings")
            .field("api_key", &self.api_key.as_deref().map(mask_secret))
            .field("api_base_url", &self.api_base_url)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_secure", &self.smtp_secure)
            .field("smtp_user", &self.smtp_user)
            .field(
                "smtp_password",
                &self.smtp_password.as_deref().map(mask_secret),
            )
            .field("from_address", &self.from_address)
            .field("environment", &self.environment)
            .field("send_timeout", &self.send_timeout)
            .finish()
    }
}

/// SMTP 認証情報の出所
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpCredentialSource {
    /// 環境変数で設定されたアカウント
    Configured,
    /// 開発用に払い出す使い捨てのテストアカウント
    TestAccount,
}

/// 配信プロバイダの選択
///
/// 起動時に一度だけ決定し、プロセスの生存期間中は変わらない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderSelection {
    /// トランザクションメール HTTP API
    ApiProvider,
    /// SMTP リレー
    SmtpProvider(SmtpCredentialSource),
    /// 送信せずログに出力する
    Fallback,
}

impl ProviderSelection {
    /// 設定から配信プロバイダを選択する
    ///
    /// 最初に条件を満たしたものが選ばれる。空文字列は未設定として扱う。
    pub fn resolve(settings: &EmailSettings) -> Self {
        if is_present(&settings.api_key) {
            return Self::ApiProvider;
        }

        if is_present(&settings.smtp_host)
            && is_present(&settings.smtp_user)
            && is_present(&settings.smtp_password)
        {
            return Self::SmtpProvider(SmtpCredentialSource::Configured);
        }

        if settings.environment == Environment::Development {
            return Self::SmtpProvider(SmtpCredentialSource::TestAccount);
        }

        Self::Fallback
    }

    /// 選択に対応する配信プロバイダ
    pub fn provider(&self) -> DeliveryProvider {
        match self {
            Self::ApiProvider => DeliveryProvider::SendGrid,
            Self::SmtpProvider(_) => DeliveryProvider::Smtp,
            Self::Fallback => DeliveryProvider::Fallback,
        }
    }
}

fn is_present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// 秘密情報をマスクする
///
/// 末尾 4 文字のみ残す。8 文字未満の値は全体を伏せる。
///
/// ```rust
/// use receiptoverse_domain::delivery::mask_secret;
///
/// assert_eq!(mask_secret("SG.abcdefghijkl"), "***ijkl");
/// assert_eq!(mask_secret("short"), "***");
/// ```
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() < 8 {
        return "***".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("***{tail}")
}
