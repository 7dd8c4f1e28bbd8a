//! # ビジネスイベントログとエラーコンテキストの構造化ヘルパー
//!
//! 配信結果を `jq` で追跡できるよう、ログフィールドの命名規約と
//! ヘルパーマクロを提供する。
//!
//! ## ビジネスイベント
//!
//! [`log_business_event!`] マクロで出力する。`event.kind = "business_event"` マーカーが
//! 自動付与され、`jq 'select(.["event.kind"] == "business_event")'` でフィルタできる。
//!
//! ## フィールド命名規約
//!
//! ドット記法（`event.category`、`error.kind`）を使用する。JSON 出力ではフラットなキーになる。
//!
//! 宛先メールアドレスはログに出さない。`event.entity_id` には通知種別を入れる。

/// ビジネスイベントを構造化ログとして出力する。
///
/// `event.kind = "business_event"` マーカーを自動付与し、
/// `tracing::info!` レベルで出力する。呼び出し側のクレートは `tracing` に依存していること。
///
/// ## 必須フィールド（慣例）
///
/// - `event.category`: イベントカテゴリ（[`event::category`] の定数を使用）
/// - `event.action`: アクション名（[`event::action`] の定数を使用）
/// - `event.result`: 結果（[`event::result`] の定数を使用）
///
/// ## 推奨フィールド
///
/// - `event.entity_type`: エンティティ種別（[`event::entity_type`] の定数を使用）
/// - `event.provider`: 配信プロバイダ
/// - `event.duration_ms`: 所要時間
#[macro_export]
macro_rules! log_business_event {
    ($($args:tt)*) => {
        ::tracing::info!(
            event.kind = "business_event",
            $($args)*
        )
    };
}

/// イベントフィールドの定数
pub mod event {
    /// イベントカテゴリ
    pub mod category {
        pub const NOTIFICATION: &str = "notification";
        pub const VERIFICATION: &str = "verification";
    }

    /// イベントアクション
    pub mod action {
        /// 配信プロバイダが受け付けた
        pub const NOTIFICATION_SENT: &str = "notification.sent";
        /// 配信に失敗した（コードはログ経由で受け渡す）
        pub const NOTIFICATION_FAILED: &str = "notification.failed";
        /// フォールバック配信（送信せずログに出力）
        pub const NOTIFICATION_FALLBACK: &str = "notification.fallback";
        /// 確認トークンを発行した
        pub const TOKEN_ISSUED: &str = "verification.token_issued";
    }

    /// エンティティ種別
    pub mod entity_type {
        pub const EMAIL: &str = "email";
        pub const VERIFICATION_TOKEN: &str = "verification_token";
    }

    /// イベント結果
    pub mod result {
        pub const SUCCESS: &str = "success";
        pub const FAILURE: &str = "failure";
    }
}

/// エラーコンテキストフィールドの定数
///
/// `tracing::error!` / `tracing::warn!` に `error.category` + `error.kind` として付与する。
pub mod error {
    /// エラーカテゴリ
    pub mod category {
        /// 外部サービス呼び出し（SendGrid、SMTP リレー、テスト受信箱）
        pub const EXTERNAL_SERVICE: &str = "external_service";
        /// 起動時の設定
        pub const CONFIGURATION: &str = "configuration";
    }

    /// エラー種別
    pub mod kind {
        pub const EMAIL_DELIVERY: &str = "email_delivery";
        pub const CONNECTION_TEST: &str = "connection_test";
        pub const TEST_ACCOUNT: &str = "test_account";
        pub const TEMPLATE: &str = "template";
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_通知アクションはカテゴリをプレフィックスに持つ() {
        for action in [
            event::action::NOTIFICATION_SENT,
            event::action::NOTIFICATION_FAILED,
            event::action::NOTIFICATION_FALLBACK,
        ] {
            assert!(action.starts_with(event::category::NOTIFICATION));
        }
        assert!(event::action::TOKEN_ISSUED.starts_with(event::category::VERIFICATION));
    }

    #[test]
    fn test_log_business_eventマクロが展開できる() {
        let subscriber = tracing_subscriber::fmt().with_test_writer().finish();

        tracing::subscriber::with_default(subscriber, || {
            crate::log_business_event!(
                event.category = event::category::NOTIFICATION,
                event.action = event::action::NOTIFICATION_SENT,
                event.result = event::result::SUCCESS,
                "メールを送信しました"
            );
        });
    }
}
