//! # 通知送信
//!
//! メール通知の送信を担当するインフラストラクチャモジュール。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: `NotificationSender` trait でメール送信を抽象化
//! - **3 つの実装**: SendGrid（HTTP API）、SMTP（リレー／テスト受信箱）、Console（ログのみ）
//! - **起動時に一度だけ選択**: [`ProviderSelection`] に従って [`create_sender`] が実装を決める
//! - **初期化失敗は縮退**: どの実装も組み立てられなければ Console に切り替え、起動は止めない

mod console;
mod deadline;
mod sendgrid;
mod smtp;

use std::sync::Arc;

use async_trait::async_trait;
pub use console::ConsoleNotificationSender;
pub use deadline::spawn_with_deadline;
use receiptoverse_domain::{
    delivery::{EmailSettings, ProviderSelection, SmtpCredentialSource},
    notification::{DeliveryProvider, EmailMessage, NotificationError, SentEmail},
};
use receiptoverse_shared::event_log::error;
pub use sendgrid::SendGridNotificationSender;
pub use smtp::{SmtpNotificationSender, SmtpOptions};

use crate::ethereal::EtherealClient;

/// メール送信トレイト
///
/// 通知基盤の中核。メール送信の具体的な方法を抽象化する。
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// メールを送信する
    ///
    /// 成功時はプロバイダが払い出したメッセージ ID を返す。
    async fn send_email(&self, email: &EmailMessage) -> Result<SentEmail, NotificationError>;

    /// この実装が表す配信プロバイダ
    fn provider(&self) -> DeliveryProvider;

    /// 配信プロバイダへの接続を確認する
    async fn verify_connection(&self) -> Result<(), NotificationError>;
}

/// 配信プロバイダの選択に従って送信実装を組み立てる
///
/// SMTP の場合は接続テストをバックグラウンドで実行し、結果をログに出すだけで待たない。
/// 組み立てに失敗した場合は [`ConsoleNotificationSender`] に縮退する。
pub async fn create_sender(
    selection: ProviderSelection,
    settings: &EmailSettings,
    ethereal: &EtherealClient,
) -> Arc<dyn NotificationSender> {
    let built = match selection {
        ProviderSelection::ApiProvider => build_sendgrid(settings),
        ProviderSelection::SmtpProvider(SmtpCredentialSource::Configured) => {
            build_configured_smtp(settings)
        }
        ProviderSelection::SmtpProvider(SmtpCredentialSource::TestAccount) => {
            build_test_account_smtp(settings, ethereal).await
        }
        ProviderSelection::Fallback => {
            tracing::warn!(
                "メール配信プロバイダが設定されていません。確認コードはログに出力されます"
            );
            return Arc::new(ConsoleNotificationSender);
        }
    };

    match built {
        Ok(sender) => {
            tracing::info!(provider = %sender.provider(), "メール配信プロバイダを初期化しました");
            if sender.provider() == DeliveryProvider::Smtp {
                spawn_connection_probe(Arc::clone(&sender));
            }
            sender
        }
        Err(e) => {
            tracing::error!(
                error.category = error::category::EXTERNAL_SERVICE,
                error.kind = error::kind::EMAIL_DELIVERY,
                "メール配信プロバイダの初期化に失敗したため、コンソール出力に切り替えます: {e}"
            );
            Arc::new(ConsoleNotificationSender)
        }
    }
}

fn build_sendgrid(
    settings: &EmailSettings,
) -> Result<Arc<dyn NotificationSender>, NotificationError> {
    let api_key = settings.api_key.clone().unwrap_or_default();
    let sender = SendGridNotificationSender::new(
        api_key,
        &settings.api_base_url,
        &settings.from_address,
        settings.send_timeout,
    )?;
    Ok(Arc::new(sender))
}

fn build_configured_smtp(
    settings: &EmailSettings,
) -> Result<Arc<dyn NotificationSender>, NotificationError> {
    let sender = SmtpNotificationSender::new(SmtpOptions {
        host:             settings.smtp_host.clone().unwrap_or_default(),
        port:             settings.smtp_port,
        secure:           settings.smtp_secure,
        user:             settings.smtp_user.clone().unwrap_or_default(),
        password:         settings.smtp_password.clone().unwrap_or_default(),
        from_address:     settings.from_address.clone(),
        send_timeout:     settings.send_timeout,
        preview_base_url: None,
    })?;
    Ok(Arc::new(sender))
}

async fn build_test_account_smtp(
    settings: &EmailSettings,
    ethereal: &EtherealClient,
) -> Result<Arc<dyn NotificationSender>, NotificationError> {
    let account = ethereal.create_test_account().await.map_err(|e| {
        tracing::warn!(
            error.category = error::category::EXTERNAL_SERVICE,
            error.kind = error::kind::TEST_ACCOUNT,
            "テスト受信箱アカウントを取得できませんでした: {e}"
        );
        NotificationError::Connection(e.to_string())
    })?;

    tracing::info!(
        user = %account.user,
        host = %account.smtp.host,
        "開発用テスト受信箱を使用します"
    );

    let sender = SmtpNotificationSender::new(SmtpOptions {
        host:             account.smtp.host,
        port:             account.smtp.port,
        secure:           account.smtp.secure,
        user:             account.user,
        password:         account.pass,
        from_address:     settings.from_address.clone(),
        send_timeout:     settings.send_timeout,
        preview_base_url: Some(account.web),
    })?;
    Ok(Arc::new(sender))
}

fn spawn_connection_probe(sender: Arc<dyn NotificationSender>) {
    tokio::spawn(async move {
        match sender.verify_connection().await {
            Ok(()) => tracing::info!("SMTP サーバーへの接続を確認しました"),
            Err(e) => tracing::warn!(
                error.category = error::category::EXTERNAL_SERVICE,
                error.kind = error::kind::CONNECTION_TEST,
                classification = %e.classification(),
                "SMTP サーバーへの接続確認に失敗しました（送信時に再試行されます）: {e}"
            ),
        }
    });
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use receiptoverse_domain::delivery::Environment;

    use super::*;

    fn unreachable_ethereal() -> EtherealClient {
        EtherealClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap()
    }

    #[tokio::test]
    async fn test_フォールバック選択ではconsoleになる() {
        let sender = create_sender(
            ProviderSelection::Fallback,
            &EmailSettings::default(),
            &unreachable_ethereal(),
        )
        .await;

        assert_eq!(sender.provider(), DeliveryProvider::Fallback);
    }

    #[tokio::test]
    async fn test_apiキー選択ではsendgridになる() {
        let settings = EmailSettings {
            api_key: Some("SG.test".to_string()),
            ..EmailSettings::default()
        };

        let sender = create_sender(
            ProviderSelection::resolve(&settings),
            &settings,
            &unreachable_ethereal(),
        )
        .await;

        assert_eq!(sender.provider(), DeliveryProvider::SendGrid);
    }

    #[tokio::test]
    async fn test_差出人が不正ならconsoleに縮退する() {
        let settings = EmailSettings {
            api_key: Some("SG.test".to_string()),
            from_address: "not an address".to_string(),
            ..EmailSettings::default()
        };

        let sender = create_sender(
            ProviderSelection::ApiProvider,
            &settings,
            &unreachable_ethereal(),
        )
        .await;

        assert_eq!(sender.provider(), DeliveryProvider::Fallback);
    }

    #[tokio::test]
    async fn test_テストアカウントを取得できなければconsoleに縮退する() {
        let settings = EmailSettings {
            environment: Environment::Development,
            ..EmailSettings::default()
        };

        let sender = create_sender(
            ProviderSelection::resolve(&settings),
            &settings,
            &unreachable_ethereal(),
        )
        .await;

        assert_eq!(sender.provider(), DeliveryProvider::Fallback);
    }
}
