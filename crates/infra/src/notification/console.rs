//! コンソール通知送信実装
//!
//! メールを実際に送信せず、ログ出力のみ行う。
//! 配信プロバイダが設定されていない場合や、プロバイダの初期化に失敗した場合に使用する。

use async_trait::async_trait;
use receiptoverse_domain::notification::{
    DeliveryProvider,
    EmailMessage,
    FALLBACK_MESSAGE_ID,
    NotificationError,
    SentEmail,
};

use super::NotificationSender;

/// コンソール通知送信（ログ出力のみ）
///
/// 確認コードの出力は呼び出し側（通知サービス）が行う。
#[derive(Debug, Clone, Default)]
pub struct ConsoleNotificationSender;

#[async_trait]
impl NotificationSender for ConsoleNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<SentEmail, NotificationError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "Console: メール送信をスキップ"
        );
        tracing::debug!(body = %email.text_body, "Console: メール本文");
        Ok(SentEmail::new(FALLBACK_MESSAGE_ID))
    }

    fn provider(&self) -> DeliveryProvider {
        DeliveryProvider::Fallback
    }

    async fn verify_connection(&self) -> Result<(), NotificationError> {
        Err(NotificationError::SendFailed(
            "メール配信プロバイダが設定されていません".to_string(),
        ))
    }
}
