//! # 通知サービス
//!
//! テンプレートレンダリング → メール送信 → ログ記録を統合するサービス。
//!
//! ## 設計方針
//!
//! - **エラーを返さない**: 送信の成否はすべて [`DeliveryResult`] で表す
//! - **送信はタスクで実行**: 送信実装のパニックは `JoinError` として捕捉し、失敗結果に変換する
//! - **コードの受け渡し**: フォールバック配信・配信失敗のときは確認コードをログに出し、結果にも含める
//! - **依存性注入**: `NotificationSender` は trait で抽象化
//! - **所要時間**: `tokio::time::Instant` で計測する（テストでは一時停止した時計に従う）

use std::sync::Arc;

use receiptoverse_domain::{
    notification::{
        ConnectionStatus,
        DeliveryProvider,
        DeliveryResult,
        EmailMessage,
        NotificationError,
        NotificationKind,
    },
};
use receiptoverse_infra::notification::NotificationSender;
use receiptoverse_shared::{
    event_log::{error, event},
    log_business_event,
};
use tokio::time::Instant;

use super::TemplateRenderer;

/// 通知サービス
///
/// 起動時に一度だけ組み立て、`Arc` で共有する。
/// 保持するのは選択済みの送信実装とテンプレートのみ。
pub struct NotificationService {
    sender:            Arc<dyn NotificationSender>,
    template_renderer: TemplateRenderer,
}

impl NotificationService {
    pub fn new(sender: Arc<dyn NotificationSender>, template_renderer: TemplateRenderer) -> Self {
        Self {
            sender,
            template_renderer,
        }
    }

    /// 現在の配信プロバイダ
    pub fn provider(&self) -> DeliveryProvider {
        self.sender.provider()
    }

    /// 確認コードメールを送信する
    ///
    /// 結果には常に渡されたコードがそのまま含まれる。
    #[tracing::instrument(skip_all, fields(notification.kind = %NotificationKind::Verification))]
    pub async fn send_verification(
        &self,
        recipient: &str,
        code: &str,
        display_name: &str,
    ) -> DeliveryResult {
        let rendered = self
            .template_renderer
            .render_verification(recipient, code, display_name);

        self.deliver(NotificationKind::Verification, rendered, Some(code))
            .await
    }

    /// ウェルカムメールを送信する
    #[tracing::instrument(skip_all, fields(notification.kind = %NotificationKind::Welcome))]
    pub async fn send_welcome(&self, recipient: &str, display_name: &str) -> DeliveryResult {
        let rendered = self.template_renderer.render_welcome(recipient, display_name);

        self.deliver(NotificationKind::Welcome, rendered, None).await
    }

    /// 配信プロバイダへの接続を確認する
    ///
    /// - フォールバック: 未設定として失敗
    /// - SendGrid: ネットワークに触れず成功
    /// - SMTP: トランスポートの接続テスト
    pub async fn test_connection(&self) -> ConnectionStatus {
        let provider = self.sender.provider();
        if provider == DeliveryProvider::Fallback {
            return ConnectionStatus::not_configured();
        }

        match self.sender.verify_connection().await {
            Ok(()) => ConnectionStatus::ok(provider),
            Err(e) => {
                tracing::warn!(
                    error.category = error::category::EXTERNAL_SERVICE,
                    error.kind = error::kind::CONNECTION_TEST,
                    classification = %e.classification(),
                    "メール配信プロバイダへの接続確認に失敗: {e}"
                );
                ConnectionStatus::failed(provider, e.to_string())
            }
        }
    }

    async fn deliver(
        &self,
        kind: NotificationKind,
        rendered: Result<EmailMessage, NotificationError>,
        code: Option<&str>,
    ) -> DeliveryResult {
        let provider = self.sender.provider();
        let code = code.map(str::to_string);
        let started = Instant::now();

        let email = match rendered {
            Ok(email) => email,
            Err(e) => {
                tracing::error!(
                    error.category = error::category::CONFIGURATION,
                    error.kind = error::kind::TEMPLATE,
                    "通知テンプレートのレンダリングに失敗: {e}"
                );
                return self.failed(kind, provider, &e, code, started);
            }
        };

        let sender = Arc::clone(&self.sender);
        let outcome = tokio::spawn(async move { sender.send_email(&email).await })
            .await
            .unwrap_or_else(|e| Err(NotificationError::Aborted(e.to_string())));

        match outcome {
            Ok(sent) => {
                let result = DeliveryResult::delivered(provider, sent, code, started.elapsed());
                if result.fallback() {
                    log_business_event!(
                        event.category = event::category::NOTIFICATION,
                        event.action = event::action::NOTIFICATION_FALLBACK,
                        event.entity_type = event::entity_type::EMAIL,
                        event.entity_id = %kind,
                        event.provider = %provider,
                        event.duration_ms = result.duration_ms(),
                        event.result = event::result::SUCCESS,
                        "メール送信をスキップ（フォールバック配信）"
                    );
                    if let Some(code) = result.code() {
                        tracing::warn!(code, "確認コード（フォールバック配信）: {code}");
                    }
                } else {
                    log_business_event!(
                        event.category = event::category::NOTIFICATION,
                        event.action = event::action::NOTIFICATION_SENT,
                        event.entity_type = event::entity_type::EMAIL,
                        event.entity_id = %kind,
                        event.provider = %provider,
                        event.duration_ms = result.duration_ms(),
                        event.result = event::result::SUCCESS,
                        message_id = result.message_id().unwrap_or_default(),
                        "通知メール送信成功"
                    );
                }
                if let Some(preview_url) = result.preview_url() {
                    tracing::info!(preview_url, "テスト受信箱でプレビューできます");
                }
                result
            }
            Err(e) => self.failed(kind, provider, &e, code, started),
        }
    }

    fn failed(
        &self,
        kind: NotificationKind,
        provider: DeliveryProvider,
        cause: &NotificationError,
        code: Option<String>,
        started: Instant,
    ) -> DeliveryResult {
        let result = DeliveryResult::failed(provider, cause, code, started.elapsed());

        log_business_event!(
            event.category = event::category::NOTIFICATION,
            event.action = event::action::NOTIFICATION_FAILED,
            event.entity_type = event::entity_type::EMAIL,
            event.entity_id = %kind,
            event.provider = %provider,
            event.duration_ms = result.duration_ms(),
            event.result = event::result::FAILURE,
            error.category = error::category::EXTERNAL_SERVICE,
            error.kind = error::kind::EMAIL_DELIVERY,
            classification = %cause.classification(),
            "通知メール送信失敗: {cause}"
        );
        if let Some(code) = result.code() {
            tracing::warn!(code, "確認コード（配信失敗のためログで受け渡し）: {code}");
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use receiptoverse_domain::notification::{ErrorClassification, FALLBACK_MESSAGE_ID};
    use receiptoverse_infra::{
        mock::{MockBehavior, MockNotificationSender},
        notification::ConsoleNotificationSender,
    };
    use rstest::rstest;

    use super::*;

    const RECIPIENT: &str = "alice@example.com";
    const DISPLAY_NAME: &str = "alice";
    const CODE: &str = "123456";

    fn service_with(sender: MockNotificationSender) -> NotificationService {
        NotificationService::new(
            Arc::new(sender),
            TemplateRenderer::new("https://receiptoverse.com").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_送信成功時はメッセージidとコードを返す() {
        let sender = MockNotificationSender::delivering(DeliveryProvider::SendGrid);
        let service = service_with(sender.clone());

        let result = service
            .send_verification(RECIPIENT, CODE, DISPLAY_NAME)
            .await;

        assert!(result.success());
        assert_eq!(result.message_id(), Some("mock-1"));
        assert_eq!(result.code(), Some("123456"));
        assert_eq!(result.provider(), DeliveryProvider::SendGrid);
        assert!(!result.fallback());

        let sent = sender.sent_emails();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "alice@example.com");
        assert!(sent[0].text_body.contains("123456"));
    }

    #[tokio::test]
    async fn test_フォールバック配信は成功扱いでコードを返す() {
        let service = service_with(MockNotificationSender::delivering(
            DeliveryProvider::Fallback,
        ));

        let result = service
            .send_verification(RECIPIENT, CODE, DISPLAY_NAME)
            .await;

        assert!(result.success());
        assert_eq!(result.message_id(), Some(FALLBACK_MESSAGE_ID));
        assert_eq!(result.code(), Some("123456"));
        assert!(result.fallback());
    }

    #[rstest]
    #[case(
        NotificationError::Authentication("535 auth failed".to_string()),
        ErrorClassification::AuthFailure
    )]
    #[case(
        NotificationError::Connection("connection refused".to_string()),
        ErrorClassification::NetworkTimeout
    )]
    #[case(
        NotificationError::SendFailed("HTTP 500".to_string()),
        ErrorClassification::Unknown
    )]
    #[tokio::test]
    async fn test_送信失敗は分類付きの失敗結果になる(
        #[case] error: NotificationError,
        #[case] expected: ErrorClassification,
    ) {
        let service = service_with(MockNotificationSender::new(
            DeliveryProvider::Smtp,
            MockBehavior::Fail(error.clone()),
        ));

        let result = service
            .send_verification(RECIPIENT, CODE, DISPLAY_NAME)
            .await;

        assert!(!result.success());
        assert_eq!(result.message_id(), None);
        assert_eq!(result.error(), Some(error.to_string().as_str()));
        assert_eq!(result.error_classification(), Some(expected));
        assert_eq!(result.code(), Some("123456"));
        assert!(result.fallback());
    }

    #[tokio::test]
    async fn test_送信実装のパニックは失敗結果に変換される() {
        let service = service_with(MockNotificationSender::new(
            DeliveryProvider::Smtp,
            MockBehavior::Panic,
        ));

        let result = service
            .send_verification(RECIPIENT, CODE, DISPLAY_NAME)
            .await;

        assert!(!result.success());
        assert_eq!(result.code(), Some("123456"));
        assert_eq!(
            result.error_classification(),
            Some(ErrorClassification::Unknown)
        );
        assert!(result.fallback());
    }

    #[tokio::test(start_paused = true)]
    async fn test_応答しない送信は期限でネットワークタイムアウトになる() {
        let service = service_with(
            MockNotificationSender::new(DeliveryProvider::Smtp, MockBehavior::Hang)
                .with_deadline(Duration::from_secs(20)),
        );

        let result = service
            .send_verification(RECIPIENT, CODE, DISPLAY_NAME)
            .await;

        assert!(!result.success());
        assert_eq!(
            result.error_classification(),
            Some(ErrorClassification::NetworkTimeout)
        );
        assert_eq!(result.code(), Some("123456"));
        assert!(result.duration_ms() >= 20_000);
    }

    #[tokio::test]
    async fn test_ウェルカムメールはコードを持たない() {
        let sender = MockNotificationSender::delivering(DeliveryProvider::Smtp);
        let service = service_with(sender.clone());

        let result = service.send_welcome(RECIPIENT, DISPLAY_NAME).await;

        assert!(result.success());
        assert_eq!(result.code(), None);
        assert_eq!(
            sender.sent_emails()[0].subject,
            "🎉 Welcome to ReceiptoVerse!"
        );
    }

    #[tokio::test]
    async fn test_接続テストはプロバイダごとの結果を返す() {
        let fallback = service_with(MockNotificationSender::delivering(
            DeliveryProvider::Fallback,
        ));
        let smtp = service_with(MockNotificationSender::delivering(DeliveryProvider::Smtp));
        let broken = service_with(MockNotificationSender::new(
            DeliveryProvider::Smtp,
            MockBehavior::Fail(NotificationError::Connection("refused".to_string())),
        ));

        assert_eq!(
            fallback.test_connection().await,
            ConnectionStatus::not_configured()
        );
        assert_eq!(
            smtp.test_connection().await,
            ConnectionStatus::ok(DeliveryProvider::Smtp)
        );

        let status = broken.test_connection().await;
        assert!(!status.success);
        assert_eq!(status.provider, DeliveryProvider::Smtp);
        assert!(status.error.unwrap().contains("refused"));
    }

    #[tokio::test]
    async fn test_コンソール送信ではフォールバックの結果形状になる() {
        let service = NotificationService::new(
            Arc::new(ConsoleNotificationSender),
            TemplateRenderer::new("https://receiptoverse.com").unwrap(),
        );

        let result = service
            .send_verification(RECIPIENT, CODE, DISPLAY_NAME)
            .await;

        assert!(result.success());
        assert_eq!(result.message_id(), Some("fallback"));
        assert_eq!(result.code(), Some("123456"));
        assert!(result.fallback());
        assert_eq!(result.provider(), DeliveryProvider::Fallback);
        assert_eq!(result.error(), None);
        assert_eq!(result.error_classification(), None);
    }

    #[tokio::test]
    async fn test_形式外のコードもそのまま結果に含める() {
        let sender = MockNotificationSender::delivering(DeliveryProvider::SendGrid);
        let service = service_with(sender.clone());

        let result = service.send_verification(RECIPIENT, "12ab", "").await;

        assert!(result.success());
        assert_eq!(result.code(), Some("12ab"));
        assert!(sender.sent_emails()[0].text_body.contains("12ab"));
    }

    #[tokio::test]
    async fn test_不正な宛先は送信実装の判定で失敗結果になる() {
        let service = service_with(MockNotificationSender::new(
            DeliveryProvider::SendGrid,
            MockBehavior::Fail(NotificationError::InvalidAddress(
                "not-an-email".to_string(),
            )),
        ));

        let result = service
            .send_verification("not-an-email", CODE, DISPLAY_NAME)
            .await;

        assert!(!result.success());
        assert_eq!(result.code(), Some("123456"));
        assert_eq!(
            result.error_classification(),
            Some(ErrorClassification::Unknown)
        );
        assert!(result.fallback());
    }
}
