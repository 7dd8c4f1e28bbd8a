//! SMTP 通知送信実装
//!
//! lettre の `AsyncSmtpTransport` を使用してメールを送信する。
//! 本番では設定済みのリレー（Gmail 等）に、開発環境ではテスト受信箱に接続する。

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport,
    AsyncTransport,
    Tokio1Executor,
    message::{Mailbox, Message, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{self, PoolConfig, authentication::Credentials, response::Response},
};
use receiptoverse_domain::notification::{
    DeliveryProvider,
    EmailMessage,
    NotificationError,
    SentEmail,
};
use uuid::Uuid;

use super::{NotificationSender, deadline::spawn_with_deadline};

/// 接続プールの最大接続数
const POOL_MAX_CONNECTIONS: u32 = 3;

/// 接続プールのアイドル接続を破棄するまでの時間
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// ソケットの読み書きタイムアウト
const SOCKET_TIMEOUT: Duration = Duration::from_secs(12);

/// 認証失敗を示す SMTP 応答コード
const AUTH_FAILURE_CODES: [&str; 3] = ["530", "534", "535"];

/// SMTP 接続設定
#[derive(Clone)]
pub struct SmtpOptions {
    pub host:             String,
    pub port:             u16,
    /// `true` なら暗黙的 TLS（465）、`false` なら STARTTLS（587 等）
    pub secure:           bool,
    pub user:             String,
    pub password:         String,
    pub from_address:     String,
    /// 1 通あたりの送信期限
    pub send_timeout:     Duration,
    /// テスト受信箱の Web UI ベース URL（設定時は送信結果にプレビュー URL を付与する）
    pub preview_base_url: Option<String>,
}

/// SMTP 通知送信
///
/// `lettre::AsyncSmtpTransport<Tokio1Executor>` をラップする。
/// 送信は [`spawn_with_deadline`] で期限付きの独立タスクとして実行する。
pub struct SmtpNotificationSender {
    transport:        Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from:             Mailbox,
    send_timeout:     Duration,
    preview_base_url: Option<String>,
}

impl SmtpNotificationSender {
    /// 新しい SMTP 送信インスタンスを作成
    ///
    /// 接続はこの時点では確立しない（最初の送信時にプールが接続する）。
    ///
    /// # エラー
    ///
    /// - 差出人アドレスを解釈できない: [`NotificationError::InvalidAddress`]
    /// - TLS 設定を組み立てられない: [`NotificationError::Connection`]
    pub fn new(options: SmtpOptions) -> Result<Self, NotificationError> {
        let from: Mailbox = options.from_address.parse().map_err(|e| {
            NotificationError::InvalidAddress(format!("送信元アドレス不正: {e}"))
        })?;

        let builder = if options.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&options.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&options.host)
        }
        .map_err(|e| NotificationError::Connection(format!("SMTP トランスポート構築失敗: {e}")))?;

        let transport = builder
            .port(options.port)
            .credentials(Credentials::new(options.user, options.password))
            .timeout(Some(SOCKET_TIMEOUT))
            .pool_config(
                PoolConfig::new()
                    .max_size(POOL_MAX_CONNECTIONS)
                    .idle_timeout(POOL_IDLE_TIMEOUT),
            )
            .build();

        Ok(Self {
            transport: Arc::new(transport),
            from,
            send_timeout: options.send_timeout,
            preview_base_url: options.preview_base_url,
        })
    }

    fn build_message(&self, email: &EmailMessage) -> Result<Message, NotificationError> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| NotificationError::InvalidAddress(format!("宛先アドレス不正: {e}")))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&email.subject)
            .message_id(Some(format!(
                "<{}@{}>",
                Uuid::new_v4(),
                self.from.email.domain()
            )))
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text_body.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html_body.clone()),
                    ),
            )
            .map_err(|e| NotificationError::SendFailed(format!("メッセージ構築失敗: {e}")))
    }

    fn preview_url(&self, response: &Response) -> Option<String> {
        let base = self.preview_base_url.as_deref()?;
        let joined = response.message().collect::<Vec<_>>().join(" ");
        let id = extract_preview_id(&joined)?;
        Some(format!("{}/message/{id}", base.trim_end_matches('/')))
    }
}

#[async_trait]
impl NotificationSender for SmtpNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<SentEmail, NotificationError> {
        let message = self.build_message(email)?;
        let message_id = message
            .headers()
            .get_raw("Message-ID")
            .map(str::to_string)
            .unwrap_or_default();

        let transport = Arc::clone(&self.transport);
        let response = spawn_with_deadline(self.send_timeout, async move {
            transport
                .send(message)
                .await
                .map_err(|e| classify_smtp_error(&e))
        })
        .await?;

        let sent = SentEmail::new(message_id);
        Ok(match self.preview_url(&response) {
            Some(url) => sent.with_preview_url(url),
            None => sent,
        })
    }

    fn provider(&self) -> DeliveryProvider {
        DeliveryProvider::Smtp
    }

    async fn verify_connection(&self) -> Result<(), NotificationError> {
        let transport = Arc::clone(&self.transport);
        let connected = spawn_with_deadline(self.send_timeout, async move {
            transport
                .test_connection()
                .await
                .map_err(|e| classify_smtp_error(&e))
        })
        .await?;

        if connected {
            Ok(())
        } else {
            Err(NotificationError::Connection(
                "SMTP サーバーが接続テストに応答しませんでした".to_string(),
            ))
        }
    }
}

fn classify_smtp_error(error: &smtp::Error) -> NotificationError {
    let status = error.status().map(|code| code.to_string());
    classify(status.as_deref(), error.is_timeout(), error.to_string())
}

/// SMTP エラーを共通の失敗種別に振り分ける
///
/// 認証失敗の判定を最優先にする。535 応答の本文に "timeout" 等が含まれても認証失敗として扱う。
fn classify(status: Option<&str>, is_timeout: bool, message: String) -> NotificationError {
    let lower = message.to_lowercase();

    if status.is_some_and(|code| AUTH_FAILURE_CODES.contains(&code))
        || lower.contains("authentication")
    {
        return NotificationError::Authentication(message);
    }

    if is_timeout
        || lower.contains("timed out")
        || lower.contains("timeout")
        || lower.contains("connection")
    {
        return NotificationError::Connection(message);
    }

    NotificationError::SendFailed(message)
}

/// SMTP 応答からテスト受信箱のメッセージ ID を取り出す
///
/// 応答例: `Accepted [STATUS=new MSGID=YQm8Z2m9hSQ3wS9mYQm8aZ3xAAAAAQ]`
fn extract_preview_id(response: &str) -> Option<&str> {
    let start = response.find("MSGID=")? + "MSGID=".len();
    let id = response[start..]
        .split(|c: char| c == ']' || c.is_whitespace())
        .next()?;
    (!id.is_empty()).then_some(id)
}
