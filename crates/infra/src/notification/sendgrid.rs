//! SendGrid 通知送信実装
//!
//! SendGrid Web API v3（`POST /v3/mail/send`）でメールを送信する。
//! 1 リクエストのみでリトライはしない。

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::Mailbox;
use receiptoverse_domain::notification::{
    DeliveryProvider,
    EmailMessage,
    NotificationError,
    SentEmail,
};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use uuid::Uuid;

use super::NotificationSender;

/// SendGrid API キーの接頭辞
const API_KEY_PREFIX: &str = "SG.";

/// メッセージ ID を返すレスポンスヘッダ
const MESSAGE_ID_HEADER: &str = "x-message-id";

/// SendGrid 通知送信
pub struct SendGridNotificationSender {
    client:   Client,
    base_url: String,
    api_key:  String,
    from:     Mailbox,
    timeout:  Duration,
}

impl SendGridNotificationSender {
    /// 新しい SendGrid 送信インスタンスを作成
    ///
    /// API キーが `SG.` で始まらない場合は警告を出すが、作成は続行する。
    pub fn new(
        api_key: String,
        base_url: &str,
        from_address: &str,
        timeout: Duration,
    ) -> Result<Self, NotificationError> {
        let from: Mailbox = from_address.parse().map_err(|e| {
            NotificationError::InvalidAddress(format!("送信元アドレス不正: {e}"))
        })?;

        if !has_expected_key_format(&api_key) {
            tracing::warn!(
                "SENDGRID_API_KEY が {API_KEY_PREFIX} で始まっていません。キーが正しいか確認してください"
            );
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotificationError::SendFailed(format!("HTTP クライアント構築失敗: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            from,
            timeout,
        })
    }

    fn request_body<'a>(&'a self, email: &'a EmailMessage) -> MailSendRequest<'a> {
        MailSendRequest {
            personalizations: vec![Personalization {
                to: vec![Address {
                    email: &email.to,
                    name:  None,
                }],
            }],
            from:             Address {
                email: self.from.email.as_ref(),
                name:  self.from.name.as_deref(),
            },
            subject:          &email.subject,
            content:          vec![
                Content {
                    content_type: "text/plain",
                    value:        &email.text_body,
                },
                Content {
                    content_type: "text/html",
                    value:        &email.html_body,
                },
            ],
        }
    }

    fn map_transport_error(&self, error: &reqwest::Error) -> NotificationError {
        if error.is_timeout() {
            NotificationError::Timeout {
                after: self.timeout,
            }
        } else if error.is_connect() {
            NotificationError::Connection(error.to_string())
        } else {
            NotificationError::SendFailed(error.to_string())
        }
    }
}

#[async_trait]
impl NotificationSender for SendGridNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<SentEmail, NotificationError> {
        // 宛先が不正なら API を呼ばない
        email
            .to
            .parse::<Mailbox>()
            .map_err(|e| NotificationError::InvalidAddress(format!("宛先アドレス不正: {e}")))?;

        let response = self
            .client
            .post(format!("{}/v3/mail/send", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(email))
            .send()
            .await
            .map_err(|e| self.map_transport_error(&e))?;

        let status = response.status();
        if status.is_success() {
            let message_id = response
                .headers()
                .get(MESSAGE_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .map_or_else(|| format!("sendgrid-{}", Uuid::new_v4()), str::to_string);
            return Ok(SentEmail::new(message_id));
        }

        let body = response.text().await.unwrap_or_default();
        Err(map_status_error(status, &body))
    }

    fn provider(&self) -> DeliveryProvider {
        DeliveryProvider::SendGrid
    }

    /// SendGrid は接続を保持しないため、ネットワークには触れずに成功を返す
    async fn verify_connection(&self) -> Result<(), NotificationError> {
        Ok(())
    }
}

fn has_expected_key_format(api_key: &str) -> bool {
    api_key.starts_with(API_KEY_PREFIX)
}

fn map_status_error(status: StatusCode, body: &str) -> NotificationError {
    let detail = format!("HTTP {}: {}", status.as_u16(), body.trim());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            NotificationError::Authentication(detail)
        }
        _ => NotificationError::SendFailed(detail),
    }
}

#[derive(Debug, Serialize)]
struct MailSendRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from:             Address<'a>,
    subject:          &'a str,
    content:          Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name:  Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'static str,
    value:        &'a str,
}
