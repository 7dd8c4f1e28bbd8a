//! # 通知
//!
//! メール通知の入出力に関するドメインモデルを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 説明 |
//! |---|------------|------|
//! | [`EmailMessage`] | メールメッセージ | テンプレートレンダリングの出力 |
//! | [`SentEmail`] | 送信受領 | 配信プロバイダが受け付けた証跡 |
//! | [`DeliveryResult`] | 配信結果 | 送信要求に対して必ず返す結果 |
//! | [`DeliveryProvider`] | 配信プロバイダ | 実際に送信を担当した経路 |
//! | [`ErrorClassification`] | 失敗分類 | ログ・監視向けの粗い分類 |
//!
//! ## 設計方針
//!
//! - **結果は必ず返す**: 配信失敗は [`NotificationError`] として捕捉し、
//!   [`DeliveryResult::failed`] に変換する。呼び出し元にエラーを伝播させない
//! - **不変条件はコンストラクタで保証**: `message_id` と `error` はどちらか一方のみ存在する
//! - **確認コードのエコーバック**: 配信に失敗しても呼び出し元がコードを提示できるよう、
//!   結果にコードをそのまま含める

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use thiserror::Error;

/// フォールバック配信で返すメッセージ ID
pub const FALLBACK_MESSAGE_ID: &str = "fallback";

/// 通知送信エラー
///
/// 配信プロバイダごとの失敗を共通の語彙で表現する。
/// [`NotificationError::classification`] で監視向けの分類に落とし込む。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    /// 送信期限内に完了しなかった
    #[error("メール送信がタイムアウトしました（{}秒）", .after.as_secs())]
    Timeout { after: Duration },

    /// 接続の確立・維持に失敗（DNS、TCP、TLS、ソケットタイムアウト）
    #[error("メールサーバーへの接続に失敗: {0}")]
    Connection(String),

    /// 認証に失敗（SMTP 530/534/535、API キー不正）
    #[error("メールサーバーの認証に失敗: {0}")]
    Authentication(String),

    /// 宛先・差出人アドレスを組み立てられない
    #[error("メールアドレスが不正: {0}")]
    InvalidAddress(String),

    /// メール送信に失敗
    #[error("メール送信に失敗: {0}")]
    SendFailed(String),

    /// テンプレートレンダリングに失敗
    #[error("テンプレートレンダリングに失敗: {0}")]
    TemplateFailed(String),

    /// 送信処理が異常終了した（パニック等）
    #[error("メール送信処理が異常終了しました: {0}")]
    Aborted(String),
}

impl NotificationError {
    /// 監視向けの失敗分類を返す
    ///
    /// 分類は助言的なもので、リトライ判断には使わない。
    pub fn classification(&self) -> ErrorClassification {
        match self {
            Self::Timeout { .. } | Self::Connection(_) => ErrorClassification::NetworkTimeout,
            Self::Authentication(_) => ErrorClassification::AuthFailure,
            Self::InvalidAddress(_)
            | Self::SendFailed(_)
            | Self::TemplateFailed(_)
            | Self::Aborted(_) => ErrorClassification::Unknown,
        }
    }
}

/// 失敗分類
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorClassification {
    /// ネットワーク起因（タイムアウト、接続断）
    NetworkTimeout,
    /// 認証情報の誤り
    AuthFailure,
    /// 上記以外
    Unknown,
}

/// 配信プロバイダ
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeliveryProvider {
    /// トランザクションメール HTTP API
    SendGrid,
    /// SMTP リレー（設定済みアカウントまたは開発用テストアカウント）
    Smtp,
    /// 送信せずログに出力する
    Fallback,
}

/// 通知種別
///
/// ログとテンプレート選択に使う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    /// メールアドレス確認コード
    Verification,
    /// 登録完了のウェルカムメール
    Welcome,
}

/// メールメッセージ
///
/// テンプレートレンダリングの出力。NotificationSender に渡される。
#[derive(Debug, Clone)]
pub struct EmailMessage {
    /// 送信先メールアドレス
    pub to:        String,
    /// 件名
    pub subject:   String,
    /// HTML 本文
    pub html_body: String,
    /// プレーンテキスト本文
    pub text_body: String,
}

/// 送信受領
///
/// 配信プロバイダがメッセージを受け付けたことを表す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    /// プロバイダが払い出したメッセージ ID
    pub message_id:  String,
    /// テスト受信箱のプレビュー URL（開発用 SMTP のみ）
    pub preview_url: Option<String>,
}

impl SentEmail {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id:  message_id.into(),
            preview_url: None,
        }
    }

    pub fn with_preview_url(mut self, preview_url: impl Into<String>) -> Self {
        self.preview_url = Some(preview_url.into());
        self
    }
}

/// 配信結果
///
/// 送信要求に対して必ず返される値。JSON では camelCase で表現する。
///
/// # 不変条件
///
/// - `message_id` と `error` はちょうど一方のみ存在する
/// - `success == message_id.is_some()`
/// - `error_classification` は失敗時のみ存在する
/// - `fallback` は呼び出し元がコードを自ら提示すべき場合に `true`
///   （フォールバック配信、または配信失敗）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_id: Option<String>,
    provider: DeliveryProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_classification: Option<ErrorClassification>,
    fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    preview_url: Option<String>,
    duration_ms: u64,
}

impl DeliveryResult {
    /// 配信成功の結果を作成する
    ///
    /// プロバイダが [`DeliveryProvider::Fallback`] の場合、実際には送信されていないため
    /// `fallback` を `true` にする。
    pub fn delivered(
        provider: DeliveryProvider,
        sent: SentEmail,
        code: Option<String>,
        duration: Duration,
    ) -> Self {
        Self {
            success: true,
            message_id: Some(sent.message_id),
            provider,
            code,
            error: None,
            error_classification: None,
            fallback: provider == DeliveryProvider::Fallback,
            preview_url: sent.preview_url,
            duration_ms: duration_to_millis(duration),
        }
    }

    /// 配信失敗の結果を作成する
    pub fn failed(
        provider: DeliveryProvider,
        error: &NotificationError,
        code: Option<String>,
        duration: Duration,
    ) -> Self {
        Self {
            success: false,
            message_id: None,
            provider,
            code,
            error: Some(error.to_string()),
            error_classification: Some(error.classification()),
            fallback: true,
            preview_url: None,
            duration_ms: duration_to_millis(duration),
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub fn provider(&self) -> DeliveryProvider {
        self.provider
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn error_classification(&self) -> Option<ErrorClassification> {
        self.error_classification
    }

    pub fn fallback(&self) -> bool {
        self.fallback
    }

    pub fn preview_url(&self) -> Option<&str> {
        self.preview_url.as_deref()
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// 接続テストの結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub success:  bool,
    pub provider: DeliveryProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error:    Option<String>,
}

impl ConnectionStatus {
    pub fn ok(provider: DeliveryProvider) -> Self {
        Self {
            success: true,
            provider,
            error: None,
        }
    }

    pub fn failed(provider: DeliveryProvider, error: impl Into<String>) -> Self {
        Self {
            success: false,
            provider,
            error: Some(error.into()),
        }
    }

    /// 配信プロバイダが設定されていない（フォールバック配信）
    pub fn not_configured() -> Self {
        Self::failed(
            DeliveryProvider::Fallback,
            "メール配信プロバイダが設定されていません",
        )
    }
}
