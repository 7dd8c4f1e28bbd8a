//! # テスト受信箱（Ethereal）クライアント
//!
//! 開発環境で使う使い捨ての SMTP アカウントを払い出す。
//! 送信したメールは実際には配送されず、Web UI でプレビューできる。
//!
//! `POST {api_url}/user` にリクエストすると、SMTP 接続情報と Web UI の URL が返る。
//! 起動時に呼ばれるため、リクエストにはタイムアウトを設ける。

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::InfraError;

/// アカウント払い出し API のデフォルト URL
pub const DEFAULT_API_URL: &str = "https://api.nodemailer.com";

/// アカウント払い出しリクエストのデフォルトタイムアウト
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Web UI のデフォルト URL（応答に含まれない場合に使う）
const DEFAULT_WEB_URL: &str = "https://ethereal.email";

/// テスト受信箱のアカウント
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestAccount {
    pub user: String,
    pub pass: String,
    pub smtp: SmtpEndpoint,
    /// プレビュー用 Web UI のベース URL
    #[serde(default = "default_web_url")]
    pub web:  String,
}

/// SMTP 接続先
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SmtpEndpoint {
    pub host:   String,
    pub port:   u16,
    pub secure: bool,
}

fn default_web_url() -> String {
    DEFAULT_WEB_URL.to_string()
}

#[derive(Debug, Deserialize)]
struct CreateAccountResponse {
    status:  String,
    #[serde(default)]
    error:   Option<String>,
    #[serde(flatten)]
    account: Option<TestAccount>,
}

#[derive(Debug, Serialize)]
struct CreateAccountRequest<'a> {
    requestor: &'a str,
    version:   &'a str,
}

/// テスト受信箱クライアント
#[derive(Debug, Clone)]
pub struct EtherealClient {
    client:  reqwest::Client,
    api_url: String,
}

impl EtherealClient {
    /// `timeout` は接続から応答本文の受信までを含む 1 リクエスト全体の期限
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, InfraError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    /// [`DEFAULT_API_URL`] と [`DEFAULT_TIMEOUT`] で作成する
    pub fn with_defaults() -> Result<Self, InfraError> {
        Self::new(DEFAULT_API_URL, DEFAULT_TIMEOUT)
    }

    /// テスト用アカウントを払い出す
    ///
    /// # エラー
    ///
    /// - 通信失敗・タイムアウト・JSON デコード失敗: [`InfraErrorKind::Http`](crate::error::InfraErrorKind::Http)
    /// - `status` が `success` 以外: [`InfraErrorKind::UnexpectedResponse`](crate::error::InfraErrorKind::UnexpectedResponse)
    #[tracing::instrument(skip(self), fields(api_url = %self.api_url))]
    pub async fn create_test_account(&self) -> Result<TestAccount, InfraError> {
        let response: CreateAccountResponse = self
            .client
            .post(format!("{}/user", self.api_url))
            .json(&CreateAccountRequest {
                requestor: env!("CARGO_PKG_NAME"),
                version:   env!("CARGO_PKG_VERSION"),
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.status != "success" {
            return Err(InfraError::unexpected_response(format!(
                "status={}: {}",
                response.status,
                response.error.unwrap_or_default()
            )));
        }

        response.account.ok_or_else(|| {
            InfraError::unexpected_response("アカウント情報が含まれていません".to_string())
        })
    }
}
