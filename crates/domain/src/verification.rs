//! # メールアドレス確認
//!
//! 確認コード（6 桁の数字）と確認トークン（64 文字の 16 進数）を生成する。
//!
//! ## 設計方針
//!
//! - **副作用なし**: 生成したコード・トークンはこのサービスでは保存しない。
//!   ユーザーレコードへの保存と照合は外部のレコードストアが行う
//! - **暗号論的乱数**: `rand::rng()`（OS からシードされた ChaCha ベースの CSPRNG）を使う
//! - **有効期限の規約**: 発行から [`CODE_TTL_MINUTES`] 分。判定は [`IssuedCode`] と [`Clock`] で行う

use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{DomainError, clock::Clock};

/// 確認コードの桁数
pub const CODE_LENGTH: usize = 6;

/// 確認コードの有効期限（分）
pub const CODE_TTL_MINUTES: i64 = 10;

/// 確認トークンのバイト長（16 進数表現では 2 倍の文字数）
const TOKEN_BYTES: usize = 32;

/// 確認コード（値オブジェクト）
///
/// `[100000, 999999]` の範囲の 6 桁の数字。先頭が 0 になることはない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationCode(String);

impl VerificationCode {
    /// 一様乱数で確認コードを生成する
    pub fn generate() -> Self {
        let value: u32 = rand::rng().random_range(100_000..=999_999);
        Self(value.to_string())
    }

    /// 外部から受け取った確認コードを検証する
    ///
    /// # バリデーション
    ///
    /// - 6 桁の ASCII 数字
    /// - 先頭が 0 ではない
    ///
    /// # エラー
    ///
    /// バリデーションに失敗した場合は `DomainError::Validation` を返す。
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_string();

        if value.len() != CODE_LENGTH || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::Validation(
                "確認コードは 6 桁の数字である必要があります".to_string(),
            ));
        }

        if value.starts_with('0') {
            return Err(DomainError::Validation(
                "確認コードは 0 から始めることはできません".to_string(),
            ));
        }

        Ok(Self(value))
    }

    /// 文字列参照を取得する
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 所有権を持つ文字列に変換する
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for VerificationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 確認トークン
///
/// 32 バイトの乱数を小文字 16 進数で表現した 64 文字の文字列。
/// 確認リンクなど、推測されてはならない識別子に使う。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationToken(String);

impl VerificationToken {
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rng().fill(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 発行済みの確認コード
///
/// レコードストアに保存される「コードと発行時刻」の組。有効期限の判定を担う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCode {
    code:      VerificationCode,
    issued_at: DateTime<Utc>,
}

impl IssuedCode {
    /// 現在時刻で確認コードを発行する
    pub fn issue(code: VerificationCode, clock: &dyn Clock) -> Self {
        Self {
            code,
            issued_at: clock.now(),
        }
    }

    pub fn code(&self) -> &VerificationCode {
        &self.code
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// 有効期限
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + TimeDelta::minutes(CODE_TTL_MINUTES)
    }

    /// 期限切れかどうか
    ///
    /// 有効期限ちょうどの時刻は期限切れとして扱う。
    pub fn is_expired(&self, clock: &dyn Clock) -> bool {
        clock.now() >= self.expires_at()
    }

    /// 入力されたコードが一致し、かつ期限内かどうか
    pub fn matches(&self, input: &str, clock: &dyn Clock) -> bool {
        !self.is_expired(clock) && self.code.as_str() == input.trim()
    }
}
