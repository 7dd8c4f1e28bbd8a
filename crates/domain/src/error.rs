//! # ドメイン層エラー定義
//!
//! 入力値がドメインのルールに違反した場合のエラー型。
//!
//! 配信失敗は [`crate::notification::NotificationError`] で表現し、ここには含めない。
//! 配信失敗は呼び出し元に例外として伝播させず、配信結果に変換されるため。

use thiserror::Error;

/// ドメイン層で発生するエラー
///
/// 通知 API の入力はこの型で弾かない。照合側（レコードストア）がコードを検証するときに使う。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// バリデーションエラー
    ///
    /// 例: 確認コードが 6 桁の数字ではない
    #[error("バリデーションエラー: {0}")]
    Validation(String),
}
