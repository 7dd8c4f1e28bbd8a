//! # ReceiptoVerse インフラ層
//!
//! 外部の配信サービスとの通信を担当するインフラストラクチャ層。
//!
//! ## 設計方針
//!
//! ドメイン層で定義された型（[`EmailMessage`](receiptoverse_domain::notification::EmailMessage)、
//! [`NotificationError`](receiptoverse_domain::notification::NotificationError)）を使い、
//! 配信プロバイダごとの送信手段をカプセル化する。
//!
//! ## 責務
//!
//! - **配信戦略**: SendGrid HTTP API、SMTP リレー、コンソール出力
//! - **送信期限**: 送信をタスクとして切り離し、期限超過時は結果を待たずに打ち切る
//! - **テスト受信箱**: 開発環境向けの使い捨て SMTP アカウント払い出し
//!
//! ## 依存関係
//!
//! ```text
//! notification-service → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`ethereal`] - テスト受信箱（Ethereal）クライアント
//! - [`error`] - インフラ層エラー定義
//! - [`notification`] - 配信戦略と生成ファクトリ

pub mod error;
pub mod ethereal;
#[cfg(feature = "test-utils")]
pub mod mock;
pub mod notification;

pub use error::InfraError;
pub use ethereal::{EtherealClient, TestAccount};
pub use notification::{NotificationSender, create_sender};
