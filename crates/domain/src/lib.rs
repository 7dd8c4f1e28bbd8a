//! # ReceiptoVerse ドメイン層
//!
//! メール通知とメールアドレス確認に関するドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **純粋なモデル**: ネットワークや SMTP には一切触れない。送信の実体はインフラ層が担う
//! - **一度だけの決定**: 配信プロバイダの選択は設定から純粋関数で導出する
//! - **結果の一様性**: どの配信経路でも [`notification::DeliveryResult`] に集約する
//!
//! ## 依存関係の方向
//!
//! ```text
//! notification-service → infra → domain
//! ```
//!
//! ドメイン層はインフラ層に依存しない。
//!
//! ## モジュール構成
//!
//! - [`clock`] - 時刻プロバイダ（確認コードの有効期限判定用）
//! - [`delivery`] - 配信設定のスナップショットとプロバイダ選択
//! - [`error`] - ドメイン層エラー
//! - [`notification`] - メールメッセージ、配信結果、通知エラー
//! - [`verification`] - 確認コード・確認トークンの生成
//!
//! ## 使用例
//!
//! ```rust
//! use receiptoverse_domain::{
//!     delivery::{EmailSettings, ProviderSelection},
//!     verification::VerificationCode,
//! };
//!
//! // 何も設定されていなければフォールバック（コンソール出力）になる
//! let selection = ProviderSelection::resolve(&EmailSettings::default());
//! assert_eq!(selection, ProviderSelection::Fallback);
//!
//! let code = VerificationCode::generate();
//! assert_eq!(code.as_str().len(), 6);
//! ```

pub mod clock;
pub mod delivery;
pub mod error;
pub mod notification;
pub mod verification;

pub use error::DomainError;
