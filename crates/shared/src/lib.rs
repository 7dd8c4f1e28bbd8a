//! # ReceiptoVerse 共有ユーティリティ
//!
//! 通知サービスとインフラ層で共通に使うユーティリティを提供する。
//!
//! ## 設計方針
//!
//! - ドメイン知識を含まない純粋なユーティリティのみを配置
//! - axum への依存を持たない（HTTP レスポンスへの変換は各サービスの責務）
//! - トレーシング初期化は `observability` フィーチャーでのみ有効化する

pub mod api_response;
pub mod error_response;
pub mod event_log;
pub mod health;
pub mod observability;

pub use api_response::ApiResponse;
pub use error_response::ErrorResponse;
pub use health::{CheckStatus, HealthResponse, ReadinessResponse, ReadinessStatus};
