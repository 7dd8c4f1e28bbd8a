//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## 設計方針
//!
//! - 各ハンドラはサブモジュールに配置
//! - 親モジュール（この `handler.rs`）で re-export し、フラットな API を提供
//! - ハンドラは入力の検証のみ行い、配信は [`NotificationService`](crate::usecase::NotificationService) に委譲

pub mod health;
pub mod notification;
pub mod verification;

pub use health::{health_check, readiness_check};
pub use notification::{NotificationState, send_verification, send_welcome, test_connection};
pub use verification::issue_verification_token;
