//! # ユースケース層
//!
//! Notification Service のビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: 送信実装を `Arc<dyn NotificationSender>` で外部から注入
//! - **薄いハンドラ**: ハンドラは薄く保ち、ロジックはユースケースに集約

pub mod notification;

pub use notification::{NotificationService, TemplateRenderer};
