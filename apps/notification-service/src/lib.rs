//! # Notification Service ライブラリ
//!
//! ReceiptoVerse のメール通知（確認コード・ウェルカムメール）を送る内部サービス。
//! テスト用にルーターとユースケースを公開する。

pub mod app_builder;
pub mod config;
pub mod error;
pub mod handler;
pub mod usecase;
