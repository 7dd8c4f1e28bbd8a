//! # アプリケーション構築
//!
//! ルーター構築を担当する。
//! `main.rs` は設定読み込み・送信実装の選択とサーバー起動に集中する。

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        NotificationState,
        health_check,
        issue_verification_token,
        readiness_check,
        send_verification,
        send_welcome,
        test_connection,
    },
    usecase::NotificationService,
};

/// ルーターを構築する
pub fn build_app(service: Arc<NotificationService>) -> Router {
    let state = Arc::new(NotificationState { service });

    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
        .route(
            "/internal/notifications/verification",
            post(send_verification),
        )
        .route("/internal/notifications/welcome", post(send_welcome))
        .route("/internal/notifications/connection", get(test_connection))
        .route(
            "/internal/verification-tokens",
            post(issue_verification_token),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
