//! # 通知ハンドラ
//!
//! 認証サービスから呼ばれる内部 API を提供する。
//!
//! ## エンドポイント
//!
//! - `POST /internal/notifications/verification` - 確認コードメール送信
//! - `POST /internal/notifications/welcome` - ウェルカムメール送信
//! - `GET /internal/notifications/connection` - 配信プロバイダの接続テスト
//!
//! 配信に失敗しても 200 を返す。成否は `data.success` と `data.fallback` で判断する。
//! 400 になるのは JSON として解釈できないボディだけで、宛先・表示名・コードの中身は検証しない。

use std::sync::Arc;

use axum::{
   Json,
   extract::{State, rejection::JsonRejection},
   http::StatusCode,
   response::IntoResponse,
};
use receiptoverse_domain::verification::VerificationCode;
use receiptoverse_shared::ApiResponse;
use serde::Deserialize;

use crate::{error::ServiceError, usecase::NotificationService};

/// 通知 API の共有状態
pub struct NotificationState {
   pub service: Arc<NotificationService>,
}

// --- リクエスト型 ---

/// 確認コードメール送信リクエスト
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendVerificationRequest {
   pub email:        String,
   pub display_name: String,
   /// 省略時はサービス側で生成する
   #[serde(default)]
   pub code:         Option<String>,
}

/// ウェルカムメール送信リクエスト
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendWelcomeRequest {
   pub email:        String,
   pub display_name: String,
}

// --- ハンドラ ---

/// POST /internal/notifications/verification
///
/// 確認コードを送信し、配信結果を返す。結果には常にコードが含まれる。
pub async fn send_verification(
   State(state): State<Arc<NotificationState>>,
   payload: Result<Json<SendVerificationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
   let Json(req) = payload?;
   let code = req
      .code
      .unwrap_or_else(|| VerificationCode::generate().into_string());

   let result = state
      .service
      .send_verification(&req.email, &code, &req.display_name)
      .await;

   Ok((StatusCode::OK, Json(ApiResponse::new(result))))
}

/// POST /internal/notifications/welcome
pub async fn send_welcome(
   State(state): State<Arc<NotificationState>>,
   payload: Result<Json<SendWelcomeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
   let Json(req) = payload?;

   let result = state
      .service
      .send_welcome(&req.email, &req.display_name)
      .await;

   Ok((StatusCode::OK, Json(ApiResponse::new(result))))
}

/// GET /internal/notifications/connection
pub async fn test_connection(State(state): State<Arc<NotificationState>>) -> impl IntoResponse {
   let status = state.service.test_connection().await;

   (StatusCode::OK, Json(ApiResponse::new(status)))
}
