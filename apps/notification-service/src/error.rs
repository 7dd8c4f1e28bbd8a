//! # Notification Service エラー定義
//!
//! HTTP 層のエラーと、RFC 9457 Problem Details レスポンスへの変換を定義する。
//!
//! 配信の失敗はここには現れない（[`DeliveryResult`](receiptoverse_domain::notification::DeliveryResult)
//! として 200 で返す）。

use axum::{
   Json,
   extract::rejection::JsonRejection,
   http::StatusCode,
   response::{IntoResponse, Response},
};
use receiptoverse_shared::ErrorResponse;
use thiserror::Error;

/// Notification Service で発生するエラー
#[derive(Debug, Error)]
pub enum ServiceError {
   /// リクエストボディを解釈できない
   #[error("不正なリクエスト: {0}")]
   BadRequest(String),
}

impl From<JsonRejection> for ServiceError {
   fn from(rejection: JsonRejection) -> Self {
      ServiceError::BadRequest(rejection.body_text())
   }
}

impl IntoResponse for ServiceError {
   fn into_response(self) -> Response {
      let body = match &self {
         ServiceError::BadRequest(msg) => ErrorResponse::bad_request(msg.clone()),
      };

      tracing::debug!(status = body.status, "リクエストを拒否: {}", self);
      (StatusCode::BAD_REQUEST, Json(body)).into_response()
   }
}

#[cfg(test)]
mod tests {
   use pretty_assertions::assert_eq;

   use super::*;

   #[test]
   fn test_不正なボディは400になる() {
      let response = ServiceError::BadRequest("missing field `email`".to_string()).into_response();

      assert_eq!(response.status(), StatusCode::BAD_REQUEST);
   }
}
