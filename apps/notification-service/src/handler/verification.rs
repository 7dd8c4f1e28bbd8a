//! # 確認トークンハンドラ
//!
//! - `POST /internal/verification-tokens` - リンク形式の確認に使うトークンを発行する
//!
//! トークンの保存と照合は呼び出し側の責務。

use axum::{Json, http::StatusCode, response::IntoResponse};
use receiptoverse_domain::verification::VerificationToken;
use receiptoverse_shared::{ApiResponse, event_log::event, log_business_event};
use serde::Serialize;

/// 確認トークン DTO
#[derive(Debug, Serialize)]
pub struct VerificationTokenDto {
   pub token: String,
}

/// POST /internal/verification-tokens
pub async fn issue_verification_token() -> impl IntoResponse {
   let token = VerificationToken::generate();

   log_business_event!(
      event.category = event::category::VERIFICATION,
      event.action = event::action::TOKEN_ISSUED,
      event.entity_type = event::entity_type::VERIFICATION_TOKEN,
      event.result = event::result::SUCCESS,
      "確認トークンを発行"
   );

   (
      StatusCode::CREATED,
      Json(ApiResponse::new(VerificationTokenDto {
         token: token.as_str().to_string(),
      })),
   )
}
