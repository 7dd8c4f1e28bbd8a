//! # ヘルスチェックハンドラ
//!
//! Notification Service の稼働状態を確認するためのエンドポイント。
//!
//! - `/health`: Liveness Check（常に `"healthy"` を返す）
//! - `/health/ready`: Readiness Check（配信プロバイダへの接続を確認）
//!
//! フォールバック配信は正常な運用形態なので、Readiness では `ok` として扱う。

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use receiptoverse_domain::notification::DeliveryProvider;
use receiptoverse_shared::{CheckStatus, HealthResponse, ReadinessResponse, ReadinessStatus};

use super::NotificationState;

/// 接続確認の待ち時間
const READINESS_TIMEOUT: Duration = Duration::from_secs(5);

/// ヘルスチェックエンドポイント
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy(env!("CARGO_PKG_VERSION")))
}

/// Readiness Check エンドポイント
///
/// 全チェック OK → 200、1 つでも失敗 → 503。
#[tracing::instrument(skip_all)]
pub async fn readiness_check(State(state): State<Arc<NotificationState>>) -> impl IntoResponse {
    let email = check_email(&state).await;

    let response = ReadinessResponse::from_checks(BTreeMap::from([("email".to_string(), email)]));
    let http_status = match response.status {
        ReadinessStatus::Ready => StatusCode::OK,
        ReadinessStatus::NotReady => StatusCode::SERVICE_UNAVAILABLE,
    };

    (http_status, Json(response))
}

async fn check_email(state: &NotificationState) -> CheckStatus {
    if state.service.provider() == DeliveryProvider::Fallback {
        return CheckStatus::Ok;
    }

    match tokio::time::timeout(READINESS_TIMEOUT, state.service.test_connection()).await {
        Ok(status) if status.success => CheckStatus::Ok,
        Ok(status) => {
            tracing::warn!(
                provider = %status.provider,
                error = status.error.as_deref().unwrap_or_default(),
                "readiness check: email provider connection failed"
            );
            CheckStatus::Error
        }
        Err(_) => {
            tracing::warn!("readiness check: email provider check timed out");
            CheckStatus::Error
        }
    }
}
