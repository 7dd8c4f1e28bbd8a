//! # 通知 API の統合テスト
//!
//! ルーター全体を `oneshot` で呼び出し、モック送信実装で配信結果の JSON 形状を検証する。
//!
//! - 確認コードは常にレスポンスに含まれる
//! - フォールバック配信は `success: true` + `messageId: "fallback"`
//! - 送信実装のパニック・応答なしは失敗結果として 200 で返る
//! - 宛先・表示名・コードの中身は検証せず、不正な宛先も失敗結果として 200 で返る
//! - JSON として解釈できないボディだけが 400 Problem Details

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use pretty_assertions::assert_eq;
use receiptoverse_domain::notification::DeliveryProvider;
use receiptoverse_infra::{
    mock::{MockBehavior, MockNotificationSender},
    notification::{NotificationSender, SendGridNotificationSender},
};
use receiptoverse_notification_service::{
    app_builder::build_app,
    usecase::{NotificationService, TemplateRenderer},
};
use serde_json::{Value, json};
use tower::ServiceExt;

fn app_with(sender: MockNotificationSender) -> Router {
    app_with_sender(Arc::new(sender))
}

fn app_with_sender(sender: Arc<dyn NotificationSender>) -> Router {
    let service = NotificationService::new(
        sender,
        TemplateRenderer::new("https://receiptoverse.com").unwrap(),
    );
    build_app(Arc::new(service))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_確認コードメールの送信結果にコードが含まれる() {
    let sender = MockNotificationSender::delivering(DeliveryProvider::SendGrid);
    let app = app_with(sender.clone());

    let (status, body) = send(
        app,
        post_json(
            "/internal/notifications/verification",
            json!({ "email": "alice@example.com", "displayName": "alice", "code": "654321" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["success"], true);
    assert_eq!(body["data"]["messageId"], "mock-1");
    assert_eq!(body["data"]["provider"], "sendgrid");
    assert_eq!(body["data"]["code"], "654321");
    assert_eq!(body["data"]["fallback"], false);
    assert!(body["data"].get("error").is_none());
    assert_eq!(sender.sent_emails()[0].to, "alice@example.com");
}

#[tokio::test]
async fn test_コード省略時は6桁のコードを生成する() {
    let app = app_with(MockNotificationSender::delivering(DeliveryProvider::Smtp));

    let (status, body) = send(
        app,
        post_json(
            "/internal/notifications/verification",
            json!({ "email": "alice@example.com", "displayName": "alice" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let code = body["data"]["code"].as_str().unwrap();
    assert_eq!(code.len(), 6);
    let value: u32 = code.parse().unwrap();
    assert!((100_000..=999_999).contains(&value));
}

#[tokio::test]
async fn test_フォールバック配信の結果形状() {
    let app = app_with(MockNotificationSender::delivering(DeliveryProvider::Fallback));

    let (status, body) = send(
        app,
        post_json(
            "/internal/notifications/verification",
            json!({ "email": "alice@example.com", "displayName": "alice", "code": "123456" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["success"], true);
    assert_eq!(body["data"]["messageId"], "fallback");
    assert_eq!(body["data"]["code"], "123456");
    assert_eq!(body["data"]["fallback"], true);
    assert_eq!(body["data"]["provider"], "fallback");
}

#[tokio::test]
async fn test_送信実装のパニックはコード付きの失敗結果になる() {
    let app = app_with(MockNotificationSender::new(
        DeliveryProvider::Smtp,
        MockBehavior::Panic,
    ));

    let (status, body) = send(
        app,
        post_json(
            "/internal/notifications/verification",
            json!({ "email": "alice@example.com", "displayName": "alice", "code": "123456" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["success"], false);
    assert_eq!(body["data"]["code"], "123456");
    assert_eq!(body["data"]["fallback"], true);
    assert_eq!(body["data"]["errorClassification"], "unknown");
    assert!(body["data"].get("messageId").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_応答しないsmtpは期限でネットワークタイムアウトになる() {
    let app = app_with(
        MockNotificationSender::new(DeliveryProvider::Smtp, MockBehavior::Hang)
            .with_deadline(Duration::from_secs(20)),
    );

    let (status, body) = send(
        app,
        post_json(
            "/internal/notifications/verification",
            json!({ "email": "alice@example.com", "displayName": "alice", "code": "123456" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["success"], false);
    assert_eq!(body["data"]["errorClassification"], "network-timeout");
    assert_eq!(body["data"]["code"], "123456");
    assert!(body["data"]["durationMs"].as_u64().unwrap() >= 20_000);
}

#[tokio::test]
async fn test_ウェルカムメールはコードを含まない() {
    let sender = MockNotificationSender::delivering(DeliveryProvider::SendGrid);
    let app = app_with(sender.clone());

    let (status, body) = send(
        app,
        post_json(
            "/internal/notifications/welcome",
            json!({ "email": "bob@example.com", "displayName": "bob" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["success"], true);
    assert!(body["data"].get("code").is_none());
    assert_eq!(sender.sent_emails()[0].subject, "🎉 Welcome to ReceiptoVerse!");
}

#[tokio::test]
async fn test_不正なメールアドレスはコード付きの失敗結果になる() {
    // 宛先の検証で失敗するため、到達できないベース URL でもネットワークには触れない
    let sender = SendGridNotificationSender::new(
        "SG.test-key".to_string(),
        "http://127.0.0.1:1",
        "noreply@receiptoverse.com",
        Duration::from_secs(1),
    )
    .unwrap();
    let app = app_with_sender(Arc::new(sender));

    let (status, body) = send(
        app,
        post_json(
            "/internal/notifications/verification",
            json!({ "email": "not-an-email", "displayName": "alice", "code": "654321" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["success"], false);
    assert_eq!(body["data"]["code"], "654321");
    assert_eq!(body["data"]["fallback"], true);
    assert_eq!(body["data"]["provider"], "sendgrid");
    assert_eq!(body["data"]["errorClassification"], "unknown");
    assert!(body["data"].get("messageId").is_none());
}

#[tokio::test]
async fn test_形式外のコードもそのまま返す() {
    let sender = MockNotificationSender::delivering(DeliveryProvider::SendGrid);
    let app = app_with(sender.clone());

    let (status, body) = send(
        app,
        post_json(
            "/internal/notifications/verification",
            json!({ "email": "alice@example.com", "displayName": "alice", "code": "012ab" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["success"], true);
    assert_eq!(body["data"]["code"], "012ab");
    assert!(sender.sent_emails()[0].text_body.contains("012ab"));
}

#[tokio::test]
async fn test_空の表示名でも送信する() {
    let sender = MockNotificationSender::delivering(DeliveryProvider::SendGrid);
    let app = app_with(sender.clone());

    let (status, body) = send(
        app,
        post_json(
            "/internal/notifications/welcome",
            json!({ "email": "bob@example.com", "displayName": "   " }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["success"], true);
    assert_eq!(sender.sent_emails().len(), 1);
}

#[tokio::test]
async fn test_必須フィールドが無いボディは400() {
    let app = app_with(MockNotificationSender::delivering(DeliveryProvider::SendGrid));

    let (status, body) = send(
        app,
        post_json(
            "/internal/notifications/welcome",
            json!({ "email": "bob@example.com" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["type"], "https://receiptoverse.com/errors/bad-request");
}

#[tokio::test]
async fn test_確認トークンは64桁の16進数() {
    let app = app_with(MockNotificationSender::delivering(DeliveryProvider::Fallback));

    let (status, body) = send(app, post_json("/internal/verification-tokens", json!({}))).await;

    assert_eq!(status, StatusCode::CREATED);
    let token = body["data"]["token"].as_str().unwrap();
    assert_eq!(token.len(), 64);
    assert!(
        token
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    );
}

#[tokio::test]
async fn test_接続テストはフォールバックでは未設定を返す() {
    let app = app_with(MockNotificationSender::delivering(DeliveryProvider::Fallback));

    let (status, body) = send(app, get("/internal/notifications/connection")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["success"], false);
    assert_eq!(body["data"]["provider"], "fallback");
    assert!(body["data"]["error"].is_string());
}

#[tokio::test]
async fn test_ヘルスチェックはhealthyを返す() {
    let app = app_with(MockNotificationSender::delivering(DeliveryProvider::Fallback));

    let (status, body) = send(app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_接続できないプロバイダではreadinessが503() {
    let app = app_with(MockNotificationSender::new(
        DeliveryProvider::Smtp,
        MockBehavior::Fail(
            receiptoverse_domain::notification::NotificationError::Connection(
                "refused".to_string(),
            ),
        ),
    ));

    let (status, body) = send(app, get("/health/ready")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({ "status": "not_ready", "checks": { "email": "error" } }));
}

#[tokio::test]
async fn test_フォールバック配信ではreadinessが200() {
    let app = app_with(MockNotificationSender::delivering(DeliveryProvider::Fallback));

    let (status, body) = send(app, get("/health/ready")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}
