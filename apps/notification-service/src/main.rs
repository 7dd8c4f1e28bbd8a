//! # Notification Service サーバー
//!
//! ReceiptoVerse のメール通知を送る内部サービス。
//!
//! ## 役割
//!
//! - **確認コードメール**: 登録時のメールアドレス確認（6 桁、10 分で失効）
//! - **ウェルカムメール**: 確認完了後の案内
//! - **確認トークン発行**: リンク形式の確認に使うランダムトークン
//!
//! ## 配信プロバイダの選択
//!
//! 起動時に一度だけ決定する（先に条件を満たしたものが優先）。
//!
//! | 条件 | プロバイダ |
//! |------|-----------|
//! | `SENDGRID_API_KEY` あり | SendGrid |
//! | `EMAIL_HOST` / `EMAIL_USER` / `EMAIL_PASS` すべてあり | SMTP |
//! | `APP_ENV=development` | 開発用テスト受信箱（SMTP） |
//! | 上記以外 | フォールバック（ログ出力のみ） |
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `NOTIFICATION_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `NOTIFICATION_PORT` | No | ポート番号（デフォルト: `3000`） |
//! | `APP_BASE_URL` | No | メール内リンク（デフォルト: `https://receiptoverse.com`） |
//! | `LOG_FORMAT` | No | `json` または `pretty` |
//!
//! 配信設定のキーは [`receiptoverse_notification_service::config`] を参照。
//!
//! ## 起動方法
//!
//! ```bash
//! # 開発環境（テスト受信箱を使用）
//! APP_ENV=development cargo run -p receiptoverse-notification-service
//!
//! # 本番環境
//! SENDGRID_API_KEY=SG.xxx cargo run -p receiptoverse-notification-service --release
//! ```

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context as _;
use receiptoverse_domain::delivery::ProviderSelection;
use receiptoverse_infra::{EtherealClient, create_sender};
use receiptoverse_notification_service::{
    app_builder::build_app,
    config::{ServiceConfig, log_email_diagnostics},
    usecase::{NotificationService, TemplateRenderer},
};
use receiptoverse_shared::observability::{TracingConfig, init_tracing};
use tokio::net::TcpListener;

/// Notification Service サーバーのエントリーポイント
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    // トレーシング初期化
    let tracing_config = TracingConfig::from_env("notification-service");
    let _span = init_tracing(&tracing_config).entered();

    // 設定読み込み
    let config = ServiceConfig::from_env().context("設定の読み込みに失敗しました")?;
    log_email_diagnostics(|key| env::var(key).ok());
    tracing::debug!(settings = ?config.email, "配信設定を読み込みました");

    // 配信プロバイダを選択して送信実装を組み立てる
    let selection = ProviderSelection::resolve(&config.email);
    tracing::info!(provider = %selection.provider(), "メール配信プロバイダを選択しました");
    let ethereal =
        EtherealClient::with_defaults().context("テスト受信箱クライアントの構築に失敗しました")?;
    let sender = create_sender(selection, &config.email, &ethereal).await;

    let template_renderer = TemplateRenderer::new(&config.app_base_url)
        .context("メールテンプレートの読み込みに失敗しました")?;
    let service = Arc::new(NotificationService::new(sender, template_renderer));

    // ルーター構築
    let app = build_app(service);

    // サーバー起動
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("バインドアドレスが不正です")?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Notification Service サーバーを起動します: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
