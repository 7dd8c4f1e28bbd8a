//! # テンプレートレンダラー
//!
//! tera テンプレートエンジンで通知メールを HTML/plaintext 両形式で生成する。
//!
//! ## 設計方針
//!
//! - **`include_str!` によるコンパイル時埋め込み**: テンプレートはバイナリに埋め込まれる
//! - **件名は固定**: 通知種別ごとに 1 つ
//! - **リンク先**: ウェルカムメールのボタンとガイドは `{app_url}` と `{app_url}/guide`
//! - **入力は検証しない**: 宛先・表示名・コードは受け取った文字列をそのまま使う。
//!   宛先の妥当性は送信実装が判定し、配信結果の失敗として返す

use receiptoverse_domain::{
    notification::{EmailMessage, NotificationError, NotificationKind},
    verification::CODE_TTL_MINUTES,
};
use tera::{Context, Tera};

/// 確認コードメールの件名
pub const VERIFICATION_SUBJECT: &str = "🔐 Your ReceiptoVerse Verification Code";

/// ウェルカムメールの件名
pub const WELCOME_SUBJECT: &str = "🎉 Welcome to ReceiptoVerse!";

/// テンプレートレンダラー
///
/// tera テンプレートエンジンをラップし、通知種別ごとの `EmailMessage` を生成する。
pub struct TemplateRenderer {
    engine:  Tera,
    app_url: String,
}

impl TemplateRenderer {
    /// 新しいレンダラーインスタンスを作成
    ///
    /// `app_base_url` の末尾スラッシュは除去する。
    pub fn new(app_base_url: &str) -> Result<Self, NotificationError> {
        let mut engine = Tera::default();

        engine
            .add_raw_templates(vec![
                (
                    "verification.html",
                    include_str!("../../../templates/notifications/verification.html"),
                ),
                (
                    "verification.txt",
                    include_str!("../../../templates/notifications/verification.txt"),
                ),
                (
                    "welcome.html",
                    include_str!("../../../templates/notifications/welcome.html"),
                ),
                (
                    "welcome.txt",
                    include_str!("../../../templates/notifications/welcome.txt"),
                ),
            ])
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        Ok(Self {
            engine,
            app_url: app_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// 確認コードメールを生成する
    pub fn render_verification(
        &self,
        recipient: &str,
        code: &str,
        display_name: &str,
    ) -> Result<EmailMessage, NotificationError> {
        let mut context = self.base_context(display_name);
        context.insert("code", code);
        context.insert("ttl_minutes", &CODE_TTL_MINUTES);

        self.render(
            NotificationKind::Verification,
            recipient,
            VERIFICATION_SUBJECT,
            &context,
        )
    }

    /// ウェルカムメールを生成する
    pub fn render_welcome(
        &self,
        recipient: &str,
        display_name: &str,
    ) -> Result<EmailMessage, NotificationError> {
        let context = self.base_context(display_name);

        self.render(
            NotificationKind::Welcome,
            recipient,
            WELCOME_SUBJECT,
            &context,
        )
    }

    fn base_context(&self, display_name: &str) -> Context {
        let mut context = Context::new();
        context.insert("display_name", display_name);
        context.insert("app_url", &self.app_url);
        context
    }

    fn render(
        &self,
        kind: NotificationKind,
        recipient: &str,
        subject: &str,
        context: &Context,
    ) -> Result<EmailMessage, NotificationError> {
        let html_body = self
            .engine
            .render(&format!("{kind}.html"), context)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        let text_body = self
            .engine
            .render(&format!("{kind}.txt"), context)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        Ok(EmailMessage {
            to: recipient.to_string(),
            subject: subject.to_string(),
            html_body,
            text_body,
        })
    }
}
