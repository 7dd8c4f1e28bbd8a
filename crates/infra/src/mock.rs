//! # テスト用モック送信
//!
//! ユースケース・ハンドラのテストで使用するインメモリの [`NotificationSender`] 実装。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! receiptoverse-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::{
   sync::{Arc, Mutex},
   time::Duration,
};

use async_trait::async_trait;
use receiptoverse_domain::notification::{
   DeliveryProvider,
   EmailMessage,
   NotificationError,
   SentEmail,
};

use crate::notification::{NotificationSender, spawn_with_deadline};

/// モックの振る舞い
#[derive(Debug, Clone)]
pub enum MockBehavior {
   /// 受け付けてメッセージ ID を返す
   Deliver,
   /// 指定したエラーを返す
   Fail(NotificationError),
   /// 応答しない（送信期限でタイムアウトする）
   Hang,
   /// 送信処理中にパニックする
   Panic,
}

#[derive(Clone)]
pub struct MockNotificationSender {
   provider: DeliveryProvider,
   behavior: MockBehavior,
   deadline: Duration,
   sent:     Arc<Mutex<Vec<EmailMessage>>>,
}

impl MockNotificationSender {
   pub fn new(provider: DeliveryProvider, behavior: MockBehavior) -> Self {
      Self {
         provider,
         behavior,
         deadline: Duration::from_secs(20),
         sent: Arc::new(Mutex::new(Vec::new())),
      }
   }

   /// 受け付けるモック
   pub fn delivering(provider: DeliveryProvider) -> Self {
      Self::new(provider, MockBehavior::Deliver)
   }

   /// `Hang` の送信期限を変更する
   pub fn with_deadline(mut self, deadline: Duration) -> Self {
      self.deadline = deadline;
      self
   }

   /// 受け付けたメール
   pub fn sent_emails(&self) -> Vec<EmailMessage> {
      self.sent.lock().unwrap().clone()
   }
}

#[async_trait]
impl NotificationSender for MockNotificationSender {
   async fn send_email(&self, email: &EmailMessage) -> Result<SentEmail, NotificationError> {
      match &self.behavior {
         MockBehavior::Deliver => {
            let mut sent = self.sent.lock().unwrap();
            sent.push(email.clone());
            if self.provider == DeliveryProvider::Fallback {
               return Ok(SentEmail::new(
                  receiptoverse_domain::notification::FALLBACK_MESSAGE_ID,
               ));
            }
            Ok(SentEmail::new(format!("mock-{}", sent.len())))
         }
         MockBehavior::Fail(error) => Err(error.clone()),
         MockBehavior::Hang => {
            spawn_with_deadline(
               self.deadline,
               std::future::pending::<Result<SentEmail, NotificationError>>(),
            )
            .await
         }
         MockBehavior::Panic => panic!("MockNotificationSender: 意図的なパニック"),
      }
   }

   fn provider(&self) -> DeliveryProvider {
      self.provider
   }

   async fn verify_connection(&self) -> Result<(), NotificationError> {
      match &self.behavior {
         MockBehavior::Fail(error) => Err(error.clone()),
         _ => Ok(()),
      }
   }
}
