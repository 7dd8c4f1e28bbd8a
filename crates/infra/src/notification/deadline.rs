//! 送信期限付きのタスク実行
//!
//! 送信処理を独立したタスクとして起動し、`JoinHandle` を期限付きで待つ。
//! 期限を過ぎた場合は `JoinHandle` を手放すだけでタスクは中断しない。

use std::{future::Future, time::Duration};

use receiptoverse_domain::notification::NotificationError;

/// `future` を別タスクで実行し、`deadline` 以内の完了を待つ
///
/// - 期限内に完了: その結果をそのまま返す
/// - 期限超過: [`NotificationError::Timeout`]（タスクは放置され、バックグラウンドで完了する）
/// - タスクがパニック: [`NotificationError::Aborted`]
pub async fn spawn_with_deadline<F, T>(deadline: Duration, future: F) -> Result<T, NotificationError>
where
    F: Future<Output = Result<T, NotificationError>> + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::spawn(future);

    match tokio::time::timeout(deadline, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(NotificationError::Aborted(join_error.to_string())),
        Err(_elapsed) => {
            tracing::warn!(
                deadline_secs = deadline.as_secs(),
                "送信期限を超過したため結果を待たずに打ち切ります"
            );
            Err(NotificationError::Timeout { after: deadline })
        }
    }
}
