//! # API レスポンスエンベロープ
//!
//! 内部 API の統一レスポンス形式 `{ "data": T }` を提供する。

use serde::{Deserialize, Serialize};

/// 内部 API の統一レスポンス型
///
/// 配信結果・接続テスト結果・確認トークンはすべてこの形式で返す。
///
/// ## 使用例
///
/// ```
/// use receiptoverse_shared::ApiResponse;
///
/// let response = ApiResponse::new("hello");
/// assert_eq!(response.data, "hello");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializeでdataキーに包む() {
        let response = ApiResponse::new(serde_json::json!({ "token": "ab12" }));
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json, serde_json::json!({ "data": { "token": "ab12" } }));
    }

    #[test]
    fn test_deserializeでjsonからオブジェクトに変換する() {
        let response: ApiResponse<String> = serde_json::from_str(r#"{"data": "world"}"#).unwrap();

        assert_eq!(response.data, "world");
    }
}
