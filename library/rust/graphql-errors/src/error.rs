use std::sync::Arc;

use thiserror::Error;

/// 任意のエラー値を共有可能な形で保持するための型。
pub type BoxedError = Arc<dyn std::error::Error + Send + Sync>;

/// クライアント側のロジックで発生したエラー。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("deserialization error: {0}")]
    Deserialization(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl ClientError {
    /// serde_json のエラーからデシリアライズエラーを生成する。
    pub fn deserialization(err: &serde_json::Error) -> Self {
        Self::Deserialization(err.to_string())
    }

    pub fn into_boxed(self) -> BoxedError {
        Arc::new(self)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::deserialization(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_variants() {
        let err = ClientError::Validation("missing field".to_string());
        assert_eq!(err.to_string(), "validation error: missing field");

        let err = ClientError::InvalidState("closed".to_string());
        assert_eq!(err.to_string(), "invalid state: closed");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ClientError = json_err.into();
        assert!(matches!(err, ClientError::Deserialization(_)));
    }

    #[test]
    fn test_into_boxed_keeps_message() {
        let boxed = ClientError::Validation("bad".to_string()).into_boxed();
        assert_eq!(boxed.to_string(), "validation error: bad");
    }
}
