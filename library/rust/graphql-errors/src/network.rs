use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::error::BoxedError;

/// 通信層で発生したエラー。
#[derive(Debug, Clone, Error)]
pub enum NetworkError {
    #[error(transparent)]
    Generic(BoxedError),
    #[error(transparent)]
    Parse(#[from] ServerParseError),
    #[error(transparent)]
    Server(#[from] ServerError),
}

impl NetworkError {
    pub fn generic<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Generic(Arc::new(err))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Generic(_) => "Error",
            Self::Parse(_) => "ServerParseError",
            Self::Server(_) => "ServerError",
        }
    }

    /// HTTP ステータスコードを持つ場合に返す。
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Generic(_) => None,
            Self::Parse(err) => Some(err.status_code),
            Self::Server(err) => Some(err.status_code),
        }
    }
}

/// サーバーが成功以外のステータスを返した。
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct ServerError {
    pub message: String,
    pub status_code: u16,
    pub result: Option<Value>,
}

impl ServerError {
    pub fn new(message: impl Into<String>, status_code: u16, result: Option<Value>) -> Self {
        Self {
            message: message.into(),
            status_code,
            result,
        }
    }

    pub fn from_status(status_code: u16, result: Option<Value>) -> Self {
        Self::new(
            format!("Response not successful: Received status code {status_code}"),
            status_code,
            result,
        )
    }
}

/// レスポンスボディを JSON として解釈できなかった。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ServerParseError {
    pub message: String,
    pub status_code: u16,
    pub body_text: String,
}

/// レスポンスボディを JSON として解析する。
pub fn parse_json_body(status_code: u16, body_text: &str) -> Result<Value, ServerParseError> {
    serde_json::from_str(body_text).map_err(|e| ServerParseError {
        message: e.to_string(),
        status_code,
        body_text: body_text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use serde_json::json;

    #[test]
    fn test_parse_json_body_ok() {
        let value = parse_json_body(200, r#"{"data":{"ok":true}}"#).unwrap();
        assert_eq!(value, json!({"data": {"ok": true}}));
    }

    #[test]
    fn test_parse_json_body_error() {
        let err = parse_json_body(502, "<html>Bad Gateway</html>").unwrap_err();
        assert_eq!(err.status_code, 502);
        assert_eq!(err.body_text, "<html>Bad Gateway</html>");
        assert!(!err.message.is_empty());
    }

    #[test]
    fn test_server_error_from_status() {
        let err = ServerError::from_status(500, Some(json!({"errors": []})));
        assert_eq!(
            err.to_string(),
            "Response not successful: Received status code 500"
        );
        assert!(err.result.is_some());
    }

    #[test]
    fn test_network_error_message_is_transparent() {
        let err: NetworkError = ServerError::new("down", 503, None).into();
        assert_eq!(err.to_string(), "down");
        assert_eq!(err.status_code(), Some(503));

        let err = NetworkError::generic(ClientError::InvalidState("offline".to_string()));
        assert_eq!(err.to_string(), "invalid state: offline");
        assert_eq!(err.status_code(), None);
    }
}
