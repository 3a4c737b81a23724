//! 通信層が GraphQL 結果の `extensions` に載せて運ぶプロトコルエラー。
//!
//! GraphQL の結果しか流せないチャネル (サブスクリプションなど) で、
//! GraphQL 以外のエラーを上位層へ渡すために使う。

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::response::{ExtensionKey, Extensions, GraphQlResponse, MarkerId};

/// プロトコルエラー配列を格納する拡張キー。プロセス起動後に一度だけ生成される。
pub static PROTOCOL_ERRORS: LazyLock<ExtensionKey> =
    LazyLock::new(|| ExtensionKey::Marker(MarkerId::allocate()));

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct ProtocolError {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<Value>>,
}

impl ProtocolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            extensions: None,
        }
    }

    pub fn with_extensions(mut self, extensions: Vec<Value>) -> Self {
        self.extensions = Some(extensions);
        self
    }

    fn to_value(&self) -> Value {
        let mut record = Map::new();
        record.insert("message".to_string(), Value::String(self.message.clone()));
        if let Some(extensions) = &self.extensions {
            record.insert("extensions".to_string(), Value::Array(extensions.clone()));
        }
        Value::Object(record)
    }
}

/// 結果にプロトコルエラーが含まれているか判定する。
pub fn has_protocol_errors<T>(result: &GraphQlResponse<T>) -> bool {
    protocol_errors(result).is_some()
}

/// マーカーキーの値が配列の場合だけ、その要素を返す。
pub fn protocol_errors<T>(result: &GraphQlResponse<T>) -> Option<&[Value]> {
    result
        .extensions
        .as_ref()?
        .get(&PROTOCOL_ERRORS)?
        .as_array()
        .map(Vec::as_slice)
}

/// プロトコルエラーを `ProtocolError` として取り出す。
///
/// 解釈できない要素はメッセージなしのエラーとして扱う。
pub fn take_protocol_errors<T>(result: &GraphQlResponse<T>) -> Option<Vec<ProtocolError>> {
    let values = protocol_errors(result)?;
    Some(
        values
            .iter()
            .map(|value| {
                ProtocolError::deserialize(value).unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "不正なプロトコルエラーを受信しました");
                    ProtocolError::default()
                })
            })
            .collect(),
    )
}

/// 通信層から結果にプロトコルエラーを追加する。既存の配列があれば末尾に追加する。
pub fn attach_protocol_errors<T>(result: &mut GraphQlResponse<T>, errors: Vec<ProtocolError>) {
    let extensions = result.extensions.get_or_insert_with(Extensions::new);
    let mut values = match extensions.remove(&PROTOCOL_ERRORS) {
        Some(Value::Array(existing)) => existing,
        _ => Vec::new(),
    };
    values.extend(errors.iter().map(ProtocolError::to_value));
    extensions.insert(PROTOCOL_ERRORS.clone(), Value::Array(values));
}
