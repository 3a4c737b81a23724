use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// サーバーが返す GraphQL エラーの正規形。
///
/// レスポンスの `errors` 配列の各要素 (`message` / `locations` / `path` / `extensions`)
/// に対応する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct GraphQlError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<ErrorLocation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLocation {
    pub line: u32,
    pub column: u32,
}

/// エラーが発生したフィールドまでのパスの 1 要素。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(u64),
}

/// `GraphQlError` の生成時に認識される追加フィールド。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphQlErrorOptions {
    pub locations: Option<Vec<ErrorLocation>>,
    pub path: Option<Vec<PathSegment>>,
    pub extensions: Option<Map<String, Value>>,
}

impl GraphQlErrorOptions {
    /// レコードから認識できるフィールドだけを取り出す。
    ///
    /// 未知のフィールドと、型が合わないフィールドは破棄される。
    pub fn from_record(record: &Map<String, Value>) -> Self {
        Self {
            locations: recognize(record, "locations"),
            path: recognize(record, "path"),
            extensions: recognize(record, "extensions"),
        }
    }
}

fn recognize<T: DeserializeOwned>(record: &Map<String, Value>, field: &str) -> Option<T> {
    let value = record.get(field)?;
    if value.is_null() {
        return None;
    }
    match T::deserialize(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::debug!(field, error = %e, "GraphQL エラーの不正なフィールドを破棄しました");
            None
        }
    }
}

impl GraphQlError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_options(message, GraphQlErrorOptions::default())
    }

    pub fn with_options(message: impl Into<String>, options: GraphQlErrorOptions) -> Self {
        Self {
            message: message.into(),
            locations: options.locations,
            path: options.path,
            extensions: options.extensions,
        }
    }

    /// 緩い形のエラーレコードから正規形を組み立てる。入力は変更しない。
    pub fn from_record(record: &Value) -> Self {
        let Some(fields) = record.as_object() else {
            tracing::debug!("オブジェクトではない GraphQL エラーレコードを受け取りました");
            return Self::new(String::new());
        };
        let message = match fields.get("message") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        Self::with_options(message, GraphQlErrorOptions::from_record(fields))
    }
}

/// 正規形か、まだ正規化されていないレコードのどちらか。
#[derive(Debug, Clone)]
pub enum GraphQlErrorLike {
    Revived(Arc<GraphQlError>),
    Record(Value),
}

impl From<GraphQlError> for GraphQlErrorLike {
    fn from(error: GraphQlError) -> Self {
        Self::Revived(Arc::new(error))
    }
}

impl From<Arc<GraphQlError>> for GraphQlErrorLike {
    fn from(error: Arc<GraphQlError>) -> Self {
        Self::Revived(error)
    }
}

impl From<Value> for GraphQlErrorLike {
    fn from(record: Value) -> Self {
        Self::Record(record)
    }
}

impl From<Map<String, Value>> for GraphQlErrorLike {
    fn from(record: Map<String, Value>) -> Self {
        Self::Record(Value::Object(record))
    }
}

/// エラーを正規形に揃える。
///
/// 既に正規形であれば同じ `Arc` をそのまま返す (コピーしない)。
pub fn revive_graphql_error(error: impl Into<GraphQlErrorLike>) -> Arc<GraphQlError> {
    match error.into() {
        GraphQlErrorLike::Revived(error) => error,
        GraphQlErrorLike::Record(record) => Arc::new(GraphQlError::from_record(&record)),
    }
}
