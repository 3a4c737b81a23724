use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::graphql::GraphQlError;

static NEXT_MARKER: AtomicU64 = AtomicU64::new(0);

/// プロセス内でのみ生成できる拡張キーの識別子。
///
/// 公開コンストラクタを持たないため、文字列キーや他の値と衝突しない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(u64);

impl MarkerId {
    pub(crate) fn allocate() -> Self {
        Self(NEXT_MARKER.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExtensionKey {
    /// サーバーなどが設定する通常の文字列キー。
    Name(String),
    /// プロセス内のサイドチャネル用キー。シリアライズされない。
    Marker(MarkerId),
}

impl From<&str> for ExtensionKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for ExtensionKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// レスポンスの `extensions` マップ。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extensions {
    entries: BTreeMap<ExtensionKey, Value>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ExtensionKey) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_named(&self, name: &str) -> Option<&Value> {
        self.entries.get(&ExtensionKey::Name(name.to_string()))
    }

    pub fn insert(&mut self, key: impl Into<ExtensionKey>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &ExtensionKey) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 文字列キーのエントリのみを返す。
    pub fn named(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().filter_map(|(key, value)| match key {
            ExtensionKey::Name(name) => Some((name.as_str(), value)),
            ExtensionKey::Marker(_) => None,
        })
    }
}

impl FromIterator<(String, Value)> for Extensions {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(name, value)| (ExtensionKey::Name(name), value))
                .collect(),
        }
    }
}

impl Serialize for Extensions {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        for (name, value) in self.named() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Extensions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let named = Map::<String, Value>::deserialize(deserializer)?;
        Ok(named.into_iter().collect())
    }
}

/// GraphQL の実行結果ペイロード。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQlError>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Extensions>,
}

impl<T> GraphQlResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            data: Some(data),
            errors: None,
            extensions: None,
        }
    }

    pub fn errors(errors: Vec<GraphQlError>) -> Self {
        Self {
            data: None,
            errors: Some(errors),
            extensions: None,
        }
    }

    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = Some(extensions);
        self
    }

    /// `errors` が 1 件以上含まれているか。
    pub fn has_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|errors| !errors.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_with_data() {
        let json = r#"{"data":{"user":{"id":"1","name":"test"}},"errors":null}"#;
        let resp: GraphQlResponse<serde_json::Value> = serde_json::from_str(json).unwrap();
        assert!(resp.data.is_some());
        assert!(resp.errors.is_none());
        assert!(resp.extensions.is_none());
        assert!(!resp.has_errors());
    }

    #[test]
    fn test_response_with_errors() {
        let json = r#"{"data":null,"errors":[{"message":"not found","locations":[{"line":1,"column":3}],"path":["user"]}],"extensions":{"cost":3}}"#;
        let resp: GraphQlResponse<serde_json::Value> = serde_json::from_str(json).unwrap();
        assert!(resp.data.is_none());
        assert!(resp.has_errors());
        let errors = resp.errors.as_ref().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "not found");
        let extensions = resp.extensions.as_ref().unwrap();
        assert_eq!(extensions.get_named("cost"), Some(&json!(3)));
    }

    #[test]
    fn test_marker_entries_are_not_serialized() {
        let mut extensions = Extensions::new();
        extensions.insert("tracing", json!({"version": 1}));
        extensions.insert(ExtensionKey::Marker(MarkerId::allocate()), json!([1, 2]));
        assert_eq!(extensions.len(), 2);

        let resp = GraphQlResponse::data(json!({"ok": true})).with_extensions(extensions);
        let serialized = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            serialized["extensions"],
            json!({"tracing": {"version": 1}})
        );
    }

    #[test]
    fn test_marker_ids_are_unique() {
        let first = MarkerId::allocate();
        let second = MarkerId::allocate();
        assert_ne!(first, second);
    }

    #[test]
    fn test_named_key_never_matches_marker() {
        let marker = ExtensionKey::Marker(MarkerId::allocate());
        let mut extensions = Extensions::new();
        extensions.insert(marker.clone(), json!([]));
        assert!(extensions.get_named("0").is_none());
        assert!(extensions.named().next().is_none());
        assert!(extensions.remove(&marker).is_some());
        assert!(extensions.is_empty());
    }

    #[test]
    fn test_response_without_extensions_serializes_compactly() {
        let resp: GraphQlResponse<serde_json::Value> =
            GraphQlResponse::errors(vec![GraphQlError::new("x")]);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("errors"));
        assert!(!json.contains("extensions"));
    }
}
