use std::fmt;
use std::sync::Arc;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::error::{BoxedError, ClientError};
use crate::graphql::{revive_graphql_error, GraphQlError, GraphQlErrorLike};
use crate::network::NetworkError;
use crate::protocol::{take_protocol_errors, ProtocolError};
use crate::response::GraphQlResponse;

/// メッセージを持たないエラーの代わりに使う文言。
pub const MESSAGE_NOT_FOUND: &str = "Error message not found.";

/// `CombinedError` の生成オプション。
#[derive(Debug, Clone, Default)]
pub struct CombinedErrorOptions {
    pub graphql_errors: Vec<GraphQlErrorLike>,
    pub protocol_errors: Vec<ProtocolError>,
    pub client_errors: Vec<BoxedError>,
    pub network_error: Option<NetworkError>,
    pub error_message: Option<String>,
    pub extra_info: Option<Value>,
}

impl CombinedErrorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graphql_errors<I, E>(mut self, errors: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<GraphQlErrorLike>,
    {
        self.graphql_errors.extend(errors.into_iter().map(Into::into));
        self
    }

    pub fn graphql_error(mut self, error: impl Into<GraphQlErrorLike>) -> Self {
        self.graphql_errors.push(error.into());
        self
    }

    pub fn protocol_errors(mut self, errors: impl IntoIterator<Item = ProtocolError>) -> Self {
        self.protocol_errors.extend(errors);
        self
    }

    pub fn protocol_error(mut self, error: ProtocolError) -> Self {
        self.protocol_errors.push(error);
        self
    }

    pub fn client_errors(mut self, errors: impl IntoIterator<Item = BoxedError>) -> Self {
        self.client_errors.extend(errors);
        self
    }

    pub fn client_error<E>(mut self, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.client_errors.push(Arc::new(error));
        self
    }

    pub fn network_error(mut self, error: impl Into<NetworkError>) -> Self {
        self.network_error = Some(error.into());
        self
    }

    /// 指定するとメッセージは生成されず、この値がそのまま使われる。
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn extra_info(mut self, extra_info: Value) -> Self {
        self.extra_info = Some(extra_info);
        self
    }
}

/// GraphQL エラー・プロトコルエラー・クライアントエラー・ネットワークエラーを
/// 1 つにまとめたエラー。
///
/// `message` は明示指定がなければ、各エラーのメッセージを
/// GraphQL → クライアント → プロトコル → ネットワークの順に改行で連結したものになる。
/// この順序はフィールドの並びと異なるが、変更しないこと。
#[derive(Debug, Clone)]
pub struct CombinedError {
    pub graphql_errors: Vec<Arc<GraphQlError>>,
    pub protocol_errors: Vec<ProtocolError>,
    pub client_errors: Vec<BoxedError>,
    pub network_error: Option<NetworkError>,
    pub message: String,
    pub extra_info: Option<Value>,
}

impl CombinedError {
    pub const NAME: &'static str = "CombinedError";

    pub fn new(options: CombinedErrorOptions) -> Self {
        let mut error = Self {
            graphql_errors: options
                .graphql_errors
                .into_iter()
                .map(revive_graphql_error)
                .collect(),
            protocol_errors: options.protocol_errors,
            client_errors: options.client_errors,
            network_error: options.network_error,
            message: String::new(),
            extra_info: options.extra_info,
        };
        error.message = match options.error_message {
            Some(message) => message,
            None => error.generate_message(),
        };
        error
    }

    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    /// 実行結果をエラーとして扱うべきか判定する。
    ///
    /// プロトコルエラーがあればそれを優先し、なければ `errors` が空でない場合に
    /// GraphQL エラーをまとめる。どちらもなければ `None`。
    pub fn from_response<T>(result: &GraphQlResponse<T>) -> Option<Self> {
        if let Some(protocol_errors) = take_protocol_errors(result) {
            tracing::debug!(
                count = protocol_errors.len(),
                "プロトコルエラーを含む結果を受信しました"
            );
            return Some(Self::new(
                CombinedErrorOptions::new().protocol_errors(protocol_errors),
            ));
        }
        let errors = result.errors.as_ref().filter(|errors| !errors.is_empty())?;
        tracing::debug!(count = errors.len(), "GraphQL エラーを含む結果を受信しました");
        Some(Self::new(
            CombinedErrorOptions::new().graphql_errors(errors.iter().cloned()),
        ))
    }

    /// エラーとその `source()` を順にたどり、`CombinedError` を探す。
    pub fn find_in<'a>(error: &'a (dyn std::error::Error + 'static)) -> Option<&'a Self> {
        let mut current = Some(error);
        while let Some(err) = current {
            if let Some(combined) = err.downcast_ref::<Self>() {
                return Some(combined);
            }
            current = err.source();
        }
        None
    }

    fn contributing_errors(
        &self,
    ) -> impl Iterator<Item = &'_ (dyn std::error::Error + 'static)> + '_ {
        let graphql = self
            .graphql_errors
            .iter()
            .map(|err| &**err as &(dyn std::error::Error + 'static));
        let client = self
            .client_errors
            .iter()
            .map(|err| &**err as &(dyn std::error::Error + 'static));
        let protocol = self
            .protocol_errors
            .iter()
            .map(|err| err as &(dyn std::error::Error + 'static));
        let network = self
            .network_error
            .iter()
            .map(|err| err as &(dyn std::error::Error + 'static));
        graphql.chain(client).chain(protocol).chain(network)
    }

    fn generate_message(&self) -> String {
        self.contributing_errors()
            .map(|err| {
                let message = err.to_string();
                if message.is_empty() {
                    MESSAGE_NOT_FOUND.to_string()
                } else {
                    message
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for CombinedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CombinedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.contributing_errors().next()
    }
}

impl From<ClientError> for CombinedError {
    fn from(err: ClientError) -> Self {
        Self::new(CombinedErrorOptions::new().client_error(err))
    }
}

impl From<NetworkError> for CombinedError {
    fn from(err: NetworkError) -> Self {
        Self::new(CombinedErrorOptions::new().network_error(err))
    }
}

fn network_error_value(err: &NetworkError) -> Value {
    let mut record = Map::new();
    record.insert("name".to_string(), json!(err.name()));
    record.insert("message".to_string(), json!(err.to_string()));
    match err {
        NetworkError::Generic(_) => {}
        NetworkError::Parse(parse) => {
            record.insert("statusCode".to_string(), json!(parse.status_code));
            record.insert("bodyText".to_string(), json!(parse.body_text));
        }
        NetworkError::Server(server) => {
            record.insert("statusCode".to_string(), json!(server.status_code));
            record.insert(
                "result".to_string(),
                server.result.clone().unwrap_or(Value::Null),
            );
        }
    }
    Value::Object(record)
}

/// 境界をまたいで受け渡すための形でシリアライズする。
impl Serialize for CombinedError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let graphql_errors: Vec<&GraphQlError> =
            self.graphql_errors.iter().map(|err| &**err).collect();
        let client_errors: Vec<Value> = self
            .client_errors
            .iter()
            .map(|err| json!({ "message": err.to_string() }))
            .collect();
        let network_error = self.network_error.as_ref().map(network_error_value);

        let mut state = serializer.serialize_struct("CombinedError", 7)?;
        state.serialize_field("name", Self::NAME)?;
        state.serialize_field("message", &self.message)?;
        state.serialize_field("graphQLErrors", &graphql_errors)?;
        state.serialize_field("protocolErrors", &self.protocol_errors)?;
        state.serialize_field("clientErrors", &client_errors)?;
        state.serialize_field("networkError", &network_error)?;
        state.serialize_field("extraInfo", &self.extra_info)?;
        state.end()
    }
}

/// 値が `CombinedError` の形をしているか判定する。
///
/// 型ではなく `graphQLErrors` フィールドの有無で判定するため、
/// シリアライズを経由した値や他のプロセスで生成された値にも使える。
pub fn is_combined_error(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|fields| fields.contains_key("graphQLErrors"))
}
