//! k1s0-graphql-errors: GraphQL クライアントのエラー集約ライブラリ。
//!
//! サーバーが返す GraphQL エラー、通信層が注入するプロトコルエラー、
//! クライアント側のエラー、ネットワークエラーを `CombinedError` にまとめる。

pub mod combined;
pub mod error;
pub mod graphql;
pub mod network;
pub mod protocol;
pub mod response;

pub use combined::{is_combined_error, CombinedError, CombinedErrorOptions, MESSAGE_NOT_FOUND};
pub use error::{BoxedError, ClientError};
pub use graphql::{
    revive_graphql_error, ErrorLocation, GraphQlError, GraphQlErrorLike, GraphQlErrorOptions,
    PathSegment,
};
pub use network::{parse_json_body, NetworkError, ServerError, ServerParseError};
pub use protocol::{
    attach_protocol_errors, has_protocol_errors, protocol_errors, take_protocol_errors,
    ProtocolError, PROTOCOL_ERRORS,
};
pub use response::{ExtensionKey, Extensions, GraphQlResponse, MarkerId};
