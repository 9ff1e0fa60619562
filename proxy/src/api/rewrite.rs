//! 転送リクエストの組み立て
//!
//! 受信リクエストから上流へ送るリクエストを作る。接続固有ヘッダーと
//! `model` クエリを取り除き、JSONボディであればmodelフィールドを補完・上書きする。

use axum::{
    body::Bytes,
    http::{header, HeaderMap, Method},
};
use serde_json::{Map, Value};
use tracing::debug;

use super::model_name::{ModelSelection, MODEL_QUERY_KEY};
use crate::common::error::{ProxyError, ProxyResult};

/// 転送時に取り除く接続固有ヘッダー（送信側で再計算される）
const STRIPPED_REQUEST_HEADERS: [header::HeaderName; 3] =
    [header::CONTENT_LENGTH, header::TRANSFER_ENCODING, header::HOST];

/// 受信リクエスト
#[derive(Debug, Clone)]
pub struct InboundRequest {
    /// HTTPメソッド
    pub method: Method,
    /// URIパス（`/v1/...`、デコードしない）
    pub path: String,
    /// リクエストヘッダー
    pub headers: HeaderMap,
    /// デコード済みクエリパラメータ（出現順）
    pub query: Vec<(String, String)>,
    /// 生ボディ
    pub body: Bytes,
}

/// 転送ボディ
///
/// 生バイトか、modelを書き換えたJSONオブジェクトのどちらか一方だけを送る。
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundBody {
    /// 受信したバイト列をそのまま送る
    Raw(Bytes),
    /// modelを適用したJSONオブジェクトを再シリアライズして送る
    Json(Map<String, Value>),
}

impl OutboundBody {
    /// 送信用のバイト列に変換
    pub fn into_bytes(self) -> ProxyResult<Bytes> {
        match self {
            Self::Raw(bytes) => Ok(bytes),
            Self::Json(object) => serde_json::to_vec(&object)
                .map(Bytes::from)
                .map_err(|e| ProxyError::Internal(format!("Failed to serialize body: {}", e))),
        }
    }
}

/// 上流へ送るリクエスト
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    /// HTTPメソッド
    pub method: Method,
    /// 転送先URL（クエリなし）
    pub url: String,
    /// `model` を除いたクエリパラメータ
    pub query: Vec<(String, String)>,
    /// 接続固有ヘッダーを除いたヘッダー
    pub headers: HeaderMap,
    /// 転送ボディ
    pub body: OutboundBody,
}

impl OutboundRequest {
    /// reqwestのリクエストビルダーに変換
    pub fn into_request_builder(
        self,
        client: &reqwest::Client,
    ) -> ProxyResult<reqwest::RequestBuilder> {
        let body = self.body.into_bytes()?;
        Ok(client
            .request(self.method, &self.url)
            .query(&self.query)
            .headers(self.headers)
            .body(body))
    }
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false)
}

/// JSONオブジェクトにモデルを適用する
///
/// `force` なら無条件に上書き、そうでなければ未指定の場合だけ補完する。
pub fn apply_model(object: &mut Map<String, Value>, model: &str, force: bool) {
    if force {
        object.insert(MODEL_QUERY_KEY.to_string(), Value::String(model.to_string()));
    } else {
        object
            .entry(MODEL_QUERY_KEY)
            .or_insert_with(|| Value::String(model.to_string()));
    }
}

/// 受信リクエストから転送リクエストを作る
///
/// JSONとして解析できないボディは生バイトのまま転送する。このとき
/// `?model=` はクエリからは除かれるがボディには反映されない。
pub fn rewrite_request(
    inbound: InboundRequest,
    selection: &ModelSelection,
    upstream_base: &str,
) -> OutboundRequest {
    let mut headers = inbound.headers;
    for name in &STRIPPED_REQUEST_HEADERS {
        headers.remove(name);
    }

    let query = inbound
        .query
        .into_iter()
        .filter(|(key, _)| key != MODEL_QUERY_KEY)
        .collect();

    let body = if is_json_content_type(&headers) && !inbound.body.is_empty() {
        match serde_json::from_slice::<Value>(&inbound.body) {
            Ok(Value::Object(mut object)) => {
                apply_model(&mut object, &selection.model, selection.forced);
                OutboundBody::Json(object)
            }
            Ok(_) => OutboundBody::Raw(inbound.body),
            Err(e) => {
                debug!(error = %e, "Request body is not valid JSON, forwarding raw bytes");
                OutboundBody::Raw(inbound.body)
            }
        }
    } else {
        OutboundBody::Raw(inbound.body)
    };

    OutboundRequest {
        method: inbound.method,
        url: format!("{}{}", upstream_base, inbound.path),
        query,
        headers,
        body,
    }
}
