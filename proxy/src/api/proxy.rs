//! `/v1/*` 汎用プロキシ APIハンドラー
//!
//! モデル選択 → 自動pull → リクエスト書き換え → 上流へ転送 → レスポンス中継。

use axum::{
    body::{self, Body},
    extract::{Request, State},
    response::Response,
};
use tracing::info;

use super::{
    model_name::select_model,
    relay::relay_response,
    rewrite::{rewrite_request, InboundRequest},
};
use crate::{common::error::ProxyError, AppState};

/// クエリ文字列をデコードしてペアの列にする（出現順を保持）
pub(crate) fn parse_query(raw: Option<&str>) -> Vec<(String, String)> {
    raw.and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
        .unwrap_or_default()
}

/// ANY /v1/{path} - 上流へ透過転送
///
/// 上流のエラーステータスはそのまま返す。プロキシ自身が失敗した場合
/// （到達不能、pull失敗）のみOpenAI形式のエラーを返す。
pub async fn proxy_v1(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();
    let query = parse_query(parts.uri.query());
    let selection = select_model(&query, &state.config.default_model);

    info!(
        method = %parts.method,
        path = %parts.uri.path(),
        model = %selection.model,
        forced = selection.forced,
        "Proxying request"
    );

    state.provisioner.ensure(&selection.model).await?;

    let body = body::to_bytes(body, usize::MAX)
        .await
        .map_err(|e| ProxyError::InvalidRequest(format!("Failed to read request body: {}", e)))?;

    let outbound = rewrite_request(
        InboundRequest {
            method: parts.method,
            path: parts.uri.path().to_string(),
            headers: parts.headers,
            query,
            body,
        },
        &selection,
        &state.config.upstream_base,
    );

    let response = outbound
        .into_request_builder(&state.http_client)?
        .send()
        .await
        .map_err(|e| ProxyError::transport("forward request", e))?;

    relay_response(response).await
}
