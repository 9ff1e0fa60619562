//! 上流レスポンスの中継
//!
//! `text/event-stream` はチャンク到着順にそのままストリーミングし、
//! それ以外はボディ全体をバッファしてから返す。

use std::io;

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::Response,
};
use futures::TryStreamExt;
use tracing::debug;

use crate::common::error::{ProxyError, ProxyResult};

fn is_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().contains("text/event-stream"))
        .unwrap_or(false)
}

/// 中継するヘッダーを組み立てる（`content-encoding` は常に除去）
fn relay_headers(upstream: &reqwest::header::HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream.iter() {
        if name == header::CONTENT_ENCODING {
            continue;
        }
        if let (Ok(header_name), Ok(header_value)) = (
            HeaderName::from_bytes(name.as_str().as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            headers.append(header_name, header_value);
        }
    }
    headers
}

fn build_response(status: reqwest::StatusCode, headers: HeaderMap, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::OK);
    *response.headers_mut() = headers;
    response
}

/// 上流レスポンスをクライアント向けレスポンスに変換する
///
/// ステータスコードは上流のものをそのまま使う（エラーステータスも隠さない）。
pub async fn relay_response(upstream: reqwest::Response) -> ProxyResult<Response> {
    let status = upstream.status();
    let headers = relay_headers(upstream.headers());

    if is_event_stream(upstream.headers()) {
        debug!(status = %status, "Relaying streaming response");
        // クライアント切断時はhyperがボディを破棄し、上流ストリームも閉じられる
        let stream = upstream.bytes_stream().map_err(io::Error::other);
        return Ok(build_response(status, headers, Body::from_stream(stream)));
    }

    debug!(status = %status, "Relaying buffered response");
    let body = upstream
        .bytes()
        .await
        .map_err(|e| ProxyError::transport("read upstream body", e))?;
    Ok(build_response(status, headers, Body::from(body)))
}
