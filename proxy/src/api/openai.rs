//! OpenAI互換の固定レスポンス系ハンドラー
//!
//! - `GET /v1/chat/completions`: 死活確認（バックエンドに触れない）
//! - `GET /v1/models`: 上流の一覧を透過し、失敗時はデフォルトモデルのみ返す

use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::{
    common::error::{ProxyError, ProxyResult},
    AppState,
};

/// `/v1/models` 上流呼び出しのタイムアウト
pub const MODELS_TIMEOUT: Duration = Duration::from_secs(30);

/// GET探測への応答
#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    /// 常に `true`
    pub ok: bool,
    /// 利用方法の案内
    pub note: &'static str,
    /// 設定されたデフォルトモデル
    pub default_model: String,
    /// 自動pullが有効か
    pub auto_pull: bool,
}

/// OpenAI形式のモデル一覧
#[derive(Debug, Serialize)]
pub struct ModelList {
    /// 固定: "list"
    pub object: &'static str,
    /// モデル一覧
    pub data: Vec<ModelEntry>,
}

/// モデル一覧の要素
#[derive(Debug, Serialize)]
pub struct ModelEntry {
    /// モデルID
    pub id: String,
    /// 固定: "model"
    pub object: &'static str,
    /// 固定: "ollama"
    pub owned_by: &'static str,
}

impl ModelList {
    /// デフォルトモデルだけを含むフォールバック一覧
    pub fn fallback(default_model: &str) -> Self {
        Self {
            object: "list",
            data: vec![ModelEntry {
                id: default_model.to_string(),
                object: "model",
                owned_by: "ollama",
            }],
        }
    }
}

/// GET /v1/chat/completions - 死活確認
///
/// GETで到達性を判定するクライアントに405を返さないためのエンドポイント。
pub async fn chat_completions_probe(State(state): State<AppState>) -> Json<ProbeResponse> {
    Json(ProbeResponse {
        ok: true,
        note: "Use POST /v1/chat/completions. Proxy is alive.",
        default_model: state.config.default_model.clone(),
        auto_pull: state.config.auto_pull,
    })
}

/// GET /v1/models - モデル一覧
pub async fn list_models(State(state): State<AppState>) -> Response {
    match fetch_upstream_models(&state).await {
        Ok(models) => Json(models).into_response(),
        Err(e) => {
            warn!(error = %e, "Upstream model list unavailable, using fallback");
            Json(ModelList::fallback(&state.config.default_model)).into_response()
        }
    }
}

async fn fetch_upstream_models(state: &AppState) -> ProxyResult<Value> {
    let url = format!("{}/v1/models", state.config.upstream_base);
    let response = state
        .http_client
        .get(&url)
        .timeout(MODELS_TIMEOUT)
        .send()
        .await
        .map_err(|e| ProxyError::transport("GET /v1/models", e))?;

    let status = response.status();
    if status != StatusCode::OK {
        let message = response.text().await.unwrap_or_default();
        return Err(ProxyError::Upstream {
            status: status.as_u16(),
            message,
        });
    }

    response.json::<Value>().await.map_err(|e| {
        if e.is_decode() {
            ProxyError::Internal(format!("Failed to parse upstream model list: {}", e))
        } else {
            ProxyError::transport("GET /v1/models", e)
        }
    })
}
