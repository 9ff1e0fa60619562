//! Ollamaバックエンドクライアント
//!
//! ローカルモデル一覧（`GET /api/tags`）とモデルpull（`POST /api/pull`）。
//! `/v1/*` の透過転送はここではなく `api::proxy` が直接行う。

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::common::error::{ProxyError, ProxyResult};

/// `/api/tags` 呼び出しのタイムアウト
pub const TAGS_TIMEOUT: Duration = Duration::from_secs(30);

/// モデル一覧取得とpullを行うバックエンド
///
/// キャッシュとプロビジョナーはこのトレイト越しにバックエンドを呼ぶ。
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// バックエンドにローカル存在するモデル名の集合を取得
    async fn list_local_models(&self) -> ProxyResult<HashSet<String>>;

    /// モデルをpullし、完了まで待機する
    async fn pull_model(&self, model: &str) -> ProxyResult<()>;
}

/// Ollama tags response structure
#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

/// Ollama model info (minimal)
#[derive(Debug, Deserialize)]
struct OllamaModel {
    /// Model name (e.g., "llama3:8b")
    #[serde(default)]
    name: Option<String>,
}

/// Ollama pull request
#[derive(Debug, Serialize)]
struct OllamaPullRequest<'a> {
    model: &'a str,
    stream: bool,
}

impl OllamaTagsResponse {
    fn into_names(self) -> HashSet<String> {
        self.models
            .into_iter()
            .filter_map(|m| m.name)
            .filter(|name| !name.is_empty())
            .collect()
    }
}

/// reqwestによるOllamaクライアント
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    /// 共有クライアントとベースURLから作成
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ModelBackend for OllamaClient {
    async fn list_local_models(&self) -> ProxyResult<HashSet<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(TAGS_TIMEOUT)
            .send()
            .await
            .map_err(|e| ProxyError::transport("GET /api/tags", e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProxyError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let tags: OllamaTagsResponse = response.json().await.map_err(|e| {
            if e.is_decode() {
                ProxyError::Internal(format!("Failed to parse Ollama tags response: {}", e))
            } else {
                ProxyError::transport("GET /api/tags", e)
            }
        })?;
        let names = tags.into_names();
        debug!(model_count = names.len(), "Fetched local models");
        Ok(names)
    }

    async fn pull_model(&self, model: &str) -> ProxyResult<()> {
        let url = format!("{}/api/pull", self.base_url);
        info!(model = %model, "Pulling model from backend");

        // stream=false: pull完了までレスポンスが返らない。タイムアウトは設けない
        let response = self
            .client
            .post(&url)
            .json(&OllamaPullRequest {
                model,
                stream: false,
            })
            .send()
            .await
            .map_err(|e| ProxyError::transport("POST /api/pull", e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProxyError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        info!(model = %model, "Model pull completed");
        Ok(())
    }
}
