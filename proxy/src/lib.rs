//! Ollama Autopull Proxy
//!
//! OpenAI互換クライアントとOllama互換バックエンドの間に立つリバースプロキシ。
//! リクエストのモデル指定を書き換え、必要に応じてモデルを事前にpullしてから転送する。

#![warn(missing_docs)]

/// 共通型定義（エラー型）
pub mod common;

/// REST APIハンドラー
pub mod api;

/// CLIインターフェース
pub mod cli;

/// 設定管理（環境変数ヘルパー）
pub mod config;

/// ロギング初期化ユーティリティ
pub mod logging;

/// モデル可用性キャッシュと自動pull
pub mod models;

/// Ollamaバックエンドクライアント
pub mod ollama;

/// axumサーバー起動・シャットダウンハンドリング
pub mod server;

use std::sync::Arc;

use config::ProxyConfig;
use models::{ModelAvailabilityCache, ModelProvisioner};
use ollama::{ModelBackend, OllamaClient};

/// アプリケーション状態
#[derive(Clone)]
pub struct AppState {
    /// 起動時に確定したプロキシ設定
    pub config: Arc<ProxyConfig>,
    /// 共有HTTPクライアント（接続プーリング有効）
    pub http_client: reqwest::Client,
    /// モデル自動pull（キャッシュを内包）
    pub provisioner: Arc<ModelProvisioner>,
}

impl AppState {
    /// 設定からOllamaクライアントを組み立てて状態を作成
    pub fn new(config: ProxyConfig) -> Self {
        let http_client = reqwest::Client::new();
        let backend: Arc<dyn ModelBackend> = Arc::new(OllamaClient::new(
            http_client.clone(),
            config.upstream_base.clone(),
        ));
        Self::with_backend(config, http_client, backend)
    }

    /// バックエンド実装を差し替えて状態を作成（テスト用の注入口）
    pub fn with_backend(
        config: ProxyConfig,
        http_client: reqwest::Client,
        backend: Arc<dyn ModelBackend>,
    ) -> Self {
        let cache = Arc::new(ModelAvailabilityCache::new(
            backend.clone(),
            config.models_cache_ttl,
        ));
        let provisioner = Arc::new(ModelProvisioner::new(cache, backend, config.auto_pull));

        Self {
            config: Arc::new(config),
            http_client,
            provisioner,
        }
    }
}
