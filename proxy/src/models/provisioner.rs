//! モデル自動pull
//!
//! 転送前に「モデルがバックエンドに存在する」状態を保証する。
//! モデルごとの状態遷移:
//!
//! ```text
//! Unknown -> Checking -> Present
//!                     -> Pulling -> Present
//!                                -> PullFailed
//! ```
//!
//! 状態表に残るのは処理中（`Checking`/`Pulling`）のモデルだけで、
//! `Present`/`PullFailed` に達したエントリはログに残して取り除く。
//! クライアントが任意のモデル名を送っても表は処理中の件数を超えて育たない。
//!
//! 同一モデルへの同時リクエストは調停しない。どちらもpullを発行し得るが、
//! バックエンドのpullは冪等なので結果は変わらない。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::cache::ModelAvailabilityCache;
use crate::common::error::ProxyResult;
use crate::ollama::ModelBackend;

/// モデルごとの可用性状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelState {
    /// 処理中でない（未確認、確認失敗、または終了済み）
    #[default]
    Unknown,
    /// キャッシュで存在確認中
    Checking,
    /// バックエンドに存在する
    Present,
    /// pull実行中
    Pulling,
    /// 直近のpullが失敗した
    PullFailed,
}

/// モデル自動pullオーケストレーター
pub struct ModelProvisioner {
    cache: Arc<ModelAvailabilityCache>,
    backend: Arc<dyn ModelBackend>,
    auto_pull: bool,
    states: RwLock<HashMap<String, ModelState>>,
}

impl ModelProvisioner {
    /// 新規作成
    pub fn new(
        cache: Arc<ModelAvailabilityCache>,
        backend: Arc<dyn ModelBackend>,
        auto_pull: bool,
    ) -> Self {
        Self {
            cache,
            backend,
            auto_pull,
            states: RwLock::new(HashMap::new()),
        }
    }

    /// 自動pullが有効か
    pub fn auto_pull(&self) -> bool {
        self.auto_pull
    }

    /// モデルの現在の状態
    ///
    /// 処理中でなければ `Unknown`（終了状態は保持しない）。
    pub async fn state(&self, model: &str) -> ModelState {
        self.states
            .read()
            .await
            .get(model)
            .copied()
            .unwrap_or_default()
    }

    async fn transition(&self, model: &str, state: ModelState) {
        debug!(model = %model, state = ?state, "Model state transition");
        let mut states = self.states.write().await;
        match state {
            ModelState::Checking | ModelState::Pulling => {
                states.insert(model.to_string(), state);
            }
            ModelState::Unknown | ModelState::Present | ModelState::PullFailed => {
                states.remove(model);
            }
        }
    }

    /// モデルが利用可能であることを保証する
    ///
    /// 自動pull無効時は何もしない。存在しなければpull完了まで待機し、
    /// 成功後にキャッシュを無効化する。pull失敗時はキャッシュを無効化しない。
    pub async fn ensure(&self, model: &str) -> ProxyResult<()> {
        if !self.auto_pull {
            return Ok(());
        }

        self.transition(model, ModelState::Checking).await;
        let present = match self.cache.contains(model).await {
            Ok(present) => present,
            Err(e) => {
                self.transition(model, ModelState::Unknown).await;
                return Err(e);
            }
        };

        if present {
            self.transition(model, ModelState::Present).await;
            return Ok(());
        }

        info!(model = %model, "Model not present on backend, pulling");
        self.transition(model, ModelState::Pulling).await;
        match self.backend.pull_model(model).await {
            Ok(()) => {
                self.cache.invalidate().await;
                self.transition(model, ModelState::Present).await;
                Ok(())
            }
            Err(e) => {
                warn!(model = %model, error = %e, "Model pull failed");
                self.transition(model, ModelState::PullFailed).await;
                Err(e)
            }
        }
    }
}
