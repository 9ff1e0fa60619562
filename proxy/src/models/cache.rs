//! ローカルモデル一覧のTTL付きキャッシュ
//!
//! `/api/tags` の呼び出し頻度を抑える。TTLを過ぎた読み取りは
//! 使用前に同期的にリフレッシュする。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::common::error::ProxyResult;
use crate::ollama::ModelBackend;

#[derive(Debug, Default)]
struct CacheEntry {
    models: Arc<HashSet<String>>,
    /// `None` は未取得または無効化済み（次回必ずリフレッシュ）
    refreshed_at: Option<Instant>,
    /// `invalidate` のたびに進む。取得中に無効化された結果は鮮度を持たない
    generation: u64,
}

impl CacheEntry {
    fn is_stale(&self, now: Instant, ttl: Duration) -> bool {
        match self.refreshed_at {
            None => true,
            Some(at) => now.saturating_duration_since(at) > ttl,
        }
    }
}

/// モデル可用性キャッシュ
///
/// プロセス内で1インスタンスを共有する。リフレッシュ中はロックを保持しないため、
/// 同時リフレッシュが起こり得るが、集合の差し替えは書き込みロック下で一括に行う。
pub struct ModelAvailabilityCache {
    backend: Arc<dyn ModelBackend>,
    ttl: Duration,
    entry: RwLock<CacheEntry>,
}

impl ModelAvailabilityCache {
    /// 新規キャッシュを作成（初回の `contains` で必ず取得する）
    pub fn new(backend: Arc<dyn ModelBackend>, ttl: Duration) -> Self {
        Self {
            backend,
            ttl,
            entry: RwLock::new(CacheEntry::default()),
        }
    }

    /// モデルがバックエンドに存在するか
    ///
    /// 取得に失敗した場合はエラーを返し、古い集合とタイムスタンプはそのまま残す
    /// （次回呼び出しで再試行される）。
    pub async fn contains(&self, model: &str) -> ProxyResult<bool> {
        let now = Instant::now();

        let cached = {
            let entry = self.entry.read().await;
            if entry.is_stale(now, self.ttl) {
                Err(entry.generation)
            } else {
                Ok(entry.models.clone())
            }
        };

        let models = match cached {
            Ok(models) => models,
            Err(generation) => self.refresh(now, generation).await?,
        };

        Ok(models.contains(model))
    }

    /// 次回の `contains` でTTLに関係なくリフレッシュさせる
    pub async fn invalidate(&self) {
        let mut entry = self.entry.write().await;
        entry.refreshed_at = None;
        entry.generation = entry.generation.wrapping_add(1);
        debug!("Model availability cache invalidated");
    }

    async fn refresh(&self, now: Instant, generation: u64) -> ProxyResult<Arc<HashSet<String>>> {
        let fetched = Arc::new(self.backend.list_local_models().await?);

        let mut entry = self.entry.write().await;
        entry.models = fetched.clone();
        if entry.generation == generation {
            entry.refreshed_at = Some(now);
        } else {
            // 取得中に無効化された（pull完了など）。次回も取り直す
            debug!("Model availability cache invalidated during refresh");
        }
        debug!(model_count = fetched.len(), "Model availability cache refreshed");

        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::ProxyError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    struct FakeBackend {
        models: Mutex<HashSet<String>>,
        list_calls: AtomicUsize,
        fail: AtomicBool,
        /// 立っている間、一覧取得は `gate` の通知まで応答を返さない
        gated: AtomicBool,
        gate: Notify,
    }

    impl FakeBackend {
        fn new(models: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                models: Mutex::new(models.iter().map(|m| m.to_string()).collect()),
                list_calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                gated: AtomicBool::new(false),
                gate: Notify::new(),
            })
        }

        fn calls(&self) -> usize {
            self.list_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelBackend for FakeBackend {
        async fn list_local_models(&self) -> ProxyResult<HashSet<String>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(ProxyError::UpstreamUnreachable("down".to_string()));
            }
            let snapshot = self.models.lock().unwrap().clone();
            if self.gated.load(Ordering::SeqCst) {
                self.gate.notified().await;
            }
            Ok(snapshot)
        }

        async fn pull_model(&self, _model: &str) -> ProxyResult<()> {
            unreachable!("cache never pulls")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_lookup_fetches() {
        let backend = FakeBackend::new(&["qwen3:8b"]);
        let cache = ModelAvailabilityCache::new(backend.clone(), Duration::from_secs(10));

        assert!(cache.contains("qwen3:8b").await.unwrap());
        assert!(!cache.contains("llama3:8b").await.unwrap());
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_within_ttl_does_not_refetch() {
        let backend = FakeBackend::new(&["qwen3:8b"]);
        let cache = ModelAvailabilityCache::new(backend.clone(), Duration::from_secs(10));

        cache.contains("qwen3:8b").await.unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;
        cache.contains("qwen3:8b").await.unwrap();
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_after_ttl_refetches() {
        let backend = FakeBackend::new(&["qwen3:8b"]);
        let cache = ModelAvailabilityCache::new(backend.clone(), Duration::from_secs(10));

        assert!(!cache.contains("llama3:8b").await.unwrap());
        backend
            .models
            .lock()
            .unwrap()
            .insert("llama3:8b".to_string());

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(cache.contains("llama3:8b").await.unwrap());
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_forces_refresh_regardless_of_ttl() {
        let backend = FakeBackend::new(&[]);
        let cache = ModelAvailabilityCache::new(backend.clone(), Duration::from_secs(3600));

        assert!(!cache.contains("qwen3:8b").await.unwrap());
        backend.models.lock().unwrap().insert("qwen3:8b".to_string());
        cache.invalidate().await;

        assert!(cache.contains("qwen3:8b").await.unwrap());
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_stale_data_and_retries() {
        let backend = FakeBackend::new(&["qwen3:8b"]);
        let cache = ModelAvailabilityCache::new(backend.clone(), Duration::from_secs(10));
        cache.contains("qwen3:8b").await.unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;
        backend.fail.store(true, Ordering::SeqCst);
        assert!(cache.contains("qwen3:8b").await.is_err());

        // タイムスタンプは進んでいないので次回も取得を試みる
        backend.fail.store(false, Ordering::SeqCst);
        assert!(cache.contains("qwen3:8b").await.unwrap());
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_during_refresh_is_not_overwritten() {
        let backend = FakeBackend::new(&[]);
        backend.gated.store(true, Ordering::SeqCst);
        let cache = Arc::new(ModelAvailabilityCache::new(
            backend.clone(),
            Duration::from_secs(3600),
        ));

        let lookup = tokio::spawn({
            let cache = cache.clone();
            async move { cache.contains("qwen3:8b").await }
        });
        while backend.calls() == 0 {
            tokio::task::yield_now().await;
        }

        // 一覧取得の途中でpullが完了し、キャッシュが無効化される
        backend.models.lock().unwrap().insert("qwen3:8b".to_string());
        cache.invalidate().await;
        backend.gated.store(false, Ordering::SeqCst);
        backend.gate.notify_one();

        assert!(!lookup.await.unwrap().unwrap());

        // 古い一覧でタイムスタンプが進んでいないので、TTL内でも取り直す
        assert!(cache.contains("qwen3:8b").await.unwrap());
        assert_eq!(backend.calls(), 2);
    }
}
