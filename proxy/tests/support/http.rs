use std::{io, net::SocketAddr, time::Duration};

use axum::Router;
use ollama_autopull_proxy::{api, config::ProxyConfig, AppState};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

/// 汎用的にテスト用のHTTPサーバーを起動するためのユーティリティ
#[allow(dead_code)]
pub struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), io::Error>>,
}

#[allow(dead_code)]
impl TestServer {
    /// サーバーがバインドしているアドレスを返す
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `http://addr` 形式のベースURL
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// サーバーを停止し、バックグラウンドタスクの終了を待つ
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.handle.await;
    }
}

/// 任意のルーターを実ポートにバインドして起動する
pub async fn spawn_router(router: Router) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = rx.await;
            })
            .await
    });

    TestServer {
        addr,
        shutdown: Some(tx),
        handle,
    }
}

/// テスト用のプロキシ設定
pub fn test_config(upstream_base: &str, auto_pull: bool) -> ProxyConfig {
    ProxyConfig {
        upstream_base: upstream_base.trim_end_matches('/').to_string(),
        default_model: "qwen3:8b".to_string(),
        auto_pull,
        models_cache_ttl: Duration::from_secs(60),
    }
}

/// 指定した上流に向けたプロキシを起動する
pub async fn spawn_proxy(config: ProxyConfig) -> TestServer {
    spawn_router(api::create_app(AppState::new(config))).await
}
