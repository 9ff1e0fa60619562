//! ロギング初期化
//!
//! `RUST_LOG` が設定されていればそれを優先し、未設定なら
//! `OLLAMA_PROXY_LOG_LEVEL`（旧: `LOG_LEVEL`）のレベルを使う。

use tracing_subscriber::EnvFilter;

use crate::config::get_log_level;

fn build_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = get_log_level();
        EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"))
    })
}

/// グローバルなtracingサブスクライバーを初期化する
///
/// 2回目以降の呼び出しはエラーを返す（パニックしない）。
pub fn init() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter())
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))
}
