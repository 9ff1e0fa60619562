//! Configuration management via environment variables
//!
//! Provides helper functions for reading environment variables with fallback
//! to legacy (unprefixed) variable names with warning logs, and the
//! process-wide [`ProxyConfig`] built from them once at startup.

use std::time::Duration;

/// デフォルトの上流（Ollama）ベースURL
pub const DEFAULT_UPSTREAM_BASE: &str = "http://ollama:11434";

/// デフォルトモデル
pub const DEFAULT_MODEL: &str = "qwen3:8b";

/// モデル一覧キャッシュのデフォルトTTL（秒）
pub const DEFAULT_MODELS_CACHE_TTL_SECS: u64 = 10;

/// Get an environment variable with fallback to a legacy name
///
/// If the new variable name is set, returns its value.
/// If only the old (legacy) variable name is set, returns its value
/// and logs a deprecation warning.
///
/// # Arguments
/// * `new_name` - The new environment variable name (preferred)
/// * `old_name` - The legacy environment variable name (fallback)
///
/// # Returns
/// * `Some(value)` - The environment variable value
/// * `None` - Neither variable is set
///
/// # Example
/// ```
/// use ollama_autopull_proxy::config::get_env_with_fallback;
///
/// let base = get_env_with_fallback("OLLAMA_PROXY_UPSTREAM_BASE", "UPSTREAM_BASE");
/// ```
pub fn get_env_with_fallback(new_name: &str, old_name: &str) -> Option<String> {
    if let Ok(val) = std::env::var(new_name) {
        return Some(val);
    }
    if let Ok(val) = std::env::var(old_name) {
        tracing::warn!(
            "Environment variable '{}' is deprecated, use '{}' instead",
            old_name,
            new_name
        );
        return Some(val);
    }
    None
}

/// Get an environment variable with fallback and default value
///
/// Similar to `get_env_with_fallback`, but returns a default value
/// if neither variable is set.
pub fn get_env_with_fallback_or(new_name: &str, old_name: &str, default: &str) -> String {
    get_env_with_fallback(new_name, old_name).unwrap_or_else(|| default.to_string())
}

/// Get an environment variable with fallback, parsing to a specific type
///
/// Leading/trailing whitespace is ignored. Falls back to `default` if
/// neither variable is set or parsing fails.
pub fn get_env_with_fallback_parse<T: std::str::FromStr>(
    new_name: &str,
    old_name: &str,
    default: T,
) -> T {
    get_env_with_fallback(new_name, old_name)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// 真偽値フラグとして解釈する
///
/// 前後の空白を除去し、大文字小文字を無視して `1/true/yes/on` のときだけ `true`。
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// プロキシ設定（起動時に一度だけ読み込み、以後変更しない）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// 上流ベースURL（末尾スラッシュなし）
    pub upstream_base: String,
    /// `?model=` 未指定時に使うモデル
    pub default_model: String,
    /// 不足モデルを転送前にpullするか
    pub auto_pull: bool,
    /// ローカルモデル一覧キャッシュのTTL
    pub models_cache_ttl: Duration,
}

impl ProxyConfig {
    /// Load proxy configuration from environment variables.
    pub fn from_env() -> Self {
        let upstream_base = get_env_with_fallback_or(
            "OLLAMA_PROXY_UPSTREAM_BASE",
            "UPSTREAM_BASE",
            DEFAULT_UPSTREAM_BASE,
        );
        let default_model =
            get_env_with_fallback_or("OLLAMA_PROXY_DEFAULT_MODEL", "DEFAULT_MODEL", DEFAULT_MODEL);
        let auto_pull = get_env_with_fallback("OLLAMA_PROXY_AUTO_PULL", "AUTO_PULL")
            .map(|value| parse_flag(&value))
            .unwrap_or(false);
        let ttl_secs = get_env_with_fallback_parse(
            "OLLAMA_PROXY_MODELS_CACHE_TTL_SEC",
            "MODELS_CACHE_TTL_SEC",
            DEFAULT_MODELS_CACHE_TTL_SECS,
        );

        Self {
            upstream_base: upstream_base.trim_end_matches('/').to_string(),
            default_model,
            auto_pull,
            models_cache_ttl: Duration::from_secs(ttl_secs),
        }
    }
}

/// ログレベルを取得
///
/// 環境変数 `OLLAMA_PROXY_LOG_LEVEL`（旧: `LOG_LEVEL`）から取得し、未設定なら `info`。
pub fn get_log_level() -> String {
    get_env_with_fallback_or("OLLAMA_PROXY_LOG_LEVEL", "LOG_LEVEL", "info")
}
