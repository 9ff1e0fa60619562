//! CLI module for ollama-autopull-proxy
//!
//! Provides command-line interface for the proxy server.

pub mod serve;

use clap::{Parser, Subcommand};

/// Ollama autopull proxy - OpenAI-compatible reverse proxy with on-demand model pulls
#[derive(Parser, Debug)]
#[command(name = "ollama-autopull-proxy")]
#[command(version, about, long_about = None)]
#[command(after_help = r#"ENVIRONMENT VARIABLES:
    OLLAMA_PROXY_HOST                  Bind address (default: 0.0.0.0)
    OLLAMA_PROXY_PORT                  Listen port (default: 8000)
    OLLAMA_PROXY_LOG_LEVEL             Log level (default: info, RUST_LOG wins)
    OLLAMA_PROXY_UPSTREAM_BASE         Backend base URL (default: http://ollama:11434)
    OLLAMA_PROXY_DEFAULT_MODEL         Model used without ?model= (default: qwen3:8b)
    OLLAMA_PROXY_AUTO_PULL             Pull missing models before forwarding (1/true/yes/on)
    OLLAMA_PROXY_MODELS_CACHE_TTL_SEC  Local model list cache TTL (default: 10)

    Unprefixed names (UPSTREAM_BASE, DEFAULT_MODEL, AUTO_PULL,
    MODELS_CACHE_TTL_SEC, LOG_LEVEL) are accepted as deprecated fallbacks.
"#)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the proxy server
    Serve(serve::ServeArgs),
}
