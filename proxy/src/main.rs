//! Ollama Autopull Proxy Entry Point

use clap::Parser;
use ollama_autopull_proxy::cli::{serve::ServeArgs, Cli, Commands};
use ollama_autopull_proxy::config::{get_env_with_fallback_or, get_env_with_fallback_parse, ProxyConfig};
use ollama_autopull_proxy::{logging, server, AppState};
use tracing::info;

fn serve_args_from_env() -> ServeArgs {
    ServeArgs {
        host: get_env_with_fallback_or("OLLAMA_PROXY_HOST", "OLLAMA_PROXY_HOST", "0.0.0.0"),
        port: get_env_with_fallback_parse("OLLAMA_PROXY_PORT", "OLLAMA_PROXY_PORT", 8000),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let args = match cli.command {
        Some(Commands::Serve(args)) => args,
        // No subcommand - default to serve
        None => serve_args_from_env(),
    };

    logging::init()?;

    let config = ProxyConfig::from_env();
    info!(
        upstream = %config.upstream_base,
        default_model = %config.default_model,
        auto_pull = config.auto_pull,
        cache_ttl_secs = config.models_cache_ttl.as_secs(),
        "Ollama Autopull Proxy v{}",
        env!("CARGO_PKG_VERSION")
    );

    let state = AppState::new(config);
    server::run(state, &args.bind_addr()).await
}
