//! serve サブコマンド
//!
//! プロキシサーバーを起動します。

use clap::Args;

/// serve サブコマンドの引数
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Listen port
    #[arg(short, long, default_value = "8000", env = "OLLAMA_PROXY_PORT")]
    pub port: u16,

    /// Bind address
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "OLLAMA_PROXY_HOST")]
    pub host: String,
}

impl ServeArgs {
    /// バインドアドレス（`host:port`）
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
