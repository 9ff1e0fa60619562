//! REST APIハンドラー
//!
//! 死活確認、モデル一覧、`/v1/*` 汎用プロキシ

pub mod model_name;
pub mod openai;
pub mod proxy;
pub mod relay;
pub mod rewrite;

use axum::{
    routing::{get, on, MethodFilter},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::AppState;

/// 汎用プロキシが受け付けるメソッド
const PROXIED_METHODS: MethodFilter = MethodFilter::GET
    .or(MethodFilter::POST)
    .or(MethodFilter::PUT)
    .or(MethodFilter::PATCH)
    .or(MethodFilter::DELETE)
    .or(MethodFilter::OPTIONS);

/// GET以外の転送メソッド（GETを専用ハンドラーに割り当てたパス用）
const PROXIED_NON_GET_METHODS: MethodFilter = MethodFilter::POST
    .or(MethodFilter::PUT)
    .or(MethodFilter::PATCH)
    .or(MethodFilter::DELETE)
    .or(MethodFilter::OPTIONS);

/// アプリケーションルーターを作成
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1/chat/completions",
            get(openai::chat_completions_probe).on(PROXIED_NON_GET_METHODS, proxy::proxy_v1),
        )
        .route(
            "/v1/models",
            get(openai::list_models).on(PROXIED_NON_GET_METHODS, proxy::proxy_v1),
        )
        // ワイルドカードは空セグメントに一致しないため `/v1/` は個別に登録する
        .route("/v1/", on(PROXIED_METHODS, proxy::proxy_v1))
        .route("/v1/*path", on(PROXIED_METHODS, proxy::proxy_v1))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
