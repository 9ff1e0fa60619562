//! モデル名の正規化とリクエストごとのモデル選択

/// モデル選択に使うクエリパラメータ名
pub const MODEL_QUERY_KEY: &str = "model";

/// 壊れたモデル指定を正規化する
///
/// 一部のクライアントはモデル値にリクエストパスを連結してしまう。
/// 前後の空白を除去し、最初の `/` より前だけを残す。
///
/// - `deepseek-r1:latest/chat/completions` → `deepseek-r1:latest`
/// - `deepseek-r1:latest%2Fchat%2Fcompletions` も、クエリのデコード後に同じ結果になる
pub fn normalize_model(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.split_once('/') {
        Some((head, _)) => head.trim().to_string(),
        None => trimmed.to_string(),
    }
}

/// リクエストに適用するモデルの選択結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    /// 使用するモデル
    pub model: String,
    /// `?model=` が明示されていたか（ボディのmodelを無条件に上書きする）
    pub forced: bool,
}

/// クエリとデフォルトモデルから使用モデルを決める
///
/// `model` が複数指定された場合は最後の値を使う。正規化後に空なら
/// デフォルトモデルを使うが、キーが存在した以上 `forced` は立つ。
pub fn select_model(query: &[(String, String)], default_model: &str) -> ModelSelection {
    let requested = query
        .iter()
        .rev()
        .find(|(key, _)| key == MODEL_QUERY_KEY)
        .map(|(_, value)| value.as_str());

    let model = requested
        .map(normalize_model)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| default_model.to_string());

    ModelSelection {
        model,
        forced: requested.is_some(),
    }
}
