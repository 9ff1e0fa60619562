//! モデル管理
//!
//! バックエンドのローカルモデル一覧キャッシュと、転送前の自動pull。

mod cache;
mod provisioner;

pub use cache::ModelAvailabilityCache;
pub use provisioner::{ModelProvisioner, ModelState};
