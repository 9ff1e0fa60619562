//! 結合テスト用ユーティリティ

pub mod http;
