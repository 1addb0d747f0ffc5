//! 環境変数解決 Outbound ポート
//!
//! 設定の解決（`config::ClientConfig`）はこの trait 経由でのみ環境変数にアクセスする。

/// 環境変数解決抽象（Outbound ポート）
///
/// 実装は `kes::adapter::StdEnvResolver` やテスト用のマップなど。
pub trait EnvResolver: Send + Sync {
    /// 環境変数を読む。未設定・空文字は None。
    fn var(&self, name: &str) -> Option<String>;
}
