//! Outbound ポート: 入力の close・構造化ログ・環境変数

pub mod close;
pub mod env_resolver;
pub mod log;

pub use close::Close;
pub use env_resolver::EnvResolver;
pub use log::{now_iso8601, Log, LogLevel, LogRecord};
