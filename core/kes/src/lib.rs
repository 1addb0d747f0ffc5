//! KES サーバーのログストリーム
//!
//! エラーログ・監査ログの JSON レコード列を 1 件ずつドメインイベントとして読む `EventStream` と、
//! それを開くための HTTP クライアント・構造化ログ・設定を提供します。

/// エラーハンドリング
pub mod error;

/// ドメイン型とイベント
pub mod domain;

/// イベントストリーム・レコード codec・relay
pub mod stream;

/// Outbound ポート
pub mod ports;

/// ポートの標準実装
pub mod adapter;

/// クライアント設定
pub mod config;

/// ログ API クライアント
pub mod client;

pub use client::LogClient;
pub use domain::{AuditEvent, ErrorEvent, Identity};
pub use error::Error;
pub use stream::{AuditStream, ErrorStream, EventStream, StreamState};
