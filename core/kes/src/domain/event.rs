//! ストリームから得られるドメインイベント
//!
//! ワイヤ上のレコード（`stream::record`）を写像した結果。どちらも `Default` がゼロ値。

use super::Identity;
use chrono::{DateTime, Utc};
use std::net::IpAddr;
use std::time::Duration;

/// サーバーがエラーをログに出したときのイベント
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorEvent {
    /// ログに出たエラーメッセージ
    pub message: String,
}

/// サーバーがリクエストに応答したときの監査イベント
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditEvent {
    /// サーバーがリクエストを受け取った時刻
    pub timestamp: DateTime<Utc>,
    /// 呼び出された API（引数を含むことがある）
    pub api_path: String,
    /// クライアントの IP アドレス（ワイヤ上で空文字なら None）
    pub client_ip: Option<IpAddr>,
    pub client_identity: Identity,
    /// クライアントに返したステータスコード
    pub status_code: u16,
    /// リクエスト処理にかかった時間
    pub response_time: Duration,
}
