//! エラーハンドリング
//!
//! ストリームは最初のエラーを保持し続ける（sticky）ため、エラー型は `Clone` にしてある。
//! 元のエラー値ではなくメッセージを保持する。

use std::io;

/// ライブラリ共通のエラー型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// レコードが期待する形に沿っていない（JSON 構文・IP・duration・タイムスタンプ）
    #[error("decode error: {0}")]
    Decode(String),
    /// 入力の読み取り・close の失敗
    #[error("I/O error: {0}")]
    Io(String),
    /// relay 先への書き込み失敗
    #[error("encode error: {0}")]
    Encode(String),
    /// HTTP 層のエラー（ステータス不正・接続失敗）
    #[error("HTTP error: {0}")]
    Http(String),
    /// 環境変数・設定の解決失敗
    #[error("environment error: {0}")]
    Env(String),
}

impl Error {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    pub fn env(msg: impl Into<String>) -> Self {
        Self::Env(msg.into())
    }

    /// 読み取り側の serde_json エラーを分類する。
    /// 下層の I/O 失敗は `Io`、それ以外（途中での EOF を含む）は `Decode`。
    pub fn from_decode(e: serde_json::Error) -> Self {
        if e.is_io() {
            Self::Io(e.to_string())
        } else {
            Self::Decode(e.to_string())
        }
    }

    /// 書き込み側の失敗はすべて `Encode`
    pub fn from_encode(e: impl std::fmt::Display) -> Self {
        Self::Encode(e.to_string())
    }

    /// CLI の終了コード（sysexits.h 準拠）
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Decode(_) => 65,
            Self::Http(_) => 69,
            Self::Io(_) | Self::Encode(_) => 74,
            Self::Env(_) => 78,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
