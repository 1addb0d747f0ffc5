//! クライアント設定
//!
//! 環境変数（`EnvResolver` 経由）から解決し、CLI 引数で上書きする。

use crate::domain::Endpoint;
use crate::error::Error;
use crate::ports::outbound::EnvResolver;
use crate::stream::duration;
use std::path::PathBuf;
use std::time::Duration;

/// サーバーのエンドポイント（例: https://127.0.0.1:7373）
pub const ENV_SERVER: &str = "KES_SERVER";
/// 接続タイムアウト（秒数、または `10s` などの duration）
pub const ENV_CONNECT_TIMEOUT: &str = "KES_CONNECT_TIMEOUT";
/// 構造化ログ（JSONL）の出力先
pub const ENV_LOG_FILE: &str = "KES_LOG_FILE";

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub endpoint: Option<Endpoint>,
    /// 接続確立までのタイムアウト。ストリームは長時間続くため、読み取り全体のタイムアウトは持たない。
    pub connect_timeout: Duration,
    pub log_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            log_file: None,
        }
    }
}

impl ClientConfig {
    /// 環境変数から設定を解決する
    pub fn from_env(env: &dyn EnvResolver) -> Result<Self, Error> {
        let connect_timeout = match env.var(ENV_CONNECT_TIMEOUT) {
            Some(v) => parse_timeout(&v).ok_or_else(|| {
                Error::env(format!("{} is not a valid timeout: {:?}", ENV_CONNECT_TIMEOUT, v))
            })?,
            None => DEFAULT_CONNECT_TIMEOUT,
        };
        Ok(Self {
            endpoint: env.var(ENV_SERVER).map(Endpoint::new),
            connect_timeout,
            log_file: env.var(ENV_LOG_FILE).map(PathBuf::from),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(Endpoint::new(endpoint));
        self
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// 接続先。未設定ならエラー。
    pub fn endpoint(&self) -> Result<&Endpoint, Error> {
        self.endpoint
            .as_ref()
            .ok_or_else(|| Error::env(format!("no server endpoint: set {} or pass --server", ENV_SERVER)))
    }
}

fn parse_timeout(s: &str) -> Option<Duration> {
    match s.parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(_) => duration::parse(s).ok(),
    }
}
