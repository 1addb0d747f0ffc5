//! サーバーのログ API を開くクライアント
//!
//! `GET /v1/log/error` と `GET /v1/log/audit` のレスポンスボディをそのままストリームにする。
//! リトライ・再接続はしない（呼び出し側の責務）。

use crate::adapter::HttpBody;
use crate::config::ClientConfig;
use crate::domain::Endpoint;
use crate::error::Error;
use crate::ports::outbound::{Log, LogLevel, LogRecord};
use crate::stream::{AuditStream, ErrorStream};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const ERROR_LOG_PATH: &str = "/v1/log/error";
pub const AUDIT_LOG_PATH: &str = "/v1/log/audit";

/// ログ API クライアント
pub struct LogClient {
    endpoint: Endpoint,
    http: reqwest::blocking::Client,
    log: Arc<dyn Log>,
}

impl LogClient {
    pub fn new(config: &ClientConfig, log: Arc<dyn Log>) -> Result<Self, Error> {
        let endpoint = config.endpoint()?.clone();
        let http = reqwest::blocking::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| Error::http(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { endpoint, http, log })
    }

    /// エラーログのストリームを開く
    pub fn error_log(&self) -> Result<ErrorStream<HttpBody>, Error> {
        let body = self.open(ERROR_LOG_PATH)?;
        Ok(ErrorStream::closable(body).with_log(Arc::clone(&self.log)))
    }

    /// 監査ログのストリームを開く
    pub fn audit_log(&self) -> Result<AuditStream<HttpBody>, Error> {
        let body = self.open(AUDIT_LOG_PATH)?;
        Ok(AuditStream::closable(body).with_log(Arc::clone(&self.log)))
    }

    /// `path` を GET し、成功したレスポンスのボディを返す
    pub fn open(&self, path: &str) -> Result<HttpBody, Error> {
        let url = self.endpoint.join(path);
        let _ = self.log.log(
            &LogRecord::new(LogLevel::Debug, "opening stream")
                .layer("client")
                .kind("lifecycle")
                .field("url", url.as_str()),
        );

        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|e| Error::http(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            let err = Error::http(error_message(status, &text));
            let _ = self.log.log(
                &LogRecord::new(LogLevel::Error, err.to_string())
                    .layer("client")
                    .kind("error")
                    .field("status", status.as_u16()),
            );
            return Err(err);
        }
        Ok(HttpBody::new(response))
    }
}

/// エラーレスポンスのメッセージ。サーバーは `{"message": "..."}` を返す。
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["message"].as_str().map(|s| s.to_string()))
        .map(|m| format!("{}: {}", status, m))
        .unwrap_or_else(|| format!("{}: {}", status, body.trim()))
}
