//! ワイヤ上のレコード形とドメインイベントへの写像
//!
//! フィールド名はサーバーとの契約の一部。relay ではこの形のまま再エンコードする。

use super::duration;
use crate::domain::{AuditEvent, ErrorEvent, Identity};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::net::IpAddr;
use std::time::Duration;

/// 1 レコード分のワイヤ形。`EventStream` はこの trait でイベント種別ごとの差異を吸収する。
pub trait Record: Serialize + DeserializeOwned {
    /// 写像先のドメインイベント（`Default` はゼロ値）
    type Event: Default + Clone;

    fn into_event(self) -> Self::Event;
}

/// エラーログの 1 レコード: `{"message": string}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    #[serde(default, deserialize_with = "null_default")]
    pub message: String,
}

impl Record for ErrorRecord {
    type Event = ErrorEvent;

    fn into_event(self) -> ErrorEvent {
        ErrorEvent {
            message: self.message,
        }
    }
}

/// 監査ログの 1 レコード
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// RFC3339
    #[serde(default, deserialize_with = "null_default")]
    pub time: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_default")]
    pub request: AuditRequest,
    #[serde(default, deserialize_with = "null_default")]
    pub response: AuditResponse,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRequest {
    #[serde(default, with = "ip_text")]
    pub ip: Option<IpAddr>,
    #[serde(default, deserialize_with = "null_default")]
    pub path: String,
    #[serde(default, deserialize_with = "null_default")]
    pub identity: Identity,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditResponse {
    #[serde(default, deserialize_with = "null_default")]
    pub code: u16,
    #[serde(default, with = "duration")]
    pub time: Duration,
}

impl Record for AuditRecord {
    type Event = AuditEvent;

    fn into_event(self) -> AuditEvent {
        AuditEvent {
            timestamp: self.time,
            api_path: self.request.path,
            client_ip: self.request.ip,
            client_identity: self.request.identity,
            status_code: self.response.code,
            response_time: self.response.time,
        }
    }
}

/// 欠けたフィールドと同じく、`null` もゼロ値として読む
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// IP アドレスのテキスト表現。空文字と `null` は None。
mod ip_text {
    use super::*;

    pub fn serialize<S: Serializer>(ip: &Option<IpAddr>, serializer: S) -> Result<S::Ok, S::Error> {
        match ip {
            Some(ip) => serializer.collect_str(ip),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<IpAddr>, D::Error> {
        let s = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        if s.is_empty() {
            return Ok(None);
        }
        s.parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid IP address {:?}", s)))
    }
}
