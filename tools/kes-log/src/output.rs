//! イベントの 1 行表示

use kes::stream::duration;
use kes::{AuditEvent, ErrorEvent};

pub fn error_line(ev: &ErrorEvent) -> String {
    ev.message.clone()
}

/// `時刻 IP identity ステータス パス 処理時間`
pub fn audit_line(ev: &AuditEvent) -> String {
    let ip = ev
        .client_ip
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "-".to_string());
    let identity: &str = if ev.client_identity.is_unknown() {
        "<unknown>"
    } else {
        &ev.client_identity
    };
    format!(
        "{} {} {} {} {} {}",
        ev.timestamp.format("%Y-%m-%dT%H:%M:%SZ"),
        ip,
        identity,
        ev.status_code,
        ev.api_path,
        duration::format(ev.response_time)
    )
}
