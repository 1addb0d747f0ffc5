//! 人間向けログ（LogRecord → stderr へ要点のみ出力）
//!
//! fields の全量は出さず要点のみ（巨大化防止）。

use crate::error::Error;
use crate::ports::outbound::{Log, LogLevel, LogRecord};

const FIELDS_SUMMARY_MAX: usize = 200;

/// fields を短い文字列にする
fn fields_summary(record: &LogRecord) -> String {
    let Some(fields) = record.fields.as_ref().filter(|f| !f.is_empty()) else {
        return String::new();
    };
    let s = fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(" ");
    if s.len() <= FIELDS_SUMMARY_MAX {
        return s;
    }
    let truncated = s.chars().take(FIELDS_SUMMARY_MAX).collect::<String>();
    format!("{}... (len={})", truncated, s.len())
}

fn format_line(record: &LogRecord) -> String {
    let level = match record.level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
    };
    let layer = record.layer.as_deref().unwrap_or("-");
    let summary = fields_summary(record);
    if summary.is_empty() {
        format!("[{}] {}: {}", layer, level, record.message)
    } else {
        format!("[{}] {}: {} ({})", layer, level, record.message, summary)
    }
}

/// 人間向けログ（stderr）。`verbose` でないときは debug を捨てる。
#[derive(Debug, Clone, Default)]
pub struct StderrLog {
    verbose: bool,
}

impl StderrLog {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Log for StderrLog {
    fn log(&self, record: &LogRecord) -> Result<(), Error> {
        if record.level == LogLevel::Debug && !self.verbose {
            return Ok(());
        }
        eprintln!("{}", format_line(record));
        Ok(())
    }
}
