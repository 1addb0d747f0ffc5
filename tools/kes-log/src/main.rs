//! kes-log: サーバーのエラーログ・監査ログを読む CLI
//!
//! 入力はファイル・HTTP（--server / KES_SERVER）・stdin のいずれか。
//! 既定では 1 イベント 1 行で表示し、--json ではレコードをそのまま JSONL で中継する。

mod input;
mod output;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use input::Input;
use kes::adapter::{FileJsonLog, StderrLog, StdEnvResolver};
use kes::client::{AUDIT_LOG_PATH, ERROR_LOG_PATH};
use kes::config::ClientConfig;
use kes::ports::outbound::{Log, LogLevel, LogRecord};
use kes::stream::{AuditStream, ErrorStream, EventStream, Record};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogKind {
    Error,
    Audit,
}

impl LogKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Audit => "audit",
        }
    }

    fn api_path(self) -> &'static str {
        match self {
            Self::Error => ERROR_LOG_PATH,
            Self::Audit => AUDIT_LOG_PATH,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "kes-log", about = "Print or relay a KES error/audit log stream")]
struct Cli {
    /// Which log to read
    #[arg(value_enum)]
    kind: LogKind,

    /// Server endpoint (overrides KES_SERVER)
    #[arg(short, long, value_name = "url", conflicts_with = "file")]
    server: Option<String>,

    /// Read records from a local JSONL file instead of the server
    #[arg(short, long, value_name = "path")]
    file: Option<PathBuf>,

    /// Relay records as JSON lines instead of printing events
    #[arg(long)]
    json: bool,

    /// Append structured logs to this file (overrides KES_LOG_FILE)
    #[arg(long, value_name = "path")]
    log_file: Option<PathBuf>,

    /// Emit debug logs to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("kes-log: {:#}", e);
            exit_code(&e)
        }
    };
    process::exit(code);
}

/// ライブラリのエラーが含まれていればその終了コード、なければ 1
fn exit_code(e: &anyhow::Error) -> i32 {
    e.downcast_ref::<kes::Error>()
        .map(kes::Error::exit_code)
        .unwrap_or(1)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = ClientConfig::from_env(&StdEnvResolver)?;
    if let Some(server) = &cli.server {
        config = config.with_endpoint(server.as_str());
    }
    if let Some(path) = &cli.log_file {
        config = config.with_log_file(path.clone());
    }
    let log: Arc<dyn Log> = match &config.log_file {
        Some(path) => Arc::new(FileJsonLog::new(path)),
        None => Arc::new(StderrLog::new(cli.verbose)),
    };

    let _ = log.log(
        &LogRecord::new(LogLevel::Debug, "command started")
            .layer("cli")
            .kind("lifecycle")
            .field("log", cli.kind.as_str())
            .field("json", cli.json),
    );

    let input = Input::open(cli.file.as_deref(), cli.kind.api_path(), &config, &log)?;
    let result = match cli.kind {
        LogKind::Error => consume(
            ErrorStream::closable(input).with_log(Arc::clone(&log)),
            cli.json,
            output::error_line,
        ),
        LogKind::Audit => consume(
            AuditStream::closable(input).with_log(Arc::clone(&log)),
            cli.json,
            output::audit_line,
        ),
    };

    let _ = log.log(
        &LogRecord::new(LogLevel::Debug, "command finished")
            .layer("cli")
            .kind("lifecycle")
            .field("log", cli.kind.as_str())
            .field("ok", result.is_ok()),
    );
    result
}

/// ストリームを最後まで読み、stdout へ表示または中継する
fn consume<T: Record>(
    mut stream: EventStream<Input, T>,
    json: bool,
    line: fn(&T::Event) -> String,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if json {
        let (written, result) = stream.write_to(&mut out);
        out.flush().context("flush stdout")?;
        eprintln!(
            "kes-log: relayed {} records ({} bytes)",
            stream.records(),
            written
        );
        return result.context("relay failed");
    }

    while stream.advance() {
        writeln!(out, "{}", line(stream.event())).context("write stdout")?;
    }
    out.flush().context("flush stdout")?;
    match stream.err() {
        Some(e) => Err(anyhow::Error::new(e.clone()).context("reading stream failed")),
        None => Ok(()),
    }
}
