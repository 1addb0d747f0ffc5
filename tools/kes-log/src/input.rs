//! 入力の選択（ファイル / HTTP / stdin）
//!
//! どの入力も `Close` を持つ 1 つの型にまとめる。close で実際に解放するのは HTTP だけ。

use anyhow::Context;
use kes::adapter::HttpBody;
use kes::config::ClientConfig;
use kes::ports::outbound::{Close, Log};
use kes::LogClient;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

pub enum Input {
    Stdin(io::Stdin),
    File(File),
    Http(HttpBody),
}

impl Input {
    /// `file` があればファイル、なければ設定に接続先があれば HTTP、どちらも無ければ stdin
    pub fn open(
        file: Option<&Path>,
        api_path: &str,
        config: &ClientConfig,
        log: &Arc<dyn Log>,
    ) -> anyhow::Result<Self> {
        if let Some(path) = file {
            let f = File::open(path).with_context(|| format!("open {:?}", path))?;
            return Ok(Self::File(f));
        }
        if config.endpoint.is_some() {
            let client = LogClient::new(config, Arc::clone(log))?;
            let body = client.open(api_path)?;
            return Ok(Self::Http(body));
        }
        Ok(Self::Stdin(io::stdin()))
    }
}

impl Read for Input {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Stdin(r) => r.read(buf),
            Self::File(r) => r.read(buf),
            Self::Http(r) => r.read(buf),
        }
    }
}

impl Close for Input {
    fn close(&mut self) -> io::Result<()> {
        match self {
            Self::Http(body) => body.close(),
            Self::Stdin(_) | Self::File(_) => Ok(()),
        }
    }
}
