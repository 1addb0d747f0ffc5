//! HTTP レスポンスボディを close 可能な入力として扱う
//!
//! reqwest のブロッキング Response は drop で接続を解放する。close 後の読み取りは 0 バイト（終端）。

use crate::ports::outbound::Close;
use std::io::{self, Read};

/// ストリーミング中の HTTP レスポンスボディ
pub struct HttpBody<B = reqwest::blocking::Response> {
    inner: Option<B>,
}

impl<B: Read> HttpBody<B> {
    pub fn new(inner: B) -> Self {
        Self { inner: Some(inner) }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }
}

impl<B: Read> Read for HttpBody<B> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.as_mut() {
            Some(body) => body.read(buf),
            None => Ok(0),
        }
    }
}

impl<B: Read> Close for HttpBody<B> {
    fn close(&mut self) -> io::Result<()> {
        drop(self.inner.take());
        Ok(())
    }
}
