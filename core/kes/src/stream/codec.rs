//! レコード単位のデコーダ／エンコーダ
//!
//! デコーダは入力全体をバッファせず、呼び出しごとにちょうど 1 レコードを読む。
//! レコード間の空白（改行を含む）は読み飛ばす。

use crate::error::Error;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{self, BufRead, BufReader, Read, Write};

/// 入力から 1 レコードずつ読むデコーダ
pub struct RecordDecoder<R> {
    reader: BufReader<R>,
}

impl<R: Read> RecordDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// 次のレコードを読む。入力の終端なら `Ok(None)`。
    pub fn decode<T: DeserializeOwned>(&mut self) -> Result<Option<T>, Error> {
        if !self.skip_whitespace()? {
            return Ok(None);
        }
        let mut de = serde_json::Deserializer::from_reader(&mut self.reader);
        T::deserialize(&mut de).map(Some).map_err(Error::from_decode)
    }

    /// 下層の入力（close 用）
    pub fn get_mut(&mut self) -> &mut R {
        self.reader.get_mut()
    }

    /// 空白を読み飛ばす。次のバイトがあれば true、終端なら false。
    fn skip_whitespace(&mut self) -> Result<bool, Error> {
        loop {
            let buf = match self.reader.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if buf.is_empty() {
                return Ok(false);
            }
            let n = buf
                .iter()
                .take_while(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
                .count();
            let more = n < buf.len();
            self.reader.consume(n);
            if more {
                return Ok(true);
            }
        }
    }
}

/// 1 レコードを 1 行の JSON として書き出すエンコーダ
pub struct RecordEncoder<W> {
    writer: W,
    buf: Vec<u8>,
}

impl<W: Write> RecordEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buf: Vec::new(),
        }
    }

    /// レコードを直列化し、改行付きでまとめて書き込む
    pub fn encode<T: Serialize>(&mut self, record: &T) -> Result<(), Error> {
        self.buf.clear();
        serde_json::to_writer(&mut self.buf, record).map_err(Error::from_encode)?;
        self.buf.push(b'\n');
        self.writer.write_all(&self.buf).map_err(Error::from_encode)
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
