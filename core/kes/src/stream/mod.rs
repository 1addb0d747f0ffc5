//! サーバーが流すログ（エラーログ・監査ログ）のイベントストリーム
//!
//! 開いたままのバイト列（HTTP レスポンスボディ等）から 1 レコードずつデコードし、
//! ドメインイベントへ写像して pull 型で返す。イベント種別ごとの差異は `Record` が吸収する。
//!
//! 状態は Open / Closed / Errored のいずれか。終端後の `advance` は I/O を行わず false を返し、
//! 最初のエラーは保持され続ける（sticky）。入力の close は高々 1 回。
//! 呼び出しはすべて `&mut self` で、同時に使えるのは 1 か所だけ。内部でロックは取らない。

pub mod codec;
pub mod counting;
pub mod duration;
pub mod record;

pub use codec::{RecordDecoder, RecordEncoder};
pub use counting::CountingWriter;
pub use record::{AuditRecord, ErrorRecord, Record};

use crate::error::Error;
use crate::ports::outbound::{Close, Log, LogLevel, LogRecord};
use std::io::{self, Read, Write};
use std::sync::Arc;

/// エラーログのストリーム
pub type ErrorStream<R> = EventStream<R, ErrorRecord>;

/// 監査ログのストリーム
pub type AuditStream<R> = EventStream<R, AuditRecord>;

/// ストリームの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Open,
    Closed,
    Errored,
}

/// レコード型 `T` でデコードし、`T::Event` を返すストリーム
pub struct EventStream<R, T: Record> {
    decoder: RecordDecoder<R>,
    /// 入力が close 可能なときだけ Some
    closer: Option<fn(&mut R) -> io::Result<()>>,

    event: T::Event,
    err: Option<Error>,
    closed: bool,
    records: u64,

    log: Option<Arc<dyn Log>>,
}

impl<R: Read, T: Record> EventStream<R, T> {
    /// close 手段を持たない入力から読むストリーム
    pub fn new(reader: R) -> Self {
        Self::with_closer(reader, None)
    }

    /// close 可能な入力から読むストリーム。終端または `close` で入力を閉じる。
    pub fn closable(reader: R) -> Self
    where
        R: Close,
    {
        Self::with_closer(reader, Some(<R as Close>::close as fn(&mut R) -> io::Result<()>))
    }

    fn with_closer(reader: R, closer: Option<fn(&mut R) -> io::Result<()>>) -> Self {
        Self {
            decoder: RecordDecoder::new(reader),
            closer,
            event: T::Event::default(),
            err: None,
            closed: false,
            records: 0,
            log: None,
        }
    }

    /// 終端・失敗を構造化ログに残す
    pub fn with_log(mut self, log: Arc<dyn Log>) -> Self {
        self.log = Some(log);
        self
    }

    /// 直近に `advance` で得たイベント。最初の成功より前はゼロ値。
    pub fn event(&self) -> &T::Event {
        &self.event
    }

    /// 保持しているエラー（なければ None）
    pub fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    pub fn state(&self) -> StreamState {
        if self.err.is_some() {
            StreamState::Errored
        } else if self.closed {
            StreamState::Closed
        } else {
            StreamState::Open
        }
    }

    /// これまでに読んだレコード数
    pub fn records(&self) -> u64 {
        self.records
    }

    /// 次のイベントへ進める。イベントがあれば true。
    ///
    /// 入力の終端では close してその結果を保持し、false を返す。
    /// デコード・読み取りに失敗したときはエラーを保持して false を返す（入力は閉じない）。
    pub fn advance(&mut self) -> bool {
        if self.closed || self.err.is_some() {
            return false;
        }
        match self.decoder.decode::<T>() {
            Ok(Some(rec)) => {
                self.records += 1;
                self.event = rec.into_event();
                true
            }
            Ok(None) => {
                self.err = self.close().err();
                false
            }
            Err(e) => {
                self.fail(e);
                false
            }
        }
    }

    /// ストリーム全体を `w` へ書き出す。書き込んだバイト数と、最初に起きたエラーを返す。
    ///
    /// 各レコードはイベントに写像せず、ワイヤ形のまま 1 行ずつ再エンコードする。
    /// 読み進め方と終了後の状態は `advance` を最後まで繰り返した場合と同じ。
    pub fn write_to<W: Write>(&mut self, w: W) -> (u64, Result<(), Error>) {
        if self.closed || self.err.is_some() {
            return (0, self.result());
        }

        let mut encoder = RecordEncoder::new(CountingWriter::new(w));
        loop {
            let rec = match self.decoder.decode::<T>() {
                Ok(Some(rec)) => rec,
                Ok(None) => {
                    let result = self.close();
                    return (encoder.get_ref().count(), result);
                }
                Err(e) => {
                    self.fail(e.clone());
                    return (encoder.get_ref().count(), Err(e));
                }
            };
            self.records += 1;
            if let Err(e) = encoder.encode(&rec) {
                self.fail(e.clone());
                return (encoder.get_ref().count(), Err(e));
            }
        }
    }

    /// ストリームを閉じて入力を解放する。2 回目以降は何もせず保持中のエラーを返す。
    ///
    /// close の失敗は、それ以前にエラーが無い場合に限り保持する。
    pub fn close(&mut self) -> Result<(), Error> {
        if !self.closed {
            self.closed = true;

            if let Some(close) = self.closer {
                if let Err(e) = close(self.decoder.get_mut()) {
                    if self.err.is_none() {
                        self.err = Some(e.into());
                    }
                }
            }
            self.log_closed();
        }
        self.result()
    }

    fn result(&self) -> Result<(), Error> {
        match &self.err {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn fail(&mut self, e: Error) {
        if let Some(log) = &self.log {
            let _ = log.log(
                &LogRecord::new(LogLevel::Error, "stream failed")
                    .layer("stream")
                    .kind("error")
                    .field("records", self.records)
                    .field("error", e.to_string()),
            );
        }
        self.err = Some(e);
    }

    fn log_closed(&self) {
        let Some(log) = &self.log else {
            return;
        };
        let mut rec = LogRecord::new(LogLevel::Info, "stream closed")
            .layer("stream")
            .kind("lifecycle")
            .field("records", self.records);
        if let Some(e) = &self.err {
            rec = rec.field("error", e.to_string());
        }
        let _ = log.log(&rec);
    }
}

impl<R: Read> EventStream<R, ErrorRecord> {
    /// 現在のエラーメッセージ。`event().message` の短縮形。
    pub fn message(&self) -> &str {
        &self.event.message
    }
}

/// `advance` が false を返すまでイベントを複製して返す
impl<R: Read, T: Record> Iterator for EventStream<R, T> {
    type Item = T::Event;

    fn next(&mut self) -> Option<T::Event> {
        if self.advance() {
            Some(self.event.clone())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AuditEvent, ErrorEvent, Identity};
    use std::cell::Cell;
    use std::io::Cursor;
    use std::rc::Rc;
    use std::sync::Mutex;
    use std::time::Duration;

    /// 読み取り回数と close 回数を数える入力
    struct Body {
        data: Cursor<Vec<u8>>,
        reads: Rc<Cell<u32>>,
        closes: Rc<Cell<u32>>,
        fail_close: bool,
    }

    impl Body {
        fn new(data: &str) -> Self {
            Self {
                data: Cursor::new(data.as_bytes().to_vec()),
                reads: Rc::new(Cell::new(0)),
                closes: Rc::new(Cell::new(0)),
                fail_close: false,
            }
        }

        fn failing_close(mut self) -> Self {
            self.fail_close = true;
            self
        }
    }

    impl Read for Body {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads.set(self.reads.get() + 1);
            self.data.read(buf)
        }
    }

    impl Close for Body {
        fn close(&mut self) -> io::Result<()> {
            self.closes.set(self.closes.get() + 1);
            if self.fail_close {
                Err(io::Error::new(io::ErrorKind::Other, "close failed"))
            } else {
                Ok(())
            }
        }
    }

    /// 途中で接続が切れる入力
    struct Reset {
        data: Cursor<Vec<u8>>,
    }

    impl Read for Reset {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.data.read(buf)? {
                0 => Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
                n => Ok(n),
            }
        }
    }

    /// 受け取った LogRecord を蓄積する Log
    #[derive(Default)]
    struct CollectLog(Mutex<Vec<LogRecord>>);

    impl Log for CollectLog {
        fn log(&self, record: &LogRecord) -> Result<(), Error> {
            self.0.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn msg(s: &str) -> ErrorEvent {
        ErrorEvent {
            message: s.to_string(),
        }
    }

    const AUDIT: &str = r#"{"time":"2024-01-01T00:00:00Z","request":{"ip":"10.0.0.1","path":"/v1/key/create","identity":"abc123"},"response":{"code":200,"time":"15ms"}}"#;

    #[test]
    fn test_two_messages_then_end() {
        let mut s = ErrorStream::new(Cursor::new("{\"message\":\"a\"}\n{\"message\":\"b\"}\n"));
        assert!(s.advance());
        assert_eq!(s.event(), &msg("a"));
        assert!(s.advance());
        assert_eq!(s.message(), "b");
        assert!(!s.advance());
        assert!(s.err().is_none());
        assert_eq!(s.state(), StreamState::Closed);
        assert_eq!(s.records(), 2);
    }

    #[test]
    fn test_audit_stream_maps_record() {
        let mut s = AuditStream::new(Cursor::new(AUDIT));
        assert!(s.advance());
        let ev: &AuditEvent = s.event();
        assert_eq!(ev.timestamp.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(ev.api_path, "/v1/key/create");
        assert_eq!(ev.client_ip, Some("10.0.0.1".parse().unwrap()));
        assert_eq!(ev.client_identity, Identity::new("abc123"));
        assert_eq!(ev.status_code, 200);
        assert_eq!(ev.response_time, Duration::from_millis(15));
        assert!(!s.advance());
        assert!(s.err().is_none());
    }

    #[test]
    fn test_event_is_zero_value_before_advance() {
        let s = AuditStream::new(Cursor::new(AUDIT));
        assert_eq!(s.event(), &AuditEvent::default());
        assert_eq!(s.state(), StreamState::Open);
    }

    #[test]
    fn test_malformed_record_is_sticky() {
        let body = Body::new("{\"message\":\"a\"}\n{\"message\":42}\n{\"message\":\"c\"}\n");
        let (reads, closes) = (body.reads.clone(), body.closes.clone());
        let mut s = ErrorStream::closable(body);

        assert!(s.advance());
        assert!(!s.advance());
        assert!(matches!(s.err(), Some(Error::Decode(_))));
        assert_eq!(s.event(), &msg("a"));
        assert_eq!(s.state(), StreamState::Errored);
        // 失敗時は自動で close しない
        assert_eq!(closes.get(), 0);

        let before = reads.get();
        assert!(!s.advance());
        assert!(!s.advance());
        assert_eq!(reads.get(), before);
        assert!(matches!(s.err(), Some(Error::Decode(_))));
    }

    #[test]
    fn test_bad_literal_in_audit_record_is_decode_error() {
        let input = format!("{}\n{}\n", AUDIT, AUDIT.replace("15ms", "fast"));
        let mut s = AuditStream::new(Cursor::new(input));
        assert!(s.advance());
        assert!(!s.advance());
        assert!(matches!(s.err(), Some(Error::Decode(_))));
        assert_eq!(s.event().status_code, 200);
    }

    #[test]
    fn test_missing_and_null_fields_decode_to_zero_values() {
        let mut s = ErrorStream::new(Cursor::new("{\"message\":null}\n{}\n"));
        assert!(s.advance());
        assert_eq!(s.event(), &ErrorEvent::default());
        assert!(s.advance());
        assert!(!s.advance());
        assert!(s.err().is_none());

        let input = r#"{"request":{"ip":"10.0.0.1","path":"/v1/status","identity":"abc123"},"response":{"code":200,"time":"15ms"}}"#;
        let mut s = AuditStream::new(Cursor::new(input));
        assert!(s.advance());
        assert_eq!(s.event().status_code, 200);
        assert_eq!(s.event().timestamp, AuditEvent::default().timestamp);
        assert!(!s.advance());
        assert!(s.err().is_none());
    }

    #[test]
    fn test_out_of_range_duration_is_decode_error() {
        let input = AUDIT.replace("\"15ms\"", "\"340282366920938463463374607431768211.999us\"");
        let mut s = AuditStream::new(Cursor::new(input));
        assert!(!s.advance());
        assert!(matches!(s.err(), Some(Error::Decode(_))));
    }

    #[test]
    fn test_read_failure_is_io_error() {
        let mut s = ErrorStream::new(Reset {
            data: Cursor::new(b"{\"message\":\"a\"}\n".to_vec()),
        });
        assert!(s.advance());
        assert!(!s.advance());
        assert!(matches!(s.err(), Some(Error::Io(_))));
    }

    #[test]
    fn test_end_of_input_closes_once() {
        let body = Body::new("{\"message\":\"a\"}");
        let (reads, closes) = (body.reads.clone(), body.closes.clone());
        let mut s = ErrorStream::closable(body);

        assert!(s.advance());
        assert!(!s.advance());
        assert_eq!(closes.get(), 1);
        assert!(s.close().is_ok());
        assert_eq!(closes.get(), 1);

        let before = reads.get();
        assert!(!s.advance());
        assert_eq!(reads.get(), before);
    }

    #[test]
    fn test_close_error_at_end_of_input_is_sticky() {
        let mut s = ErrorStream::closable(Body::new("").failing_close());
        assert!(!s.advance());
        assert!(matches!(s.err(), Some(Error::Io(_))));
        assert_eq!(s.state(), StreamState::Errored);
        assert!(matches!(s.close(), Err(Error::Io(_))));
    }

    #[test]
    fn test_close_is_idempotent() {
        let body = Body::new("{\"message\":\"a\"}").failing_close();
        let closes = body.closes.clone();
        let mut s = ErrorStream::closable(body);

        let first = s.close();
        let second = s.close();
        assert!(first.is_err());
        assert_eq!(first, second);
        assert_eq!(closes.get(), 1);
        assert!(!s.advance());
    }

    #[test]
    fn test_close_after_error_keeps_first_error() {
        let body = Body::new("not json").failing_close();
        let closes = body.closes.clone();
        let mut s = ErrorStream::closable(body);

        assert!(!s.advance());
        let err = s.close().unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert_eq!(closes.get(), 1);
        assert_eq!(s.state(), StreamState::Errored);
    }

    #[test]
    fn test_close_after_error_still_releases_resource() {
        let body = Body::new("not json");
        let closes = body.closes.clone();
        let mut s = ErrorStream::closable(body);

        assert!(!s.advance());
        assert!(matches!(s.close(), Err(Error::Decode(_))));
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn test_close_without_closer_only_marks_closed() {
        let mut s = ErrorStream::new(Cursor::new("{\"message\":\"a\"}"));
        assert!(s.close().is_ok());
        assert_eq!(s.state(), StreamState::Closed);
        assert!(!s.advance());
        assert!(s.err().is_none());
    }

    #[test]
    fn test_iterator_yields_events_in_order() {
        let s = ErrorStream::new(Cursor::new("{\"message\":\"a\"} {\"message\":\"b\"} {\"message\":\"c\"}"));
        let got: Vec<ErrorEvent> = s.collect();
        assert_eq!(got, vec![msg("a"), msg("b"), msg("c")]);
    }

    fn encoded_len<T: serde::Serialize>(rec: &T) -> u64 {
        serde_json::to_vec(rec).unwrap().len() as u64 + 1
    }

    #[test]
    fn test_write_to_relays_all_records() {
        let input = "{\"message\":\"a\"}\n{ \"message\" : \"bb\" }\n";
        let body = Body::new(input);
        let closes = body.closes.clone();
        let mut s = ErrorStream::closable(body);

        let mut out = Vec::new();
        let (n, result) = s.write_to(&mut out);
        assert!(result.is_ok());
        let expected = encoded_len(&ErrorRecord { message: "a".into() })
            + encoded_len(&ErrorRecord { message: "bb".into() });
        assert_eq!(n, expected);
        assert_eq!(n, out.len() as u64);
        assert_eq!(closes.get(), 1);
        assert_eq!(s.state(), StreamState::Closed);
        assert_eq!(s.records(), 2);

        let relayed: Vec<ErrorEvent> = ErrorStream::new(Cursor::new(out)).collect();
        assert_eq!(relayed, vec![msg("a"), msg("bb")]);
    }

    #[test]
    fn test_write_to_relays_audit_wire_shape() {
        let mut s = AuditStream::new(Cursor::new(format!("{}\n{}\n", AUDIT, AUDIT)));
        let mut out = Vec::new();
        let (n, result) = s.write_to(&mut out);
        assert!(result.is_ok());
        assert_eq!(n, out.len() as u64);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 2);
        let v: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(v["response"]["time"], "15ms");
        assert_eq!(v["request"]["ip"], "10.0.0.1");
    }

    #[test]
    fn test_write_to_stops_at_malformed_record() {
        let body = Body::new("{\"message\":\"a\"}\n{\"message\":\"b\"}\n{\"message\":\n");
        let closes = body.closes.clone();
        let mut s = ErrorStream::closable(body);

        let mut out = Vec::new();
        let (n, result) = s.write_to(&mut out);
        assert!(matches!(result, Err(Error::Decode(_))));
        assert_eq!(n, 2 * encoded_len(&ErrorRecord { message: "a".into() }));
        assert!(matches!(s.err(), Some(Error::Decode(_))));
        assert_eq!(s.state(), StreamState::Errored);
        assert_eq!(closes.get(), 0);
        assert!(!s.advance());
    }

    #[test]
    fn test_write_to_reports_encode_error() {
        struct Full;
        impl Write for Full {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut s = ErrorStream::new(Cursor::new("{\"message\":\"a\"}"));
        let (n, result) = s.write_to(Full);
        assert_eq!(n, 0);
        assert!(matches!(result, Err(Error::Encode(_))));
        assert!(matches!(s.err(), Some(Error::Encode(_))));
        assert!(!s.advance());
    }

    #[test]
    fn test_write_to_after_termination_does_no_io() {
        let body = Body::new("{\"message\":\"a\"}");
        let reads = body.reads.clone();
        let mut s = ErrorStream::closable(body);
        s.close().unwrap();

        let mut out = Vec::new();
        let (n, result) = s.write_to(&mut out);
        assert_eq!(n, 0);
        assert!(result.is_ok());
        assert!(out.is_empty());
        assert_eq!(reads.get(), 0);
    }

    #[test]
    fn test_terminal_transitions_are_logged() {
        let log = Arc::new(CollectLog::default());
        let mut s = ErrorStream::new(Cursor::new("{\"message\":\"a\"}")).with_log(log.clone());
        while s.advance() {}

        let mut bad = ErrorStream::new(Cursor::new("[")).with_log(log.clone());
        assert!(!bad.advance());

        let records = log.0.lock().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message, "stream closed");
        assert_eq!(records[0].level, LogLevel::Info);
        assert_eq!(records[0].fields.as_ref().unwrap()["records"], serde_json::json!(1));
        assert_eq!(records[1].message, "stream failed");
        assert_eq!(records[1].level, LogLevel::Error);
        assert_eq!(records[1].kind.as_deref(), Some("error"));
    }
}
