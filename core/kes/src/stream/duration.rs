//! duration のワイヤ表現
//!
//! サーバーは `15ms` や `1h2m3.5s` のような「10 進数 + 単位」の並びで duration を出す。
//! 読み取り時は整数（ナノ秒）と null（ゼロ）も受け付け、書き出しは常に文字列形式。

use crate::error::Error;
use regex::Regex;
use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;
/// サーバー側の duration は i64 ナノ秒
const MAX_NANOS: u128 = i64::MAX as u128;

/// 1 トークン分: 整数部・小数部・単位
fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([0-9]*)(?:\.([0-9]*))?(ns|us|µs|μs|ms|s|m|h)").expect("static regex")
    })
}

fn unit_nanos(unit: &str) -> u128 {
    match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => 1_000,
        "ms" => 1_000_000,
        "s" => NANOS_PER_SEC,
        "m" => 60 * NANOS_PER_SEC,
        _ => 3600 * NANOS_PER_SEC,
    }
}

/// duration 文字列をパースする。負の値・単位なし（`0` を除く）・i64 ナノ秒を超える値はエラー。
pub fn parse(s: &str) -> Result<Duration, Error> {
    let invalid = || Error::decode(format!("time: invalid duration {:?}", s));
    let mut rest = s.strip_prefix('+').unwrap_or(s);
    if s.starts_with('-') {
        return Err(Error::decode(format!("time: negative duration {:?}", s)));
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let caps = token_re().captures(rest).ok_or_else(invalid)?;
        let whole = caps.get(1).map_or("", |m| m.as_str());
        let frac = caps.get(2).map_or("", |m| m.as_str());
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        let unit = unit_nanos(&caps[3]);

        let mut value: u128 = 0;
        if !whole.is_empty() {
            let w: u128 = whole.parse().map_err(|_| invalid())?;
            value = w.checked_mul(unit).ok_or_else(invalid)?;
        }
        // 小数部は ns 未満を切り捨てる。極端に長い桁は精度に寄与しないので 18 桁まで見る。
        let frac = &frac[..frac.len().min(18)];
        if !frac.is_empty() {
            let f: u128 = frac.parse().map_err(|_| invalid())?;
            value = value
                .checked_add(f * unit / 10u128.pow(frac.len() as u32))
                .ok_or_else(invalid)?;
        }
        if value > MAX_NANOS {
            return Err(invalid());
        }

        total = total.checked_add(value).ok_or_else(invalid)?;
        if total > MAX_NANOS {
            return Err(invalid());
        }
        rest = &rest[caps[0].len()..];
    }
    Ok(Duration::from_nanos(total as u64))
}

/// `scale` 単位の値を末尾 0 を落とした小数で表す
fn fmt_frac(v: u128, scale: u128) -> String {
    let int = v / scale;
    let frac = v % scale;
    if frac == 0 {
        return int.to_string();
    }
    let width = scale.to_string().len() - 1;
    let digits = format!("{:0width$}", frac, width = width);
    format!("{}.{}", int, digits.trim_end_matches('0'))
}

/// duration を文字列形式にする（例: `0s`, `850ns`, `1.5µs`, `15ms`, `1m30s`, `2h0m0s`）
pub fn format(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < NANOS_PER_SEC {
        let (unit, scale) = if nanos < 1_000 {
            ("ns", 1)
        } else if nanos < 1_000_000 {
            ("µs", 1_000)
        } else {
            ("ms", 1_000_000)
        };
        return format!("{}{}", fmt_frac(nanos, scale), unit);
    }

    let secs = nanos / NANOS_PER_SEC;
    let (h, m) = (secs / 3600, (secs / 60) % 60);
    let s = fmt_frac((secs % 60) * NANOS_PER_SEC + nanos % NANOS_PER_SEC, NANOS_PER_SEC);
    if h > 0 {
        format!("{}h{}m{}s", h, m, s)
    } else if m > 0 {
        format!("{}m{}s", m, s)
    } else {
        format!("{}s", s)
    }
}

/// `#[serde(with = "duration")]` 用
pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(*d))
}

/// `#[serde(with = "duration")]` 用
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    deserializer.deserialize_any(DurationVisitor)
}

struct DurationVisitor;

impl<'de> Visitor<'de> for DurationVisitor {
    type Value = Duration;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a duration string like \"15ms\", an integer number of nanoseconds or null")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
        parse(v).map_err(|e| E::custom(e_message(e)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
        if u128::from(v) > MAX_NANOS {
            return Err(E::custom(format!("time: duration out of range {}", v)));
        }
        Ok(Duration::from_nanos(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Duration, E> {
        Ok(Duration::ZERO)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
        u64::try_from(v)
            .map(Duration::from_nanos)
            .map_err(|_| E::custom(format!("time: negative duration {}", v)))
    }
}

fn e_message(e: Error) -> String {
    match e {
        Error::Decode(m) => m,
        other => other.to_string(),
    }
}
