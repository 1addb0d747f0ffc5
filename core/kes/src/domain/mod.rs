//! ドメイン型（Newtype）
//!
//! String を直接運ばず、意味のある型に包んで境界を明確にする。

pub mod event;

use serde::{Deserialize, Serialize};

pub use event::{AuditEvent, ErrorEvent};

/// クライアントの KES identity（公開鍵のハッシュ、16 進文字列）
///
/// ワイヤ上は単なる文字列で、空文字は「不明」を表す。
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// identity が空（不明）かどうか
    pub fn is_unknown(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::ops::Deref for Identity {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// サーバーのエンドポイント（末尾の `/` は除去済み）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint(String);

impl Endpoint {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim_end_matches('/').to_string())
    }

    /// エンドポイントに API パスを連結した URL
    pub fn join(&self, path: &str) -> String {
        format!("{}/{}", self.0, path.trim_start_matches('/'))
    }
}

impl std::ops::Deref for Endpoint {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
