//! Ports & Adapters のポート定義
//!
//! - inbound: なし（kes はライブラリのためアプリの入り口を持たない）
//! - outbound: ストリームやクライアントが外界に依頼するための trait

pub mod outbound;
