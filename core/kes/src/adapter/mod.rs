//! アダプター（外界の I/O を outbound ポートの実装として提供する）
//!
//! ストリーム本体はこのモジュールに依存しない。CLI やクライアントが組み立て時に注入する。

pub mod file_json_log;
pub mod http_body;
pub mod std_env_resolver;
pub mod stderr_log;

pub use file_json_log::{FileJsonLog, NoopLog};
pub use http_body::HttpBody;
pub use std_env_resolver::StdEnvResolver;
pub use stderr_log::StderrLog;
