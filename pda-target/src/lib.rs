//! PDA 外部プロセス制御
//!
//! このクレートは、デバッガなどの外部プロセスを監視するための低レベル機能を提供します。
//! 子プロセスの起動、期限付きのポーリング待機、プロセスグループごとの強制終了、
//! 一意な一時ファイルパスの管理などを行います。

pub mod process;
pub mod temp_path;

pub use process::{ExitCode, Launch, Process, StdioMode, WaitOutcome, DEFAULT_POLL_INTERVAL};
pub use temp_path::TemporaryPath;

/// プロセス制御の結果型
pub type Result<T> = anyhow::Result<T>;
