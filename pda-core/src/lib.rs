//! pda のコア機能
//!
//! 外部デバッガをクラッシュダンプに対して起動し、その出力から
//! スタックトレース、ローカル変数、スレッドIDを取り出して解析結果にまとめます。

pub mod cache;
pub mod command;
pub mod config;
pub mod debugger;
pub mod driver;
pub mod errors;
pub mod parse;
pub mod symbols;
pub mod windbg;

pub use cache::AnalysisCache;
pub use command::DebuggerCommand;
pub use config::DebuggerConfig;
pub use debugger::{analyze, Debugger, Platform};
pub use driver::{CdbDriver, CommandRunner, RunOptions};
pub use errors::DebuggerError;
pub use symbols::SymbolPath;
pub use windbg::WinDbg;

// 他のクレートから使用するために再エクスポート
pub use pda_model::{Analysis, Frame, Stack, ThreadId, Variable, VariableValue};

/// 解析の結果型
pub type Result<T> = std::result::Result<T, DebuggerError>;
