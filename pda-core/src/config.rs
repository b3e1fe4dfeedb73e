//! デバッガの設定

use pda_model::MAX_STACK_DEPTH;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Windows Kits に含まれる x64 版 cdb の既定の場所
pub const DEFAULT_DEBUGGER_PATH: &str = r"C:\Program Files (x86)\Windows Kits\10\Debuggers\x64\cdb.exe";

/// Microsoft の公開シンボルサーバー
pub const DEFAULT_SYMBOL_SERVER: &str = "https://msdl.microsoft.com/download/symbols";

/// 1回のデバッガ起動に許す時間の既定値
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// デバッガ解析の設定
///
/// プロセス全体で読み取り専用として共有できます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebuggerConfig {
    /// デバッガの実行ファイル
    pub debugger_path: PathBuf,
    /// ダウンロードしたシンボルを置くローカルキャッシュ
    pub symbol_cache: PathBuf,
    /// 上流のシンボルサーバー
    pub symbol_server: String,
    pub timeout: Duration,
    pub max_stack_depth: usize,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            debugger_path: PathBuf::from(DEFAULT_DEBUGGER_PATH),
            symbol_cache: std::env::temp_dir().join("pda-symbol-cache"),
            symbol_server: DEFAULT_SYMBOL_SERVER.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_stack_depth: MAX_STACK_DEPTH,
        }
    }
}

impl DebuggerConfig {
    pub fn with_debugger_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.debugger_path = path.as_ref().to_path_buf();
        self
    }

    pub fn with_symbol_cache<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.symbol_cache = path.as_ref().to_path_buf();
        self
    }

    pub fn with_symbol_server(mut self, server: impl Into<String>) -> Self {
        self.symbol_server = server.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_stack_depth(mut self, depth: usize) -> Self {
        self.max_stack_depth = depth;
        self
    }
}
