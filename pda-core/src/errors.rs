//! デバッガ解析のエラー

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// デバッガ解析で発生するエラー
///
/// プロセスレベルの失敗（タイムアウト、異常終了）は解析全体を中断させます。
/// 呼び出し側はバリアントで再試行するか、恒久的な失敗として扱うかを判断できます。
#[derive(Debug, Error)]
pub enum DebuggerError {
    /// デバッガの実行ファイルが存在しない（構築時に検出、再試行しない）
    #[error("Could not find debugger: {}", .path.display())]
    EnvironmentMissing { path: PathBuf },

    /// デバッガが制限時間内に終了しなかった
    #[error("Debugger timed out after {timeout:?} running: {commands}")]
    Timeout { commands: String, timeout: Duration },

    /// デバッガが0以外の終了コードで終了した
    #[error("Debugger exited with {}: {args:?}", describe_exit(.code))]
    ProcessFailed { code: Option<i32>, args: Vec<String> },

    /// デバッガを起動できなかった（実行権限がない、形式が不正など）
    #[error("Failed to launch debugger {}: {message}", .path.display())]
    Spawn { path: PathBuf, message: String },

    /// デバッガの監視や出力ログの読み取りに失敗した
    #[error("Debugger I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// デバッガ出力から必要な情報を取り出せなかった
    #[error("Could not parse debugger output: {0}")]
    Parse(String),

    /// 解析キャッシュの読み書きに失敗した
    #[error("Analysis cache error at {}: {source}", .path.display())]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize analysis: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DebuggerError {
    /// より長いタイムアウトで再試行する価値があるか
    pub fn is_retryable(&self) -> bool {
        matches!(self, DebuggerError::Timeout { .. })
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let e = DebuggerError::EnvironmentMissing { path: PathBuf::from("/x/cdb.exe") };
        assert_eq!(e.to_string(), "Could not find debugger: /x/cdb.exe");

        let e = DebuggerError::ProcessFailed { code: Some(3), args: vec!["cdb".into()] };
        assert_eq!(e.to_string(), "Debugger exited with exit code 3: [\"cdb\"]");

        let e = DebuggerError::ProcessFailed { code: None, args: vec![] };
        assert!(e.to_string().contains("a signal"));
    }

    #[test]
    fn test_only_timeout_is_retryable() {
        let timeout = DebuggerError::Timeout {
            commands: "kcn;q".into(),
            timeout: Duration::from_secs(1),
        };
        assert!(timeout.is_retryable());
        assert!(timeout.to_string().contains("kcn;q"));
        assert!(!DebuggerError::Parse("x".into()).is_retryable());
    }
}
