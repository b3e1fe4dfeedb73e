//! デバッガの抽象化とプラットフォームの選択

use crate::config::DebuggerConfig;
use crate::windbg::WinDbg;
use crate::Result;
use pda_model::{Analysis, Stack};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// プラットフォームごとのデバッガバックエンドが実装する操作
///
/// プラットフォームの準備（デバッガの検出、シンボル検索パスの構成）は構築時に1回だけ行います。
/// 構築できたインスタンスは解析の準備ができています。
pub trait Debugger {
    /// 解析対象のクラッシュダンプ
    fn dump_path(&self) -> &Path;

    /// 例外が発生したスレッドのスタックトレースを取得する
    fn get_stack_trace(&self) -> Result<Stack>;

    /// デバッガ組み込みのクラッシュ解析の出力をそのまま取得する
    fn get_raw_analysis(&self) -> Result<String>;

    /// スタックトレースと組み込み解析をまとめて解析結果にする
    ///
    /// インスタンスを消費します。同じインスタンスで解析をやり直すことはできません。
    fn get_analysis(self) -> Result<Analysis>
    where
        Self: Sized,
    {
        analyze(&self)
    }
}

/// トレイトオブジェクトに対して解析結果を組み立てる
pub fn analyze(debugger: &dyn Debugger) -> Result<Analysis> {
    let dump = debugger.dump_path();
    info!("analyzing {}", dump.display());

    let stack = debugger.get_stack_trace()?;
    let raw = debugger.get_raw_analysis()?;
    let analysis = Analysis::new(dump.to_string_lossy(), stack, raw);

    info!(
        "analysis of {} complete: {} frames",
        analysis.dump_file_name(),
        analysis.stacks().iter().map(Stack::depth).sum::<usize>()
    );
    Ok(analysis)
}

/// 対応しているプラットフォーム
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Windows,
}

impl Platform {
    pub const ALL: &'static [Platform] = &[Platform::Windows];

    /// このプラットフォームのデバッガでクラッシュダンプを開く
    pub fn open(
        self,
        crash_dump: &Path,
        symbols: &str,
        executable: Option<PathBuf>,
        config: &DebuggerConfig,
    ) -> Result<Box<dyn Debugger>> {
        match self {
            Platform::Windows => Ok(Box::new(WinDbg::new(crash_dump, symbols, executable, config)?)),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Platform::Windows => write!(f, "Windows"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Platform::ALL
            .iter()
            .copied()
            .find(|p| p.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unsupported platform: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pda_model::Frame;

    struct FixedDebugger {
        dump: PathBuf,
    }

    impl Debugger for FixedDebugger {
        fn dump_path(&self) -> &Path {
            &self.dump
        }

        fn get_stack_trace(&self) -> Result<Stack> {
            Ok(Stack::new(vec![Frame::new("app", 0).with_function("main")], Some(7)))
        }

        fn get_raw_analysis(&self) -> Result<String> {
            Ok("FAULTING_IP: app!main".to_string())
        }
    }

    #[test]
    fn test_get_analysis() {
        let debugger = FixedDebugger { dump: PathBuf::from("/uploads/app/crash.dmp") };
        let analysis = debugger.get_analysis().unwrap();
        assert_eq!(analysis.dump_file_name(), "crash.dmp");
        assert_eq!(analysis.stacks().len(), 1);
        assert_eq!(analysis.stacks()[0].thread_id, Some(7));
        assert_eq!(analysis.raw_analysis_text(), "FAULTING_IP: app!main");
    }

    #[test]
    fn test_analyze_trait_object() {
        let debugger: Box<dyn Debugger> = Box::new(FixedDebugger { dump: PathBuf::from("x.dmp") });
        let analysis = analyze(debugger.as_ref()).unwrap();
        assert_eq!(analysis.dump_file_name(), "x.dmp");
    }

    #[test]
    fn test_platform_parse() {
        assert_eq!("windows".parse::<Platform>(), Ok(Platform::Windows));
        assert_eq!(" Windows ".parse::<Platform>(), Ok(Platform::Windows));
        assert!("Linux".parse::<Platform>().is_err());
        assert_eq!(Platform::Windows.to_string(), "Windows");
    }

    #[test]
    fn test_platform_open_requires_debugger() {
        let config = DebuggerConfig::default().with_debugger_path("/nonexistent/cdb.exe");
        let err = Platform::Windows
            .open(Path::new("crash.dmp"), "syms", None, &config)
            .err()
            .unwrap();
        assert!(matches!(err, crate::DebuggerError::EnvironmentMissing { .. }));
    }
}
