//! Windows 用のデバッガバックエンド（cdb）

use crate::command::DebuggerCommand;
use crate::config::DebuggerConfig;
use crate::debugger::Debugger;
use crate::driver::{CdbDriver, CommandRunner, RunOptions};
use crate::parse::{find_frame_line, parse_variables, split_module_function, OutputParser};
use crate::symbols::SymbolPath;
use crate::Result;
use pda_model::{Frame, Stack, ThreadId, Variable};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// cdb でクラッシュダンプを解析するバックエンド
///
/// コマンドの実行は [`CommandRunner`] に任せます。
/// 通常は [`CdbDriver`] を使い、テストでは出力を固定したものに差し替えます。
pub struct WinDbg<R = CdbDriver> {
    runner: R,
    dump_path: PathBuf,
    parser: OutputParser,
    timeout: Duration,
    max_stack_depth: usize,
}

impl WinDbg<CdbDriver> {
    /// プラットフォームの準備を行い、クラッシュダンプを開く
    ///
    /// シンボルはローカルキャッシュ、`symbols`、上流サーバーの順に検索されます。
    /// デバッガが見つからなければここで失敗します。
    pub fn new(
        crash_dump: &Path,
        symbols: &str,
        executable: Option<PathBuf>,
        config: &DebuggerConfig,
    ) -> Result<Self> {
        let symbol_path = SymbolPath::layered(&config.symbol_cache, symbols, &config.symbol_server);
        debug!("symbol path: {}", symbol_path);

        let driver = CdbDriver::new(&config.debugger_path, crash_dump, symbol_path.to_string(), executable)?;
        Self::with_runner(driver, crash_dump, config)
    }
}

impl<R: CommandRunner> WinDbg<R> {
    pub fn with_runner<P: AsRef<Path>>(runner: R, crash_dump: P, config: &DebuggerConfig) -> Result<Self> {
        Ok(Self {
            runner,
            dump_path: crash_dump.as_ref().to_path_buf(),
            parser: OutputParser::new()?,
            timeout: config.timeout,
            max_stack_depth: config.max_stack_depth,
        })
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// 1つのコマンドを例外コンテキストで実行し、目印で囲まれた出力を返す
    pub fn run_command(&self, command: DebuggerCommand) -> Result<String> {
        self.call(&[command])
    }

    fn call(&self, commands: &[DebuggerCommand]) -> Result<String> {
        self.runner.run_commands(commands, &RunOptions::batch(self.timeout))
    }

    /// 例外が発生したスレッドのID
    ///
    /// 出力から見つからない場合は `None` です（解析全体は失敗させません）。
    pub fn thread_id(&self) -> Result<Option<ThreadId>> {
        let output = self.call(&[DebuggerCommand::CurrentThread])?;
        Ok(self.parser.thread_id(&output))
    }

    /// 指定したフレームの型付きローカル変数
    pub fn variables_for_frame(&self, index: usize) -> Result<Vec<Variable>> {
        let output = self.call(&[DebuggerCommand::SwitchFrame(index), DebuggerCommand::DumpLocals])?;
        Ok(parse_variables(&output))
    }

    fn frame(&self, index: usize, clean: &str, extended: &str) -> Result<Option<Frame>> {
        let Some(clean_line) = find_frame_line(clean, index) else {
            return Ok(None);
        };
        let Some((module, function)) = split_module_function(clean_line.line) else {
            debug!("frame {} has no symbol column: {:?}", index, clean_line.line);
            return Ok(None);
        };

        let mut frame = Frame::new(module, index).with_warning(clean_line.warning);
        if let Some(function) = function {
            frame = frame.with_function(function);
        }

        match find_frame_line(extended, index) {
            Some(extended_line) => {
                if let Some(location) = self.parser.source_location(extended_line.line) {
                    frame = frame.with_source(location.file, location.line);
                }
            }
            None => debug!("frame {} missing from extended stack trace", index),
        }

        Ok(Some(frame.with_variables(self.variables_for_frame(index)?)))
    }
}

impl<R: CommandRunner> Debugger for WinDbg<R> {
    fn dump_path(&self) -> &Path {
        &self.dump_path
    }

    fn get_stack_trace(&self) -> Result<Stack> {
        let clean = self.call(&[DebuggerCommand::StackTrace])?;
        let extended = self.call(&[DebuggerCommand::ExtendedStackTrace])?;

        let mut frames = Vec::new();
        for index in 0..self.max_stack_depth {
            match self.frame(index, &clean, &extended)? {
                Some(frame) => frames.push(frame),
                None => break,
            }
        }

        let thread_id = self.thread_id()?;
        if thread_id.is_none() {
            warn!("could not determine thread id for {}", self.dump_path.display());
        }

        Ok(Stack::new(frames, thread_id))
    }

    fn get_raw_analysis(&self) -> Result<String> {
        self.call(&[DebuggerCommand::Analyze])
    }
}
