//! デバッガプロセスの駆動
//!
//! クラッシュダンプ、シンボル、実行ファイルを指定して外部デバッガを非対話的に起動し、
//! コマンド列の出力を取り出します。各コマンドの前後にはエコーによる目印を出力させ、
//! バナーなどの余計な出力を取り除きます。

use crate::command::{join_commands, DebuggerCommand};
use crate::{DebuggerError, Result};
use pda_target::{Launch, StdioMode, TemporaryPath, WaitOutcome, DEFAULT_POLL_INTERVAL};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// 1回のデバッガ起動の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// `None` の場合は終了するまで待ち続ける
    pub timeout: Option<Duration>,
    /// 最初に例外発生時のコンテキストへ切り替える
    pub goto_exception_context: bool,
    /// 各コマンドの前後に目印を出力させ、その範囲だけを返す
    pub markers: bool,
    /// 最後に終了コマンドを追加する
    pub append_quit: bool,
    /// コンソールを引き継いで起動する
    pub interactive: bool,
}

impl RunOptions {
    /// 目印付きで実行し、終了コマンドを追加するバッチ実行
    pub fn batch(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            goto_exception_context: true,
            markers: true,
            append_quit: true,
            interactive: false,
        }
    }

    /// 利用者がコンソールで操作する長時間のセッション
    ///
    /// 終了コマンドは追加せず、タイムアウトもありません。
    pub fn interactive() -> Self {
        Self {
            timeout: None,
            goto_exception_context: true,
            markers: false,
            append_quit: false,
            interactive: true,
        }
    }
}

/// コマンド列をデバッガで実行して出力を返すもの
pub trait CommandRunner {
    /// コマンド列を1回のデバッガ起動で実行する
    ///
    /// タイムアウトや異常終了の場合はコマンド列全体が失敗します（部分的な結果は返しません）。
    fn run_commands(&self, commands: &[DebuggerCommand], options: &RunOptions) -> Result<String>;
}

/// 実行するコマンド列と、出力を切り出すための目印
#[derive(Debug, Clone, PartialEq, Eq)]
struct Script {
    commands: Vec<DebuggerCommand>,
    header: Option<String>,
    footer: Option<String>,
}

impl Script {
    fn build(commands: &[DebuggerCommand], options: &RunOptions, token: &str) -> Self {
        let mut script = Vec::with_capacity(commands.len() * 3 + 2);
        let mut header = None;
        let mut footer = None;

        if options.goto_exception_context {
            script.push(DebuggerCommand::ExceptionContext);
        }

        for command in commands.iter().filter(|c| !c.is_quit()) {
            if options.markers {
                let start = marker("Start", command, token);
                let end = marker("End", command, token);
                header.get_or_insert_with(|| start.clone());
                script.push(DebuggerCommand::Echo(start));
                script.push(command.clone());
                script.push(DebuggerCommand::Echo(end.clone()));
                footer = Some(end);
            } else {
                script.push(command.clone());
            }
        }

        if options.append_quit {
            script.push(DebuggerCommand::Quit);
        }

        Self { commands: script, header, footer }
    }
}

/// 目印の行（`;` はコマンド区切りになるため置き換える）
fn marker(kind: &str, command: &DebuggerCommand, token: &str) -> String {
    format!("== {} Calling {} [{}] ==", kind, command.to_string().replace(';', ","), token)
}

/// 目印で囲まれた範囲を取り出し、目印を付け直して返す
///
/// デバッガのログには起動時のコマンドラインとプロンプト（どちらも目印の文字列を含む）が
/// 記録されるため、連結したコマンド列が最後に現れた位置より後ろだけを対象にします。
fn extract_marked_output(output: &str, joined: &str, header: &str, footer: &str) -> Option<String> {
    let body = match output.rfind(joined) {
        Some(at) => &output[at + joined.len()..],
        None => output,
    };
    let start = body.find(header)? + header.len();
    let rest = &body[start..];
    let end = rest.find(footer)?;
    Some(format!("{}{}{}", header, &rest[..end], footer))
}

/// cdb をクラッシュダンプに対して起動するドライバ
#[derive(Debug, Clone)]
pub struct CdbDriver {
    debugger_path: PathBuf,
    crash_dump: PathBuf,
    symbols: String,
    executable: Option<PathBuf>,
    poll_interval: Duration,
}

impl CdbDriver {
    /// ドライバを作成する
    ///
    /// デバッガの実行ファイルが見つからない場合は、コマンドを実行する前に失敗します。
    pub fn new<P, D>(
        debugger_path: P,
        crash_dump: D,
        symbols: impl Into<String>,
        executable: Option<PathBuf>,
    ) -> Result<Self>
    where
        P: AsRef<Path>,
        D: AsRef<Path>,
    {
        let debugger_path = debugger_path.as_ref().to_path_buf();
        if !debugger_path.is_file() {
            return Err(DebuggerError::EnvironmentMissing { path: debugger_path });
        }

        Ok(Self {
            debugger_path,
            crash_dump: crash_dump.as_ref().to_path_buf(),
            symbols: symbols.into(),
            executable,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn debugger_path(&self) -> &Path {
        &self.debugger_path
    }

    pub fn crash_dump(&self) -> &Path {
        &self.crash_dump
    }

    pub fn symbols(&self) -> &str {
        &self.symbols
    }

    fn launch(&self, log: &Path, joined: &str, options: &RunOptions) -> Launch {
        let mut launch = Launch::new(&self.debugger_path)
            .arg("-z")
            .arg(&self.crash_dump)
            .arg("-y")
            .arg(&self.symbols);
        if let Some(executable) = &self.executable {
            launch = launch.arg("-i").arg(executable);
        }

        let stdio = if options.interactive {
            StdioMode::Inherit
        } else {
            StdioMode::Null
        };

        launch
            .arg("-logo")
            .arg(log)
            .arg("-c")
            .arg(joined)
            .stdio(stdio)
            .own_process_group(!options.interactive)
    }
}

impl CommandRunner for CdbDriver {
    fn run_commands(&self, commands: &[DebuggerCommand], options: &RunOptions) -> Result<String> {
        let token = Uuid::new_v4().simple().to_string();
        let script = Script::build(commands, options, &token);
        let joined = join_commands(&script.commands);

        let log = TemporaryPath::new("pda_", ".log");
        let launch = self.launch(log.path(), &joined, options);
        debug!("running debugger: {:?}", launch.command_line());

        let mut process = launch.spawn().map_err(|e| DebuggerError::Spawn {
            path: launch.program().to_path_buf(),
            message: format!("{:#}", e),
        })?;

        let outcome = process
            .wait_timeout(options.timeout, self.poll_interval)
            .map_err(|e| supervision_error(&self.debugger_path, e))?;

        match outcome {
            WaitOutcome::TimedOut => {
                warn!("debugger pid {} timed out, terminating", process.pid());
                if let Err(e) = process.terminate() {
                    warn!("failed to terminate debugger: {:#}", e);
                }
                return Err(DebuggerError::Timeout {
                    commands: joined,
                    timeout: options.timeout.unwrap_or_default(),
                });
            }
            WaitOutcome::Exited(Some(0)) => {}
            WaitOutcome::Exited(code) => {
                return Err(DebuggerError::ProcessFailed {
                    code,
                    args: launch.command_line(),
                });
            }
        }

        let bytes = fs::read(log.path()).map_err(|source| DebuggerError::Io {
            path: log.path().to_path_buf(),
            source,
        })?;
        let output = String::from_utf8_lossy(&bytes).into_owned();
        trace!("debugger wrote {} bytes", output.len());

        if let (Some(header), Some(footer)) = (&script.header, &script.footer) {
            match extract_marked_output(&output, &joined, header, footer) {
                Some(marked) => return Ok(marked),
                None => warn!("output markers not found, returning full debugger output"),
            }
        }
        Ok(output)
    }
}

fn supervision_error(path: &Path, error: anyhow::Error) -> DebuggerError {
    DebuggerError::Io {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::Other, format!("{:#}", error)),
    }
}
