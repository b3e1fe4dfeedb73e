//! 子プロセスの起動と監視

use crate::Result;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// 終了待ちのポーリング間隔の既定値
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// 終了コード（シグナルで終了した場合は `None`）
pub type ExitCode = Option<i32>;

/// 子プロセスの標準入出力の扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdioMode {
    /// 標準入出力をすべて閉じる（バッチ実行）
    Null,
    /// 親プロセスのコンソールを引き継ぐ（対話実行）
    Inherit,
}

/// 期限付き待機の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// プロセスが終了した
    Exited(ExitCode),
    /// 期限までに終了しなかった（プロセスはまだ動いている）
    TimedOut,
}

/// 起動するプロセスの設定
#[derive(Debug, Clone)]
pub struct Launch {
    program: PathBuf,
    args: Vec<OsString>,
    stdio: StdioMode,
    own_process_group: bool,
}

impl Launch {
    /// 実行ファイルのパスから起動設定を作成する
    pub fn new<P: AsRef<Path>>(program: P) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            stdio: StdioMode::Null,
            own_process_group: false,
        }
    }

    /// 引数を1つ追加する
    pub fn arg<S: Into<OsString>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// 引数をまとめて追加する
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdio(mut self, stdio: StdioMode) -> Self {
        self.stdio = stdio;
        self
    }

    /// 子プロセスを専用のプロセスグループで起動する
    ///
    /// 強制終了時に子プロセスが起動した孫プロセスもまとめて終了させるために使います。
    /// Unix 以外では何もしません。
    pub fn own_process_group(mut self, enabled: bool) -> Self {
        self.own_process_group = enabled;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// 表示・エラー報告用の引数一覧（プログラム自身を含む）
    pub fn command_line(&self) -> Vec<String> {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|s| s.to_string_lossy().into_owned())
            .collect()
    }

    /// プロセスを起動する
    pub fn spawn(&self) -> Result<Process> {
        let mut command = Command::new(&self.program);
        command.args(&self.args);

        match self.stdio {
            StdioMode::Null => {
                command
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null());
            }
            StdioMode::Inherit => {
                command
                    .stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
            }
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            if self.own_process_group {
                command.process_group(0);
            }
        }

        let child = command
            .spawn()
            .map_err(|e| anyhow::anyhow!("Failed to launch {:?}: {}", self.program, e))?;
        debug!("spawned {:?} as pid {}", self.program, child.id());

        Ok(Process {
            child,
            own_process_group: cfg!(unix) && self.own_process_group,
            reaped: false,
        })
    }
}

/// 起動済みの子プロセス
///
/// 終了を確認しないまま破棄された場合は強制終了して回収します。
pub struct Process {
    child: Child,
    own_process_group: bool,
    reaped: bool,
}

impl Process {
    /// プロセスIDを取得する
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// 終了していれば終了コードを返す（ブロックしない）
    pub fn try_wait(&mut self) -> Result<Option<ExitCode>> {
        let status = self.child.try_wait()?;
        if let Some(status) = status {
            self.reaped = true;
            return Ok(Some(status.code()));
        }
        Ok(None)
    }

    /// プロセスの終了を待つ
    ///
    /// `timeout` が `None` の場合（または期限を計算できないほど長い場合）は終了するまで待ち続けます。
    /// 期限を過ぎた場合は `WaitOutcome::TimedOut` を返し、プロセスは終了させません。
    pub fn wait_timeout(
        &mut self,
        timeout: Option<Duration>,
        poll_interval: Duration,
    ) -> Result<WaitOutcome> {
        // 期限が表現できないほど長い場合は無期限として扱う
        let Some(deadline) = timeout.and_then(|t| Instant::now().checked_add(t)) else {
            let status = self.child.wait()?;
            self.reaped = true;
            return Ok(WaitOutcome::Exited(status.code()));
        };

        loop {
            if let Some(code) = self.try_wait()? {
                trace!("pid {} exited with {:?}", self.pid(), code);
                return Ok(WaitOutcome::Exited(code));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(WaitOutcome::TimedOut);
            }
            thread::sleep(poll_interval.min(deadline - now));
        }
    }

    /// プロセスを強制終了して回収する
    ///
    /// 専用のプロセスグループで起動している場合はグループ全体を終了させます。
    /// すでに終了しているプロセスに対しては何もしません。
    pub fn terminate(&mut self) -> Result<()> {
        if self.reaped {
            return Ok(());
        }

        #[cfg(unix)]
        {
            use nix::errno::Errno;
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            if self.own_process_group {
                let pgid = Pid::from_raw(self.pid() as i32);
                match killpg(pgid, Signal::SIGKILL) {
                    // ESRCH: グループがすでに存在しない
                    Ok(()) | Err(Errno::ESRCH) => {}
                    Err(errno) => warn!("killpg({}) failed: {}", pgid, errno),
                }
            }
        }

        if let Err(e) = self.child.kill() {
            // InvalidInput: すでに終了している
            if e.kind() != std::io::ErrorKind::InvalidInput {
                return Err(anyhow::anyhow!("Failed to kill pid {}: {}", self.pid(), e));
            }
        }

        self.child.wait()?;
        self.reaped = true;
        debug!("terminated pid {}", self.pid());
        Ok(())
    }
}

impl Drop for Process {
    fn drop(&mut self) {
        if !self.reaped {
            let _ = self.terminate();
        }
    }
}
