//! デバッガコマンド

use std::fmt;

/// デバッガ（cdb/WinDbg）に送るコマンド
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebuggerCommand {
    /// 例外発生時のコンテキストへ切り替え
    ExceptionContext,
    /// 終了
    Quit,
    /// 現在のスレッド情報
    CurrentThread,
    /// モジュール!関数 のみのスタックトレース
    StackTrace,
    /// フレームポインタ、引数、ソース情報付きのスタックトレース
    ExtendedStackTrace,
    /// 指定フレームへ切り替え
    SwitchFrame(usize),
    /// 現在のフレームの型付きローカル変数を表示
    DumpLocals,
    /// 組み込みのクラッシュ解析
    Analyze,
    /// テキストを出力
    Echo(String),
    /// その他のコマンド（そのまま送る）
    Raw(String),
}

impl fmt::Display for DebuggerCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DebuggerCommand::ExceptionContext => write!(f, ".ecxr"),
            DebuggerCommand::Quit => write!(f, "q"),
            DebuggerCommand::CurrentThread => write!(f, "~."),
            DebuggerCommand::StackTrace => write!(f, "kcn"),
            DebuggerCommand::ExtendedStackTrace => write!(f, "kpn"),
            DebuggerCommand::SwitchFrame(index) => write!(f, ".frame 0x{:x}", index),
            DebuggerCommand::DumpLocals => write!(f, "dv /t *"),
            DebuggerCommand::Analyze => write!(f, "!analyze -v"),
            DebuggerCommand::Echo(text) => write!(f, ".echo {}", text),
            DebuggerCommand::Raw(text) => write!(f, "{}", text),
        }
    }
}

impl DebuggerCommand {
    /// 入力文字列をパースする
    ///
    /// 別名（`bt`、`locals` など）を認識し、それ以外はデバッガのコマンドとしてそのまま扱います。
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let parts: Vec<&str> = input.split_whitespace().collect();
        if parts.is_empty() {
            return None;
        }

        let command = match parts[0] {
            "bt" | "backtrace" => DebuggerCommand::ExtendedStackTrace,
            "stack" => DebuggerCommand::StackTrace,
            "locals" | "l" => DebuggerCommand::DumpLocals,
            "thread" => DebuggerCommand::CurrentThread,
            "analyze" => DebuggerCommand::Analyze,
            "exception" | ".ecxr" => DebuggerCommand::ExceptionContext,
            "quit" | "q" | "exit" => DebuggerCommand::Quit,
            "frame" | "f" if parts.len() == 2 => match parse_frame_index(parts[1]) {
                Some(index) => DebuggerCommand::SwitchFrame(index),
                None => DebuggerCommand::Raw(input.to_string()),
            },
            _ => DebuggerCommand::Raw(input.to_string()),
        };
        Some(command)
    }

    /// 終了コマンドかどうか
    pub fn is_quit(&self) -> bool {
        matches!(self, DebuggerCommand::Quit)
            || matches!(self, DebuggerCommand::Raw(text) if text == "q")
    }
}

/// フレーム番号をパースする
///
/// スタックトレースの表示に合わせて16進数として扱います（`0a`、`0xa` はどちらも 10）。
fn parse_frame_index(token: &str) -> Option<usize> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    usize::from_str_radix(digits, 16).ok()
}

/// コマンド列を `;` で連結する（`-c` 引数の形式）
pub fn join_commands(commands: &[DebuggerCommand]) -> String {
    commands
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(";")
}
