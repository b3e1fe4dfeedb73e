//! デバッガ出力のパース
//!
//! ドライバが返したテキストから、スレッドID、ローカル変数、フレームごとの行、
//! ソース位置を取り出します。

use crate::{DebuggerError, Result};
use pda_model::{ThreadId, Variable, VariableValue};
use regex::Regex;

/// アンワインド情報が欠けているときにデバッガが出す警告
pub const UNWIND_WARNING: &str = "Stack unwind information not available";

/// デバッガが10進数の値に付けるプレフィックス
const DECIMAL_PREFIX: &str = "0n";

/// スタックトレース中の1フレーム分の行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLine<'a> {
    pub line: &'a str,
    /// この行より前にアンワインド情報欠落の警告があった
    pub warning: bool,
}

/// フレームのソース位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: Option<u32>,
}

/// デバッガ出力のパーサ
pub struct OutputParser {
    /// `Id: <プロセス>.<スレッド>`（どちらも16進数）
    thread_id_pattern: Regex,
    /// 行末の `[パス @ 行番号]`
    source_pattern: Regex,
}

impl OutputParser {
    /// パーサを作成する
    pub fn new() -> Result<Self> {
        // 例: .  0  Id: 97cc.e00 Suspend: 0 Teb: 00f81000 Unfrozen
        let thread_id_pattern = Regex::new(r"\bId:\s*([0-9a-fA-F]+)\.([0-9a-fA-F]+)")
            .map_err(|e| DebuggerError::Parse(format!("invalid thread id pattern: {}", e)))?;

        // 例: 01 (Inline) -------- TheCrasher!invoke_main+0x1d [f:\dd\...\exe_common.inl @ 64]
        // インラインフレームは列の数が違うため、行末の角括弧だけを見る
        let source_pattern = Regex::new(r"\[([^\[\]]+?)\s+@\s+(\d+)\]\s*$")
            .map_err(|e| DebuggerError::Parse(format!("invalid source pattern: {}", e)))?;

        Ok(Self {
            thread_id_pattern,
            source_pattern,
        })
    }

    /// 「現在のスレッド」の出力からスレッドIDを取り出す
    ///
    /// 該当する行がなければ `None` を返します。
    pub fn thread_id(&self, output: &str) -> Option<ThreadId> {
        output.lines().find_map(|line| {
            let caps = self.thread_id_pattern.captures(line)?;
            ThreadId::from_str_radix(&caps[2], 16).ok()
        })
    }

    /// 行末の `[パス @ 行番号]` からソース位置を取り出す
    pub fn source_location(&self, line: &str) -> Option<SourceLocation> {
        let caps = self.source_pattern.captures(line)?;
        Some(SourceLocation {
            file: caps[1].trim().to_string(),
            line: caps[2].parse().ok(),
        })
    }
}

/// 型付きローカル変数の出力から変数を取り出す
///
/// ` = ` を含まない行（空行、目印、フレーム行など）は無視します。
pub fn parse_variables(output: &str) -> Vec<Variable> {
    output.lines().filter_map(parse_variable_line).collect()
}

/// `型 名前 = 値` 形式の1行をパースする
///
/// 名前は左辺の最後の単語で、型はそれより前のすべてです。
///
/// # Examples
/// ```
/// use pda_core::parse::parse_variable_line;
/// use pda_core::Variable;
///
/// assert_eq!(
///     parse_variable_line("char ** argv = 0x032053f0"),
///     Some(Variable::new("char **", "argv", "0x032053f0"))
/// );
/// assert_eq!(parse_variable_line("int argc = 0n1"), Some(Variable::new("int", "argc", 1)));
/// ```
pub fn parse_variable_line(line: &str) -> Option<Variable> {
    let (left, right) = line.split_once(" = ")?;
    let left = left.trim();
    let (type_name, name) = match left.rsplit_once(char::is_whitespace) {
        Some((type_name, name)) => (type_name.trim(), name),
        None => ("", left),
    };
    if name.is_empty() {
        return None;
    }
    Some(Variable::new(type_name, name, parse_value(right.trim())))
}

/// `0n` 付きの値は整数に、それ以外は文字列のまま
fn parse_value(raw: &str) -> VariableValue {
    raw.strip_prefix(DECIMAL_PREFIX)
        .and_then(|digits| digits.parse::<i64>().ok())
        .map(VariableValue::Integer)
        .unwrap_or_else(|| VariableValue::Text(raw.to_string()))
}

/// フレーム番号の列をパースする（`kn` 系の出力は2桁以上の16進数）
fn parse_frame_number(token: &str) -> Option<usize> {
    if token.len() < 2 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    usize::from_str_radix(token, 16).ok()
}

/// スタックトレースから指定したフレーム番号の行を探す
///
/// 警告行は記録したうえで読み飛ばし、先頭がフレーム番号でない行も読み飛ばします。
/// 見つからなければ `None` です。
pub fn find_frame_line(trace: &str, index: usize) -> Option<FrameLine<'_>> {
    let mut warning = false;
    for line in trace.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.contains(UNWIND_WARNING) {
            warning = true;
            continue;
        }

        let Some(number) = trimmed.split_whitespace().next().and_then(parse_frame_number) else {
            continue;
        };
        if number == index {
            return Some(FrameLine { line: trimmed, warning });
        }
    }
    None
}

/// フレーム行の2番目の列を `モジュール` と `関数` に分ける
pub fn split_module_function(line: &str) -> Option<(&str, Option<&str>)> {
    let symbol = line.split_whitespace().nth(1)?;
    Some(match symbol.split_once('!') {
        Some((module, function)) => (module, Some(function)),
        None => (symbol, None),
    })
}
