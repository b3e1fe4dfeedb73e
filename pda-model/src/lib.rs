//! PDA クラッシュダンプ解析のドメインモデル
//!
//! このクレートは、デバッガの解析結果を表現する値オブジェクトを提供します。
//! 変数、スタックフレーム、スレッドのスタック、そして1つのダンプに対する
//! 解析結果全体を扱い、人間が読めるテキスト表現とキャッシュ用のシリアライズを持ちます。

pub mod variable;
pub mod frame;
pub mod stack;
pub mod analysis;

pub use variable::{Variable, VariableValue};
pub use frame::Frame;
pub use stack::{Stack, ThreadId, MAX_STACK_DEPTH};
pub use analysis::Analysis;

/// 入れ子の表示用に各行を2スペース字下げする
///
/// 空行は字下げしません。末尾の改行は保持されます。
pub fn indent(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    for line in text.split_inclusive('\n') {
        if !line.trim_end_matches(['\r', '\n']).is_empty() {
            out.push_str("  ");
        }
        out.push_str(line);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indent_lines() {
        assert_eq!(indent("a\nb\n"), "  a\n  b\n");
        assert_eq!(indent("a\n\nb"), "  a\n\n  b");
        assert_eq!(indent(""), "");
    }
}
