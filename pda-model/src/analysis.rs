//! 解析結果

use crate::{indent, Stack};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 1つのクラッシュダンプに対してデバッガが行った解析の結果
///
/// `raw_analysis_text` はデバッガ組み込みのクラッシュ解析コマンドの出力そのままです。
/// 構造化された情報は `stacks` にあります。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    dump_file_name: String,
    stacks: Vec<Stack>,
    raw_analysis_text: String,
}

impl Analysis {
    /// 解析結果を作成する
    ///
    /// `stacks` には単一の [`Stack`] もスタックの列も渡せます。
    /// `dump_file_name` はディレクトリ部分を取り除いたファイル名として保持されます。
    pub fn new(
        dump_file_name: impl AsRef<str>,
        stacks: impl Into<Vec<Stack>>,
        raw_analysis_text: impl Into<String>,
    ) -> Self {
        let name = dump_file_name.as_ref();
        let base_name = name.rsplit(['\\', '/']).next().unwrap_or(name);
        Self {
            dump_file_name: base_name.to_string(),
            stacks: stacks.into(),
            raw_analysis_text: raw_analysis_text.into(),
        }
    }

    pub fn dump_file_name(&self) -> &str {
        &self.dump_file_name
    }

    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    pub fn raw_analysis_text(&self) -> &str {
        &self.raw_analysis_text
    }
}

impl fmt::Display for Analysis {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Analysis for {}:", self.dump_file_name)?;
        for stack in &self.stacks {
            write!(f, "{}", indent(&stack.to_string()))?;
        }

        writeln!(f, "Raw Native Analysis Text:")?;
        write!(f, "{}", indent(&self.raw_analysis_text))?;
        if !self.raw_analysis_text.is_empty() && !self.raw_analysis_text.ends_with('\n') {
            writeln!(f)?;
        }
        Ok(())
    }
}
