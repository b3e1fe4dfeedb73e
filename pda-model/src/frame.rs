//! スタックフレーム

use crate::Variable;
use serde::{Deserialize, Serialize};
use std::fmt;

/// スレッドのスタックの1フレーム
///
/// `module` と `index` はシンボルの有無に関わらず常に得られます。
/// 関数名、ソースファイル、行番号はデバッグシンボルで解決できた場合のみ存在します。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub module: String,
    /// 0 が最も内側（現在）のフレーム
    pub index: usize,
    pub function: Option<String>,
    pub source_file: Option<String>,
    pub line: Option<u32>,
    pub variables: Vec<Variable>,
    /// アンワインド情報が欠けていて、このフレームの正しさが保証できない
    pub warning_about_correctness: bool,
}

impl Frame {
    /// モジュール名とフレーム番号からフレームを作成する
    pub fn new(module: impl AsRef<str>, index: usize) -> Self {
        Self {
            module: module.as_ref().trim().to_string(),
            index,
            function: None,
            source_file: None,
            line: None,
            variables: Vec::new(),
            warning_about_correctness: false,
        }
    }

    pub fn with_function(mut self, function: impl AsRef<str>) -> Self {
        self.function = Some(function.as_ref().trim().to_string());
        self
    }

    pub fn with_source(mut self, source_file: impl AsRef<str>, line: Option<u32>) -> Self {
        self.source_file = Some(source_file.as_ref().trim().to_string());
        self.line = line;
        self
    }

    pub fn with_variables(mut self, variables: Vec<Variable>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_warning(mut self, warning_about_correctness: bool) -> Self {
        self.warning_about_correctness = warning_about_correctness;
        self
    }

    /// ソースファイルのファイル名部分（Windows と POSIX の区切りの両方を扱う）
    pub fn source_file_name(&self) -> Option<&str> {
        self.source_file
            .as_deref()
            .map(|path| path.rsplit(['\\', '/']).next().unwrap_or(path))
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Index: {}", self.index)?;
        if self.warning_about_correctness {
            writeln!(f, "  Warning: Frame may be incomplete due to stack unwind info missing.")?;
        }

        match self.source_file_name() {
            Some(file) => {
                write!(f, "  Location: {}:{}:", self.module, file)?;
                write!(f, "{}:", self.function.as_deref().unwrap_or("?"))?;
                match self.line {
                    Some(line) => writeln!(f, "{}", line)?,
                    None => writeln!(f, "?")?,
                }
            }
            None => writeln!(f, "  Location: {}", self.module)?,
        }

        if !self.variables.is_empty() {
            writeln!(f, "  Locals:")?;
            for v in &self.variables {
                writeln!(f, "    {}", v)?;
            }
        }

        Ok(())
    }
}
