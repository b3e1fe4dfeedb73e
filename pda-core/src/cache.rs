//! 解析結果のキャッシュ
//!
//! デバッガによる解析は時間がかかるため、結果を JSON としてダンプの隣に保存し、
//! 次回以降はそれを読み込みます。

use crate::{DebuggerError, Result};
use pda_model::Analysis;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// キャッシュファイルの拡張子（ダンプのファイル名の後ろに付ける）
const CACHE_SUFFIX: &str = ".analysis.json";

/// 1つの解析結果を保存するキャッシュ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisCache {
    path: PathBuf,
}

impl AnalysisCache {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    /// `<ダンプ>.analysis.json` に置くキャッシュ
    pub fn beside<P: AsRef<Path>>(crash_dump: P) -> Self {
        let mut path = crash_dump.as_ref().as_os_str().to_owned();
        path.push(CACHE_SUFFIX);
        Self { path: PathBuf::from(path) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// キャッシュされた解析結果を読み込む
    ///
    /// ファイルがない場合と、内容を解釈できない場合（警告を出す）は `None` です。
    pub fn load(&self) -> Result<Option<Analysis>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(self.error(source)),
        };

        match serde_json::from_slice(&bytes) {
            Ok(analysis) => {
                debug!("loaded cached analysis from {}", self.path.display());
                Ok(Some(analysis))
            }
            Err(e) => {
                warn!("ignoring unreadable analysis cache {}: {}", self.path.display(), e);
                Ok(None)
            }
        }
    }

    /// 解析結果を保存する（既存のキャッシュは上書き）
    pub fn store(&self, analysis: &Analysis) -> Result<()> {
        let json = serde_json::to_vec_pretty(analysis)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| self.error(source))?;
        }
        fs::write(&self.path, json).map_err(|source| self.error(source))?;
        debug!("stored analysis in {}", self.path.display());
        Ok(())
    }

    /// キャッシュを削除する
    ///
    /// 削除した場合は `true`、もともと存在しなかった場合は `false` を返します。
    pub fn remove(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(self.error(source)),
        }
    }

    /// キャッシュがあればそれを返し、なければ `analyze` を実行して結果を保存する
    pub fn load_or_analyze<F>(&self, analyze: F) -> Result<Analysis>
    where
        F: FnOnce() -> Result<Analysis>,
    {
        if let Some(analysis) = self.load()? {
            info!("using cached analysis for {}", analysis.dump_file_name());
            return Ok(analysis);
        }

        let analysis = analyze()?;
        self.store(&analysis)?;
        Ok(analysis)
    }

    fn error(&self, source: io::Error) -> DebuggerError {
        DebuggerError::Cache {
            path: self.path.clone(),
            source,
        }
    }
}
