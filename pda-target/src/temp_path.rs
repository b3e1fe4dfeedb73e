//! 一意な一時ファイルパス

use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;
use uuid::Uuid;

/// 一時ディレクトリ内の一意なパス
///
/// パスを予約するだけでファイルは作成しません。
/// 破棄時にそのパスにあるファイルまたはディレクトリを削除します（失敗は無視）。
#[derive(Debug)]
pub struct TemporaryPath {
    path: PathBuf,
}

impl TemporaryPath {
    /// `std::env::temp_dir()` 以下に `<prefix><uuid><suffix>` 形式のパスを作る
    pub fn new(prefix: &str, suffix: &str) -> Self {
        Self::new_in(std::env::temp_dir(), prefix, suffix)
    }

    /// 指定ディレクトリ以下に一意なパスを作る
    pub fn new_in<P: AsRef<Path>>(dir: P, prefix: &str, suffix: &str) -> Self {
        loop {
            let name = format!("{}{}{}", prefix, Uuid::new_v4().simple(), suffix);
            let path = dir.as_ref().join(name);
            if !path.exists() {
                return Self { path };
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AsRef<Path> for TemporaryPath {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

impl Drop for TemporaryPath {
    fn drop(&mut self) {
        let result = if self.path.is_dir() {
            fs::remove_dir_all(&self.path)
        } else {
            fs::remove_file(&self.path)
        };
        if let Err(e) = result {
            trace!("could not remove {:?}: {}", self.path, e);
        }
    }
}
