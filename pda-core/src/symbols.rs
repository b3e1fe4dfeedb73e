//! シンボル検索パス

use std::fmt;
use std::path::{Path, PathBuf};

/// デバッガに渡すシンボル検索パス（`-y` 引数）
///
/// 階層化されたパスは、ローカルキャッシュ、利用者が指定した場所、
/// 上流のシンボルサーバーの順に検索されます。サーバーから取得したシンボルはキャッシュに保存されます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolPath {
    /// 単一の場所
    Local(String),
    /// キャッシュ、利用者指定の場所、上流サーバーの組み合わせ
    Layered {
        cache_dir: PathBuf,
        user_symbols: Option<String>,
        server: String,
    },
}

impl SymbolPath {
    pub fn local(path: impl Into<String>) -> Self {
        SymbolPath::Local(path.into())
    }

    /// 階層化されたシンボル検索パスを作る
    ///
    /// 空の `user_symbols` は無視されます。
    pub fn layered<P: AsRef<Path>>(cache_dir: P, user_symbols: &str, server: &str) -> Self {
        let user_symbols = user_symbols.trim();
        SymbolPath::Layered {
            cache_dir: cache_dir.as_ref().to_path_buf(),
            user_symbols: (!user_symbols.is_empty()).then(|| user_symbols.to_string()),
            server: server.to_string(),
        }
    }
}

impl fmt::Display for SymbolPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SymbolPath::Local(path) => write!(f, "{}", path),
            SymbolPath::Layered { cache_dir, user_symbols, server } => {
                let cache = cache_dir.display();
                write!(f, "cache*{}", cache)?;
                if let Some(user) = user_symbols {
                    write!(f, ";{}", user)?;
                }
                write!(f, ";srv*{}*{}", cache, server)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local() {
        assert_eq!(SymbolPath::local(r"C:\syms").to_string(), r"C:\syms");
    }

    #[test]
    fn test_layered() {
        let path = SymbolPath::layered("/cache", "/user/syms", "https://symbols.example.com");
        assert_eq!(
            path.to_string(),
            "cache*/cache;/user/syms;srv*/cache*https://symbols.example.com"
        );
    }

    #[test]
    fn test_layered_without_user_symbols() {
        let path = SymbolPath::layered("/cache", "  ", "https://symbols.example.com");
        assert_eq!(path.to_string(), "cache*/cache;srv*/cache*https://symbols.example.com");
    }
}
