//! ダウンロードしたモデルファイルのローカル管理
//!
//! ファイル構成（model_dir内部）:
//! - downloaded_model.pte       - 検証済みモデル（読み込みのたびに上書き）
//! - downloaded_model.pte.part  - ダウンロード中の一時ファイル

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use crate::model::digest;

/// ローカルに保存されたモデルファイル
///
/// 同時に存在する有効なファイルは1つだけ。検証に失敗したファイルは削除する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalArtifact {
    path: PathBuf,
}

impl LocalArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// ダウンロード途中のデータを書き込む一時ファイルのパス
    pub fn partial_path(&self) -> PathBuf {
        let mut name: OsString = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".part");
        self.path.with_file_name(name)
    }

    /// ファイル内容のSHA256を計算
    pub fn sha256(&self) -> io::Result<String> {
        digest::sha256_file(&self.path)
    }

    /// ファイルと一時ファイルを削除する。存在しない場合は何もしない
    pub fn remove(&self) -> io::Result<()> {
        for path in [self.path.clone(), self.partial_path()] {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
