//! アプリケーション設定管理モジュール
//!
//! オブジェクトストアのURLや保存先、タイムアウトなどをJSON形式で保存・読み込みします。
//! ベースURLの既定値はビルド時の環境変数 `MODEL_STORE_BASE_URL` から埋め込まれます。

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::{LoadError, LoadResult};

/// ビルド時に指定がない場合のベースURL（エミュレータからホストのMinIOを参照）
const FALLBACK_BASE_URL: &str = "http://10.0.2.2:9000/mlops-test/";

/// ビルド時に埋め込まれたベースURL
pub fn default_base_url() -> String {
    option_env!("MODEL_STORE_BASE_URL")
        .unwrap_or(FALLBACK_BASE_URL)
        .to_string()
}

/// リモートのオブジェクトストア設定
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteSettings {
    /// ベースURL（末尾の `/` まで含める）
    pub base_url: String,
    /// ベースURLからのメタデータの相対パス
    pub metadata_path: String,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            metadata_path: "models/latest.json".to_string(),
        }
    }
}

/// ダウンロードしたモデルの保存先
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageSettings {
    pub model_dir: PathBuf,
    /// 読み込みのたびに上書きされる固定ファイル名
    pub local_file_name: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            local_file_name: "downloaded_model.pte".to_string(),
        }
    }
}

/// 通信設定
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkSettings {
    pub connect_timeout_secs: u64,
    /// 1リクエスト全体（ボディ受信を含む）のタイムアウト
    pub request_timeout_secs: u64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            request_timeout_secs: 300,
        }
    }
}

impl NetworkSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// アプリケーション設定
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub remote: RemoteSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub network: NetworkSettings,
    /// クラスラベルファイル（1行1ラベル）
    #[serde(default)]
    pub labels_path: Option<PathBuf>,
}

impl AppConfig {
    /// 設定を読み込む
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// 指定パスから設定を読み込む、存在しないか壊れている場合はデフォルト設定を返す
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("設定ファイルが存在しません。デフォルト設定を使用します");
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => {
                tracing::info!("設定ファイルを読み込みました: {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!(
                    "設定ファイルの読み込みに失敗しました ({}): {:#}。デフォルト設定を使用します",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// 設定を保存する
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// ベースURLに相対パスを連結したURL
    pub fn object_url(&self, relative_path: &str) -> LoadResult<Url> {
        let joined = format!("{}{}", self.remote.base_url, relative_path);
        Url::parse(&joined).map_err(|e| LoadError::config(format!("invalid URL {joined}: {e}")))
    }

    /// メタデータのURL
    pub fn metadata_url(&self) -> LoadResult<Url> {
        self.object_url(&self.remote.metadata_path)
    }

    /// ダウンロードしたモデルのローカルパス
    pub fn local_model_path(&self) -> PathBuf {
        self.storage.model_dir.join(&self.storage.local_file_name)
    }
}
