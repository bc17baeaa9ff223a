//! オブジェクトストアからのメタデータ・モデル取得

use reqwest::Client;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::error::{LoadError, LoadResult};
use crate::model::config::NetworkSettings;
use crate::model::model_metadata::ModelMetadata;
use crate::model::model_storage::LocalArtifact;

/// HTTP経由でメタデータとモデルファイルを取得する
#[derive(Clone)]
pub struct RemoteModelFetcher {
    client: Client,
}

impl RemoteModelFetcher {
    pub fn new(settings: &NetworkSettings) -> LoadResult<Self> {
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.request_timeout())
            .user_agent(concat!("mlops-classifier/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LoadError::network(e.to_string()))?;
        Ok(Self { client })
    }

    async fn get(&self, url: &Url, what: &str) -> LoadResult<reqwest::Response> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| LoadError::network(format!("Failed to download {what}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::network(format!(
                "Failed to download {what}: {} ({url})",
                status.as_u16()
            )));
        }
        Ok(response)
    }

    /// メタデータ（latest.json）を取得して解析する
    pub async fn fetch_metadata(&self, url: &Url) -> LoadResult<ModelMetadata> {
        let response = self.get(url, "metadata").await?;
        let body = response
            .text()
            .await
            .map_err(|e| LoadError::network(format!("Failed to read metadata body: {e}")))?;

        if body.trim().is_empty() {
            return Err(LoadError::network("Empty metadata response."));
        }

        ModelMetadata::from_json_string(&body)
    }

    /// モデルファイルを取得して `destination` に保存する
    ///
    /// ボディは一時ファイルへ逐次書き込み、受信完了後に `destination` へ置き換える。
    /// 途中で失敗した場合は一時ファイルを削除する。戻り値は書き込んだバイト数。
    pub async fn fetch_artifact(&self, url: &Url, destination: &Path) -> LoadResult<u64> {
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let partial = LocalArtifact::new(destination).partial_path();

        let result = self.stream_to_file(url, &partial).await;
        match result {
            Ok(0) => {
                tokio::fs::remove_file(&partial).await.ok();
                Err(LoadError::network("Empty model file response."))
            }
            Ok(written) => {
                tokio::fs::rename(&partial, destination).await?;
                Ok(written)
            }
            Err(e) => {
                tokio::fs::remove_file(&partial).await.ok();
                Err(e)
            }
        }
    }

    async fn stream_to_file(&self, url: &Url, path: &Path) -> LoadResult<u64> {
        let mut response = self.get(url, "model file").await?;
        let mut file = tokio::fs::File::create(path).await?;
        let mut written = 0u64;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| LoadError::network(format!("Failed to read model file body: {e}")))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
}
