//! モデル取得と推論を束ねるサービス
//!
//! 読み込み手順（各段階で失敗したら即座に終了）:
//! 1. メタデータ（latest.json）を取得
//! 2. `objects["model"]` からモデルの相対パスを決定
//! 3. モデルを固定のローカルパスへダウンロード（既存ファイルは上書き）
//! 4. SHA256を検証し、不一致ならファイルを削除して失敗
//! 5. 検証済みファイルを推論ランタイムに読み込ませて有効化
//!
//! 有効なモデルは常に1つだけで、差し替えは読み込み処理だけが行う。
//! 読み込み要求は内部のミューテックスで直列化され、到着順に1つずつ実行される。

use image::DynamicImage;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use tokio::sync::Mutex;

use crate::error::{InferenceError, InferenceResult, LoadError, LoadResult};
use crate::ml::backend::{InferenceBackend, InputTensor, LoadedModel};
use crate::ml::labels::{ClassLabelResolver, GenericLabels, LabelTable};
use crate::ml::postprocess::build_classification_result;
use crate::ml::preprocess::{image_input, load_image_input, random_input};
use crate::model::{digest_matches, AppConfig, LocalArtifact, RemoteModelFetcher};
use crate::types::{ClassificationResult, InputType};

/// 有効化されたモデルの情報
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadedModelInfo {
    pub local_path: PathBuf,
    pub digest: String,
    pub model_name: Option<String>,
    pub version: Option<String>,
    pub size_bytes: u64,
    /// 有効化した時刻（RFC 3339）
    pub loaded_at: String,
}

struct ActiveModel {
    model: Arc<dyn LoadedModel>,
    info: LoadedModelInfo,
}

/// 推論エンジン
pub struct InferenceEngine {
    config: AppConfig,
    fetcher: RemoteModelFetcher,
    backend: Arc<dyn InferenceBackend>,
    labels: Arc<dyn ClassLabelResolver>,
    active: RwLock<Option<ActiveModel>>,
    load_lock: Mutex<()>,
}

impl InferenceEngine {
    pub fn new(
        config: AppConfig,
        backend: Arc<dyn InferenceBackend>,
        labels: Arc<dyn ClassLabelResolver>,
    ) -> LoadResult<Self> {
        let fetcher = RemoteModelFetcher::new(&config.network)?;
        Ok(Self {
            config,
            fetcher,
            backend,
            labels,
            active: RwLock::new(None),
            load_lock: Mutex::new(()),
        })
    }

    /// 設定の `labels_path` からラベルを読み込んで初期化
    ///
    /// 未指定なら同梱のImageNetラベルを使う。ラベルファイルが読めない場合は汎用ラベルで続行する。
    pub fn from_config(config: AppConfig, backend: Arc<dyn InferenceBackend>) -> LoadResult<Self> {
        let labels: Arc<dyn ClassLabelResolver> = match &config.labels_path {
            Some(path) => match LabelTable::from_file(path) {
                Ok(table) => {
                    tracing::info!("ラベルを読み込みました: {} ({}件)", path.display(), table.len());
                    Arc::new(table)
                }
                Err(e) => {
                    tracing::warn!("ラベルファイルを読み込めません: {:#}。汎用ラベルを使用します", e);
                    Arc::new(GenericLabels)
                }
            },
            None => Arc::new(LabelTable::imagenet()),
        };
        Self::new(config, backend, labels)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// ダウンロードしたモデルの保存先
    pub fn local_model_path(&self) -> PathBuf {
        self.config.local_model_path()
    }

    pub fn is_model_loaded(&self) -> bool {
        self.read_active().is_some()
    }

    /// 有効なモデルの情報
    pub fn loaded_model_info(&self) -> Option<LoadedModelInfo> {
        self.read_active().as_ref().map(|active| active.info.clone())
    }

    /// モデルを取得・検証して有効化する
    ///
    /// 呼び出すたびにメタデータとモデルを取得し直す。開始時点で現在のモデルは無効化される。
    pub async fn load_model(&self) -> LoadResult<LoadedModelInfo> {
        let _guard = self.load_lock.lock().await;
        self.deactivate();

        tracing::info!("Starting model load process");

        let metadata_url = self.config.metadata_url()?;
        tracing::debug!(%metadata_url, "Downloading metadata");
        let metadata = self.fetcher.fetch_metadata(&metadata_url).await?;

        let remote_path = metadata
            .model_object()
            .ok_or_else(|| LoadError::metadata("Model path not found in metadata."))?;
        let model_url = self.config.object_url(remote_path)?;

        let artifact = LocalArtifact::new(self.config.local_model_path());
        tracing::info!(%model_url, path = %artifact.path().display(), "Downloading model");
        let size_bytes = self.fetcher.fetch_artifact(&model_url, artifact.path()).await?;

        let hashed = artifact.clone();
        let actual = tokio::task::spawn_blocking(move || hashed.sha256())
            .await
            .map_err(|e| LoadError::Io(std::io::Error::other(e)))??;

        if !digest_matches(&actual, &metadata.digest) {
            tracing::error!(expected = %metadata.digest, %actual, "SHA256 mismatch, removing downloaded model");
            if let Err(e) = artifact.remove() {
                tracing::warn!("検証に失敗したモデルを削除できません: {}", e);
            }
            return Err(LoadError::Integrity {
                expected: metadata.digest,
                actual,
            });
        }
        tracing::info!("SHA256 verification successful");

        let model = self.activate(artifact.path()).await?;
        let info = LoadedModelInfo {
            local_path: artifact.path().to_path_buf(),
            digest: actual,
            model_name: metadata.model_name,
            version: metadata.version,
            size_bytes,
            loaded_at: chrono::Local::now().to_rfc3339(),
        };

        *self.write_active() = Some(ActiveModel {
            model,
            info: info.clone(),
        });
        tracing::info!(
            model = info.model_name.as_deref().unwrap_or("<unnamed>"),
            version = info.version.as_deref().unwrap_or("-"),
            size_bytes,
            "Model loaded successfully"
        );
        Ok(info)
    }

    async fn activate(&self, path: &Path) -> LoadResult<Arc<dyn LoadedModel>> {
        let backend = Arc::clone(&self.backend);
        let path = path.to_path_buf();
        let model = tokio::task::spawn_blocking(move || backend.load(&path))
            .await
            .map_err(|e| LoadError::engine_load(e.to_string()))?
            .map_err(|e| LoadError::engine_load(format!("{:#}", e)))?;
        Ok(Arc::from(model))
    }

    /// 乱数入力で推論
    pub async fn run_random_inference(&self) -> InferenceResult<ClassificationResult> {
        let model = self.current_model()?;
        let input = tokio::task::spawn_blocking(random_input)
            .await
            .map_err(|e| InferenceError::failed(e.to_string()))?;
        self.classify_with(model, input, InputType::Random).await
    }

    /// 画像で推論
    pub async fn run_image_inference(
        &self,
        image: DynamicImage,
    ) -> InferenceResult<ClassificationResult> {
        let model = self.current_model()?;
        let input = tokio::task::spawn_blocking(move || image_input(&image))
            .await
            .map_err(|e| InferenceError::failed(e.to_string()))?;
        self.classify_with(model, input, InputType::Image).await
    }

    /// 画像ファイルを読み込んで推論
    pub async fn run_image_file_inference(
        &self,
        path: impl Into<PathBuf>,
    ) -> InferenceResult<ClassificationResult> {
        let model = self.current_model()?;
        let path = path.into();
        let input = tokio::task::spawn_blocking(move || load_image_input(&path))
            .await
            .map_err(|e| InferenceError::failed(e.to_string()))?
            .map_err(|e| InferenceError::failed(format!("{:#}", e)))?;
        self.classify_with(model, input, InputType::Image).await
    }

    /// 前処理済みの入力で推論
    pub async fn classify(
        &self,
        input: InputTensor,
        input_type: InputType,
    ) -> InferenceResult<ClassificationResult> {
        let model = self.current_model()?;
        self.classify_with(model, input, input_type).await
    }

    async fn classify_with(
        &self,
        model: Arc<dyn LoadedModel>,
        input: InputTensor,
        input_type: InputType,
    ) -> InferenceResult<ClassificationResult> {
        let labels = Arc::clone(&self.labels);
        tracing::debug!(input_type = %input_type, "Running inference");

        tokio::task::spawn_blocking(move || {
            let start = Instant::now();
            let outputs = model
                .forward(&input)
                .map_err(|e| InferenceError::failed(format!("{:#}", e)))?;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            tracing::info!(elapsed_ms, outputs = outputs.len(), "Inference completed");

            let result =
                build_classification_result(outputs, elapsed_ms, input_type, labels.as_ref())?;
            if let Some(top) = result.top_prediction() {
                tracing::info!(
                    class = %top.class_name,
                    confidence = top.confidence_percentage,
                    "Top prediction"
                );
            }
            Ok(result)
        })
        .await
        .map_err(|e| InferenceError::failed(e.to_string()))?
    }

    fn current_model(&self) -> InferenceResult<Arc<dyn LoadedModel>> {
        self.read_active()
            .as_ref()
            .map(|active| Arc::clone(&active.model))
            .ok_or(InferenceError::NotLoaded)
    }

    fn deactivate(&self) {
        if self.write_active().take().is_some() {
            tracing::debug!("Previous model deactivated");
        }
    }

    fn read_active(&self) -> RwLockReadGuard<'_, Option<ActiveModel>> {
        self.active.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_active(&self) -> RwLockWriteGuard<'_, Option<ActiveModel>> {
        self.active.write().unwrap_or_else(PoisonError::into_inner)
    }
}
