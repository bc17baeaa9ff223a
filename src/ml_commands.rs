//! 画面側から呼ばれるモデル操作コマンド
//!
//! 読み込み状態と推論状態を `watch` チャネルで公開し、実処理は tokio タスクで行う。
//! 各コマンドは起動したタスクの `JoinHandle` を返す（要求を受け付けなかった場合は `None`）。

use image::DynamicImage;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::InferenceResult;
use crate::ml::InferenceEngine;
use crate::types::{ClassificationResult, InferenceState, ModelLoadState};

/// モデル未読み込み時の推論要求に対するメッセージ
pub const MODEL_NOT_LOADED_MESSAGE: &str = "Model not loaded yet. Please load model first.";

pub struct MlCommands {
    engine: Arc<InferenceEngine>,
    model_state: Arc<watch::Sender<ModelLoadState>>,
    inference_state: Arc<watch::Sender<InferenceState>>,
}

impl MlCommands {
    pub fn new(engine: Arc<InferenceEngine>) -> Self {
        let (model_state, _) = watch::channel(ModelLoadState::NotLoaded);
        let (inference_state, _) = watch::channel(InferenceState::Idle);
        Self {
            engine,
            model_state: Arc::new(model_state),
            inference_state: Arc::new(inference_state),
        }
    }

    pub fn engine(&self) -> &Arc<InferenceEngine> {
        &self.engine
    }

    /// モデルを読み込む
    ///
    /// 読み込み中に呼ばれた場合は何もしない。
    pub fn load_model(&self) -> Option<JoinHandle<()>> {
        let mut accepted = false;
        self.model_state.send_if_modified(|state| {
            if *state == ModelLoadState::Loading {
                return false;
            }
            *state = ModelLoadState::Loading;
            accepted = true;
            true
        });
        if !accepted {
            tracing::warn!("Model load already in progress, request ignored");
            return None;
        }

        let engine = Arc::clone(&self.engine);
        let model_state = Arc::clone(&self.model_state);
        Some(tokio::spawn(async move {
            let next = match engine.load_model().await {
                Ok(_) => ModelLoadState::Loaded,
                Err(e) => {
                    tracing::error!("Model load failed: {}", e);
                    ModelLoadState::Error(e.to_string())
                }
            };
            model_state.send_replace(next);
        }))
    }

    /// 乱数入力で推論
    pub fn run_random_inference(&self) -> Option<JoinHandle<()>> {
        let engine = Arc::clone(&self.engine);
        self.spawn_inference(async move { engine.run_random_inference().await })
    }

    /// 画像で推論
    pub fn run_image_inference(&self, image: DynamicImage) -> Option<JoinHandle<()>> {
        let engine = Arc::clone(&self.engine);
        self.spawn_inference(async move { engine.run_image_inference(image).await })
    }

    fn spawn_inference<F>(&self, inference: F) -> Option<JoinHandle<()>>
    where
        F: Future<Output = InferenceResult<ClassificationResult>> + Send + 'static,
    {
        if !self.is_model_loaded() {
            self.inference_state
                .send_replace(InferenceState::Error(MODEL_NOT_LOADED_MESSAGE.to_string()));
            return None;
        }

        let mut accepted = false;
        self.inference_state.send_if_modified(|state| {
            if *state == InferenceState::Processing {
                return false;
            }
            *state = InferenceState::Processing;
            accepted = true;
            true
        });
        if !accepted {
            tracing::warn!("Inference already in progress, request ignored");
            return None;
        }

        let inference_state = Arc::clone(&self.inference_state);
        Some(tokio::spawn(async move {
            let next = match inference.await {
                Ok(result) => InferenceState::Success(result),
                Err(e) => {
                    tracing::error!("Inference failed: {}", e);
                    InferenceState::Error(e.to_string())
                }
            };
            inference_state.send_replace(next);
        }))
    }

    /// 推論結果を消去
    pub fn clear_inference_result(&self) {
        self.inference_state.send_replace(InferenceState::Idle);
    }

    pub fn model_load_state(&self) -> ModelLoadState {
        self.model_state.borrow().clone()
    }

    pub fn inference_state(&self) -> InferenceState {
        self.inference_state.borrow().clone()
    }

    pub fn is_model_loaded(&self) -> bool {
        *self.model_state.borrow() == ModelLoadState::Loaded
    }

    pub fn is_processing(&self) -> bool {
        *self.inference_state.borrow() == InferenceState::Processing
    }

    pub fn model_load_status_text(&self) -> String {
        self.model_state.borrow().status_text()
    }

    /// 最小化表示用の（アイコン, 文言）
    pub fn model_load_status_for_minimized(&self) -> (&'static str, &'static str) {
        self.model_state.borrow().minimized_status()
    }

    pub fn subscribe_model_load_state(&self) -> watch::Receiver<ModelLoadState> {
        self.model_state.subscribe()
    }

    pub fn subscribe_inference_state(&self) -> watch::Receiver<InferenceState> {
        self.inference_state.subscribe()
    }
}
