pub mod error;
pub mod types;
pub mod ml_commands;

// モデル配布（メタデータ・ダウンロード・検証）
pub mod model;
// 推論（前処理・後処理・エンジン）
pub mod ml;

pub use error::{InferenceError, InferenceResult, LoadError, LoadResult};
pub use ml::{
    ClassLabelResolver, GenericLabels, InferenceBackend, InferenceEngine, InputTensor,
    LabelTable, LoadedModel, LoadedModelInfo, OutputTensor,
};
pub use ml_commands::MlCommands;
pub use model::{AppConfig, ModelMetadata};
pub use types::{
    ClassificationPrediction, ClassificationResult, ClassificationStatistics, InferenceState,
    InputType, ModelLoadState,
};
