use serde::{Deserialize, Serialize};

/// 推論の入力種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputType {
    Random,
    Image,
}

impl InputType {
    /// 結果に記録される表示名
    pub fn display_name(&self) -> &'static str {
        match self {
            InputType::Random => "Random Test Data",
            InputType::Image => "Real Image",
        }
    }
}

impl std::fmt::Display for InputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// 1クラス分の予測
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationPrediction {
    pub class_index: usize,
    pub class_name: String,
    /// 0.0〜1.0
    pub confidence: f32,
    /// confidence × 100
    pub confidence_percentage: f32,
}

impl ClassificationPrediction {
    pub fn new(class_index: usize, class_name: String, confidence: f32) -> Self {
        Self {
            class_index,
            class_name,
            confidence,
            confidence_percentage: confidence * 100.0,
        }
    }
}

/// 確率分布全体の統計値
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationStatistics {
    pub min_confidence: f32,
    pub max_confidence: f32,
    pub mean_confidence: f32,
    /// 常に max_confidence と等しい
    pub top_confidence: f32,
}

/// 分類結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// 信頼度の降順、最大5件
    pub predictions: Vec<ClassificationPrediction>,
    pub inference_time_ms: u64,
    pub input_type: String,
    pub output_shape: Vec<usize>,
    pub is_shape_correct: bool,
    pub statistics: ClassificationStatistics,
}

impl ClassificationResult {
    /// 最上位の予測
    pub fn top_prediction(&self) -> Option<&ClassificationPrediction> {
        self.predictions.first()
    }
}

// モデル読み込みの状態
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelLoadState {
    NotLoaded,
    Loading,
    Loaded,
    Error(String),
}

impl ModelLoadState {
    pub fn status_text(&self) -> String {
        match self {
            ModelLoadState::NotLoaded => "Model not loaded yet".to_string(),
            ModelLoadState::Loading => "Loading model...".to_string(),
            ModelLoadState::Loaded => "✅ Model loaded successfully!".to_string(),
            ModelLoadState::Error(message) => format!("❌ {}", message),
        }
    }

    /// 折りたたみ表示用の (アイコン, ラベル)
    pub fn minimized_status(&self) -> (&'static str, &'static str) {
        match self {
            ModelLoadState::NotLoaded => ("⏳", "Not Loaded"),
            ModelLoadState::Loading => ("⏳", "Loading..."),
            ModelLoadState::Loaded => ("✅", "Model Loaded"),
            ModelLoadState::Error(_) => ("❌", "Load Failed"),
        }
    }
}

// 推論の状態
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InferenceState {
    Idle,
    Processing,
    Success(ClassificationResult),
    Error(String),
}
