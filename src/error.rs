//! モデル取得・推論のエラー型

use thiserror::Error;

/// モデル読み込み処理の結果型
pub type LoadResult<T> = Result<T, LoadError>;

/// 推論処理の結果型
pub type InferenceResult<T> = Result<T, InferenceError>;

/// モデル取得パイプラインのエラー
///
/// どの段階で失敗しても自動リトライは行わず、呼び出し側にそのまま返す。
#[derive(Error, Debug)]
pub enum LoadError {
    /// 非成功ステータス、空のレスポンス、通信エラー
    #[error("Network error: {0}")]
    Network(String),

    /// メタデータJSONの形式不正
    #[error("Metadata parse error: {0}")]
    Parse(String),

    /// メタデータに必須項目がない
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// ダイジェスト不一致。該当ファイルは削除済み
    #[error("SHA256 mismatch! Expected: {expected}, Actual: {actual}")]
    Integrity { expected: String, actual: String },

    /// 推論ランタイム側のモデル読み込み失敗
    #[error("Engine failed to load model: {0}")]
    EngineLoad(String),

    /// ベースURLやオブジェクトパスが不正
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::Metadata(msg.into())
    }

    pub fn engine_load(msg: impl Into<String>) -> Self {
        Self::EngineLoad(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// 整合性検証の失敗かどうか
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, Self::Integrity { .. })
    }
}

/// 推論処理のエラー
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("Model not loaded")]
    NotLoaded,

    #[error("No outputs received from model")]
    EmptyOutput,

    /// ランタイム内部エラーや後処理の失敗をまとめたもの
    #[error("Inference failed: {0}")]
    Failed(String),
}

impl InferenceError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrity_message_contains_both_digests() {
        let err = LoadError::Integrity {
            expected: "aa".to_string(),
            actual: "bb".to_string(),
        };
        assert!(err.is_integrity_failure());
        assert_eq!(err.to_string(), "SHA256 mismatch! Expected: aa, Actual: bb");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: LoadError = io.into();
        assert!(matches!(err, LoadError::Io(_)));
        assert!(!err.is_integrity_failure());
    }
}
