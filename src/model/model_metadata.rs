//! モデルメタデータ（latest.json）の定義
//!
//! オブジェクトストア上のメタデータは以下の形式:
//!
//! ```json
//! { "sha256": "<64桁の16進数>", "objects": { "model": "models/mv2.pte" } }
//! ```
//!
//! 公開スクリプトが書き込む `model_name` / `version` も任意項目として読み込む。
//! それ以外の未知のフィールドは無視する。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{LoadError, LoadResult};

/// `objects` 内でモデル本体を指す論理名
pub const MODEL_OBJECT_KEY: &str = "model";

/// モデルメタデータ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// モデルファイルのSHA256（16進数）
    #[serde(rename = "sha256")]
    pub digest: String,

    /// 論理名 -> ベースURLからの相対パス
    pub objects: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ModelMetadata {
    /// モデル本体の相対パスを取得
    pub fn model_object(&self) -> Option<&str> {
        self.objects.get(MODEL_OBJECT_KEY).map(String::as_str)
    }

    /// JSON文字列からメタデータを生成
    pub fn from_json_string(json: &str) -> LoadResult<Self> {
        serde_json::from_str(json).map_err(|e| LoadError::parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_descriptor() {
        let json = r#"{"sha256":"abc123","objects":{"model":"m.pte"}}"#;
        let metadata = ModelMetadata::from_json_string(json).unwrap();
        assert_eq!(metadata.digest, "abc123");
        assert_eq!(metadata.model_object(), Some("m.pte"));
        assert_eq!(metadata.model_name, None);
    }

    #[test]
    fn test_parse_manifest_with_extra_fields() {
        let json = r#"{
            "model_name": "PersonDetectionQuantized",
            "version": "1.0.0",
            "sha256": "ff00",
            "objects": {"model": "models/mv2_xnnpack.pte", "labels": "models/labels.txt"},
            "metrics": {"top1_accuracy": 0.85}
        }"#;
        let metadata = ModelMetadata::from_json_string(json).unwrap();
        assert_eq!(metadata.model_name.as_deref(), Some("PersonDetectionQuantized"));
        assert_eq!(metadata.version.as_deref(), Some("1.0.0"));
        assert_eq!(metadata.objects.len(), 2);
    }

    #[test]
    fn test_missing_model_object() {
        let json = r#"{"sha256":"abc","objects":{"labels":"l.txt"}}"#;
        let metadata = ModelMetadata::from_json_string(json).unwrap();
        assert_eq!(metadata.model_object(), None);
    }

    #[test]
    fn test_malformed_descriptor_is_parse_error() {
        let err = ModelMetadata::from_json_string(r#"{"objects":{}}"#).unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));

        let err = ModelMetadata::from_json_string("not json").unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
    }

    #[test]
    fn test_serialize_uses_sha256_key() {
        let metadata =
            ModelMetadata::from_json_string(r#"{"sha256":"abc","objects":{"model":"m.pte"}}"#)
                .unwrap();
        let json = serde_json::to_string(&metadata).unwrap();
        assert!(json.contains("\"sha256\":\"abc\""));
        assert!(!json.contains("model_name"));
    }
}
