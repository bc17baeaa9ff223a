//! 推論出力の後処理
//!
//! ロジット -> softmax -> 上位5件のランキング -> 統計値、という流れで
//! [`ClassificationResult`] を組み立てる。

use crate::error::{InferenceError, InferenceResult};
use crate::ml::backend::OutputTensor;
use crate::ml::labels::ClassLabelResolver;
use crate::types::{
    ClassificationPrediction, ClassificationResult, ClassificationStatistics, InputType,
};

/// 結果に残す予測の件数
pub const TOP_K: usize = 5;

/// これ以下のクラス数・インデックスのときだけラベルリゾルバを使う（ImageNetの1000クラス）
pub const LABEL_RESOLVER_LIMIT: usize = 1000;

/// softmaxの結果
///
/// 合計が正の有限値にならない入力（NaN/Infを含むなど）では一様分布に置き換える。
#[derive(Debug, Clone, PartialEq)]
pub enum Softmax {
    Normalized(Vec<f32>),
    UniformFallback(Vec<f32>),
}

impl Softmax {
    pub fn probabilities(&self) -> &[f32] {
        match self {
            Softmax::Normalized(p) | Softmax::UniformFallback(p) => p,
        }
    }

    pub fn into_probabilities(self) -> Vec<f32> {
        match self {
            Softmax::Normalized(p) | Softmax::UniformFallback(p) => p,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Softmax::UniformFallback(_))
    }
}

/// 最大値を引いてから指数を取る数値的に安定なsoftmax
pub fn softmax(logits: &[f32]) -> Softmax {
    if logits.is_empty() {
        return Softmax::Normalized(Vec::new());
    }

    let max_logit = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp_values: Vec<f32> = logits
        .iter()
        .map(|&l| ((l - max_logit) as f64).exp() as f32)
        .collect();
    let sum: f32 = exp_values.iter().sum();

    if !(sum > 0.0 && sum.is_finite()) {
        tracing::warn!(sum, len = logits.len(), "Invalid softmax sum, returning uniform distribution");
        let uniform = 1.0 / logits.len() as f32;
        return Softmax::UniformFallback(vec![uniform; logits.len()]);
    }

    Softmax::Normalized(exp_values.into_iter().map(|e| e / sum).collect())
}

/// クラス名の解決結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassLabel {
    /// リゾルバが返した名前
    Resolved(String),
    /// ImageNet以外のモデル: `"Class {index} (Custom Model)"`
    Custom(String),
    /// リゾルバが解決できなかった: `"Class {index}"`
    Fallback(String),
}

impl ClassLabel {
    pub fn into_name(self) -> String {
        match self {
            ClassLabel::Resolved(name) | ClassLabel::Custom(name) | ClassLabel::Fallback(name) => {
                name
            }
        }
    }
}

/// インデックスに対応するクラス名を決める
pub fn resolve_class_label(
    resolver: &dyn ClassLabelResolver,
    index: usize,
    actual_classes: usize,
) -> ClassLabel {
    if index >= LABEL_RESOLVER_LIMIT || actual_classes > LABEL_RESOLVER_LIMIT {
        return ClassLabel::Custom(format!("Class {} (Custom Model)", index));
    }
    match resolver.class_name(index) {
        Some(name) => ClassLabel::Resolved(name),
        None => {
            tracing::warn!(index, "Failed to get class name, using generic label");
            ClassLabel::Fallback(format!("Class {}", index))
        }
    }
}

/// 出力形状から実際のクラス数を求め、[1, クラス数] と一致するか判定する
pub fn check_output_shape(shape: &[usize], output_len: usize) -> (usize, bool) {
    let actual_classes = if shape.len() >= 2 { shape[1] } else { output_len };
    let expected_shape = [1, actual_classes];
    (actual_classes, shape == expected_shape.as_slice())
}

/// 確率分布全体の統計値
pub fn compute_statistics(probabilities: &[f32]) -> ClassificationStatistics {
    if probabilities.is_empty() {
        return ClassificationStatistics {
            min_confidence: 0.0,
            max_confidence: 0.0,
            mean_confidence: 0.0,
            top_confidence: 0.0,
        };
    }

    let min = probabilities.iter().copied().fold(f32::INFINITY, f32::min);
    let max = probabilities.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mean = (probabilities.iter().map(|&p| p as f64).sum::<f64>()
        / probabilities.len() as f64) as f32;

    ClassificationStatistics {
        min_confidence: min,
        max_confidence: max,
        mean_confidence: mean,
        top_confidence: max,
    }
}

/// 信頼度の降順で上位 `k` 件の予測を作る
///
/// 同率の場合は元のインデックス順。ラベル解決は残った件数分だけ行う。
pub fn top_predictions(
    probabilities: &[f32],
    k: usize,
    actual_classes: usize,
    resolver: &dyn ClassLabelResolver,
) -> Vec<ClassificationPrediction> {
    let mut ranked: Vec<usize> = (0..probabilities.len()).collect();
    ranked.sort_by(|&a, &b| probabilities[b].total_cmp(&probabilities[a]));
    ranked.truncate(k);

    ranked
        .into_iter()
        .map(|index| {
            let class_name = resolve_class_label(resolver, index, actual_classes).into_name();
            ClassificationPrediction::new(index, class_name, probabilities[index])
        })
        .collect()
}

/// ランタイムの出力から分類結果を組み立てる
pub fn build_classification_result(
    outputs: Vec<OutputTensor>,
    inference_time_ms: u64,
    input_type: InputType,
    resolver: &dyn ClassLabelResolver,
) -> InferenceResult<ClassificationResult> {
    let output = outputs.into_iter().next().ok_or(InferenceError::EmptyOutput)?;

    tracing::debug!(shape = ?output.shape, len = output.data.len(), "Output tensor received");

    let probabilities = softmax(&output.data).into_probabilities();
    let (actual_classes, is_shape_correct) = check_output_shape(&output.shape, output.data.len());
    if !is_shape_correct {
        tracing::warn!(
            shape = ?output.shape,
            actual_classes,
            "Output shape differs from [1, classes]"
        );
    }

    let predictions = top_predictions(&probabilities, TOP_K, actual_classes, resolver);
    let statistics = compute_statistics(&probabilities);

    Ok(ClassificationResult {
        predictions,
        inference_time_ms,
        input_type: input_type.display_name().to_string(),
        output_shape: output.shape,
        is_shape_correct,
        statistics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::labels::{GenericLabels, LabelTable};

    const EPS: f32 = 1e-6;

    /// どのインデックスも解決できないリゾルバ
    struct FailingLabels;

    impl ClassLabelResolver for FailingLabels {
        fn class_name(&self, _index: usize) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0, -4.0, 0.5]);
        assert!(!probs.is_fallback());
        let sum: f32 = probs.probabilities().iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs.probabilities()[2] > probs.probabilities()[1]);
    }

    #[test]
    fn test_softmax_equal_logits_is_uniform() {
        let probs = softmax(&[3.5; 8]);
        assert!(probs.probabilities().iter().all(|p| (p - 0.125).abs() < EPS));
    }

    #[test]
    fn test_softmax_large_logits_are_stable() {
        let probs = softmax(&[1000.0, 1000.0, 990.0]);
        assert!(!probs.is_fallback());
        assert!(probs.probabilities().iter().all(|p| p.is_finite()));
        assert!((probs.probabilities()[0] - probs.probabilities()[1]).abs() < EPS);
    }

    #[test]
    fn test_softmax_degenerate_input_falls_back_to_uniform() {
        let probs = softmax(&[f32::NAN, 1.0, 2.0, 3.0]);
        assert!(probs.is_fallback());
        assert_eq!(probs.probabilities(), &[0.25; 4]);

        let probs = softmax(&[f32::INFINITY, 1.0]);
        assert!(probs.is_fallback());
        assert_eq!(probs.probabilities(), &[0.5, 0.5]);

        assert!(softmax(&[f32::NEG_INFINITY; 3]).is_fallback());
    }

    #[test]
    fn test_softmax_empty() {
        assert_eq!(softmax(&[]), Softmax::Normalized(Vec::new()));
    }

    #[test]
    fn test_resolve_class_label_branches() {
        let table = LabelTable::new(vec!["tench".to_string()]);
        assert_eq!(
            resolve_class_label(&table, 0, 1000),
            ClassLabel::Resolved("tench".to_string())
        );
        assert_eq!(
            resolve_class_label(&table, 1, 1000),
            ClassLabel::Fallback("Class 1".to_string())
        );
        assert_eq!(
            resolve_class_label(&table, 0, 1001),
            ClassLabel::Custom("Class 0 (Custom Model)".to_string())
        );
        assert_eq!(
            resolve_class_label(&table, 1000, 1000),
            ClassLabel::Custom("Class 1000 (Custom Model)".to_string())
        );
    }

    #[test]
    fn test_check_output_shape() {
        assert_eq!(check_output_shape(&[1, 1000], 1000), (1000, true));
        assert_eq!(check_output_shape(&[1, 998], 998), (998, true));
        assert_eq!(check_output_shape(&[2, 10], 20), (10, false));
        assert_eq!(check_output_shape(&[1, 10, 1], 10), (10, false));
        assert_eq!(check_output_shape(&[1000], 1000), (1000, false));
        assert_eq!(check_output_shape(&[], 4), (4, false));
    }

    #[test]
    fn test_statistics_over_full_distribution() {
        let stats = compute_statistics(&[0.1, 0.2, 0.3, 0.4]);
        assert!((stats.min_confidence - 0.1).abs() < EPS);
        assert!((stats.max_confidence - 0.4).abs() < EPS);
        assert!((stats.mean_confidence - 0.25).abs() < EPS);
        assert_eq!(stats.top_confidence, stats.max_confidence);
    }

    #[test]
    fn test_top_predictions_sorted_and_truncated() {
        let probs = [0.05, 0.3, 0.1, 0.2, 0.15, 0.12, 0.08];
        let predictions = top_predictions(&probs, TOP_K, probs.len(), &GenericLabels);
        let indices: Vec<usize> = predictions.iter().map(|p| p.class_index).collect();
        assert_eq!(indices, vec![1, 3, 4, 5, 2]);
        assert!(predictions
            .windows(2)
            .all(|w| w[0].confidence >= w[1].confidence));
        assert_eq!(predictions[0].class_name, "Class 1");
    }

    #[test]
    fn test_top_predictions_fewer_classes_than_k() {
        let predictions = top_predictions(&[0.7, 0.3], TOP_K, 2, &GenericLabels);
        assert_eq!(predictions.len(), 2);
    }

    #[test]
    fn test_ties_keep_index_order() {
        let predictions = top_predictions(&[0.25; 4], TOP_K, 4, &GenericLabels);
        let indices: Vec<usize> = predictions.iter().map(|p| p.class_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_uniform_imagenet_output() {
        let output = OutputTensor::new(vec![0.0; 1000], vec![1, 1000]);
        let result =
            build_classification_result(vec![output], 12, InputType::Random, &GenericLabels)
                .unwrap();

        assert!(result.is_shape_correct);
        assert_eq!(result.output_shape, vec![1, 1000]);
        assert_eq!(result.predictions.len(), 5);
        assert!(result
            .predictions
            .iter()
            .all(|p| (p.confidence - 0.001).abs() < EPS));
        assert!((result.statistics.min_confidence - 0.001).abs() < EPS);
        assert!((result.statistics.mean_confidence - 0.001).abs() < EPS);
        assert_eq!(result.inference_time_ms, 12);
        assert_eq!(result.input_type, "Random Test Data");
    }

    #[test]
    fn test_label_failures_degrade_to_generic_names() {
        let output = OutputTensor::new(vec![5.0, 1.0, 0.0], vec![1, 3]);
        let result =
            build_classification_result(vec![output], 0, InputType::Image, &FailingLabels)
                .unwrap();
        assert_eq!(result.predictions[0].class_name, "Class 0");
        assert_eq!(result.predictions.len(), 3);
    }

    #[test]
    fn test_custom_model_labels() {
        let logits: Vec<f32> = (0..1200).map(|i| i as f32 / 100.0).collect();
        let output = OutputTensor::new(logits, vec![1, 1200]);
        let result =
            build_classification_result(vec![output], 0, InputType::Image, &GenericLabels)
                .unwrap();
        assert!(result.is_shape_correct);
        assert_eq!(result.predictions[0].class_index, 1199);
        assert_eq!(result.predictions[0].class_name, "Class 1199 (Custom Model)");
    }

    #[test]
    fn test_only_first_output_is_used() {
        let first = OutputTensor::new(vec![0.0, 10.0], vec![1, 2]);
        let second = OutputTensor::new(vec![10.0, 0.0], vec![1, 2]);
        let result =
            build_classification_result(vec![first, second], 0, InputType::Image, &GenericLabels)
                .unwrap();
        assert_eq!(result.predictions[0].class_index, 1);
    }

    #[test]
    fn test_empty_output_list() {
        let err =
            build_classification_result(Vec::new(), 0, InputType::Random, &GenericLabels)
                .unwrap_err();
        assert_eq!(err, InferenceError::EmptyOutput);
    }

    #[test]
    fn test_output_without_values() {
        // クラス数0の出力は予測なし・統計値0の結果になる
        let output = OutputTensor::new(Vec::new(), vec![1, 0]);
        let result =
            build_classification_result(vec![output], 3, InputType::Random, &GenericLabels)
                .unwrap();
        assert!(result.predictions.is_empty());
        assert!(result.is_shape_correct);
        assert_eq!(result.output_shape, vec![1, 0]);
        assert_eq!(result.statistics.max_confidence, 0.0);
        assert_eq!(result.statistics.mean_confidence, 0.0);
        assert_eq!(result.inference_time_ms, 3);
    }
}
