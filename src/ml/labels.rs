//! クラスインデックス -> 表示名の解決

use anyhow::Context;
use std::path::Path;

/// 同梱のImageNet 1000クラスのラベル
const IMAGENET_CLASSES: &str = include_str!("../../assets/imagenet_classes.txt");

/// クラス名を解決する外部コンポーネント
pub trait ClassLabelResolver: Send + Sync {
    /// 解決できない場合は `None`（呼び出し側で汎用ラベルに置き換える）
    fn class_name(&self, index: usize) -> Option<String>;
}

/// 常に `"Class {index}"` を返すリゾルバ
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericLabels;

impl ClassLabelResolver for GenericLabels {
    fn class_name(&self, index: usize) -> Option<String> {
        Some(format!("Class {}", index))
    }
}

/// ラベル一覧によるリゾルバ
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// 1行1ラベルのテキストを読み込む
    ///
    /// 行番号がそのままクラスインデックスになる。途中の空行は未定義のクラスとして
    /// 位置だけ保持し、末尾の空行は取り除く。
    pub fn parse(text: &str) -> Self {
        let mut labels: Vec<String> = text.lines().map(format_label).collect();
        while labels.last().is_some_and(|label| label.is_empty()) {
            labels.pop();
        }
        Self { labels }
    }

    /// 同梱のImageNetラベル
    pub fn imagenet() -> Self {
        Self::parse(IMAGENET_CLASSES)
    }

    /// ラベルファイルを読み込む
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read label file: {}", path.display()))?;
        Ok(Self::parse(&text))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl ClassLabelResolver for LabelTable {
    fn class_name(&self, index: usize) -> Option<String> {
        self.labels
            .get(index)
            .filter(|label| !label.is_empty())
            .cloned()
    }
}

/// `"tench, Tinca tinca"` のような同義語列から先頭の名前だけを取り出す
fn format_label(line: &str) -> String {
    line.split(',').next().unwrap_or(line).trim().to_string()
}
