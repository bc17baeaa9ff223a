//! 推論ランタイムとの境界
//!
//! ニューラルネットの実行自体は外部ランタイムに任せる。
//! ここでは「ファイルからモデルを読み込む」「正規化済みテンソルから出力テンソルを得る」
//! という2つの契約だけを定義する。どちらも同期APIで、呼び出し側がブロッキング
//! スレッド上で実行する。

use anyhow::Result;
use std::path::Path;

/// 入力画像サイズ（正方形）
pub const IMAGE_SIZE: usize = 224;

/// 入力チャネル数（RGB）
pub const NUM_CHANNELS: usize = 3;

/// 入力テンソルの形状 [batch, channels, height, width]
pub const INPUT_SHAPE: [usize; 4] = [1, NUM_CHANNELS, IMAGE_SIZE, IMAGE_SIZE];

/// 入力テンソルの要素数
pub const INPUT_LEN: usize = NUM_CHANNELS * IMAGE_SIZE * IMAGE_SIZE;

/// モデル入力テンソル
///
/// [1, 3, 224, 224] をチャネル優先 (C, H, W) で平坦化したもの。
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    data: Vec<f32>,
}

impl InputTensor {
    /// 要素数が [`INPUT_LEN`] でなければ `None`
    pub fn from_vec(data: Vec<f32>) -> Option<Self> {
        (data.len() == INPUT_LEN).then_some(Self { data })
    }

    pub(crate) fn from_vec_unchecked(data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), INPUT_LEN);
        Self { data }
    }

    pub fn shape(&self) -> [usize; 4] {
        INPUT_SHAPE
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// 1チャネル分（height×width）の値。範囲外のチャネルは `None`
    pub fn channel(&self, channel: usize) -> Option<&[f32]> {
        let plane = IMAGE_SIZE * IMAGE_SIZE;
        let start = channel.checked_mul(plane)?;
        self.data.get(start..start.checked_add(plane)?)
    }
}

/// ランタイムが返す出力テンソル
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTensor {
    pub data: Vec<f32>,
    pub shape: Vec<usize>,
}

impl OutputTensor {
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> Self {
        Self { data, shape }
    }
}

/// 読み込み済みモデル
pub trait LoadedModel: Send + Sync {
    /// 順伝播。出力が1つもない場合は空のVecを返す
    fn forward(&self, input: &InputTensor) -> Result<Vec<OutputTensor>>;
}

/// モデルファイルを読み込む推論ランタイム
pub trait InferenceBackend: Send + Sync {
    fn load(&self, model_path: &Path) -> Result<Box<dyn LoadedModel>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_tensor_requires_exact_length() {
        assert!(InputTensor::from_vec(vec![0.0; INPUT_LEN]).is_some());
        assert!(InputTensor::from_vec(vec![0.0; INPUT_LEN - 1]).is_none());
        assert!(InputTensor::from_vec(Vec::new()).is_none());
    }

    #[test]
    fn test_channel_slices() {
        let plane = IMAGE_SIZE * IMAGE_SIZE;
        let mut data = vec![0.0; INPUT_LEN];
        data[plane..2 * plane].fill(1.0);
        data[2 * plane..].fill(2.0);
        let tensor = InputTensor::from_vec(data).unwrap();

        assert_eq!(tensor.shape(), [1, 3, 224, 224]);
        assert!(tensor.channel(0).unwrap().iter().all(|&v| v == 0.0));
        assert!(tensor.channel(1).unwrap().iter().all(|&v| v == 1.0));
        assert!(tensor.channel(2).unwrap().iter().all(|&v| v == 2.0));
        assert_eq!(tensor.channel(3), None);
        assert_eq!(tensor.channel(usize::MAX), None);
    }
}
