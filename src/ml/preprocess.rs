//! モデル入力の前処理
//!
//! 画像を 224x224 にリサイズし、ImageNetの平均と標準偏差で正規化した
//! (C, H, W) 順のテンソルを作成します。動作確認用の乱数入力もここで生成します。

use anyhow::Context;
use image::{imageops::FilterType, DynamicImage};
use rand::Rng;
use std::path::Path;

use crate::ml::backend::{InputTensor, IMAGE_SIZE, INPUT_LEN};

/// ImageNetの平均（R, G, B）
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNetの標準偏差（R, G, B）
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// [-1, 1] の一様乱数で埋めた入力
pub fn random_input() -> InputTensor {
    random_input_with(&mut rand::thread_rng())
}

/// 乱数生成器を指定して乱数入力を作成
pub fn random_input_with<R: Rng + ?Sized>(rng: &mut R) -> InputTensor {
    let data: Vec<f32> = (0..INPUT_LEN).map(|_| rng.gen_range(-1.0f32..=1.0)).collect();
    InputTensor::from_vec_unchecked(data)
}

/// 画像を正規化して入力テンソルに変換
///
/// # 引数
/// - `img`: 任意サイズの画像（RGB以外は変換される）
///
/// # 戻り値
/// - 正規化されたRGB画像データ (C, H, W) の順で平坦化
pub fn image_input(img: &DynamicImage) -> InputTensor {
    let size = IMAGE_SIZE as u32;
    let rgb = if img.width() == size && img.height() == size {
        img.to_rgb8()
    } else {
        img.resize_exact(size, size, FilterType::Triangle).to_rgb8()
    };

    let mut data = Vec::with_capacity(INPUT_LEN);

    for channel in 0..3 {
        for y in 0..size {
            for x in 0..size {
                let pixel = rgb.get_pixel(x, y);
                let value = pixel[channel] as f32 / 255.0;
                let normalized = (value - IMAGENET_MEAN[channel]) / IMAGENET_STD[channel];
                data.push(normalized);
            }
        }
    }

    InputTensor::from_vec_unchecked(data)
}

/// 画像ファイルを読み込んで入力テンソルに変換
pub fn load_image_input(path: &Path) -> anyhow::Result<InputTensor> {
    let img = image::open(path)
        .with_context(|| format!("Failed to open image: {}", path.display()))?;
    Ok(image_input(&img))
}
