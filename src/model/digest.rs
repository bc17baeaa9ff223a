//! モデルファイルのSHA256ダイジェスト計算と検証
//!
//! アルゴリズムは信頼境界なので設定では変更できない。

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// 一度に読み込むチャンクサイズ
pub const CHUNK_SIZE: usize = 8192;

/// ストリーム全体のSHA256を小文字16進数で返す
///
/// チャンク単位で読むため、ファイルサイズに関わらずメモリ使用量は一定。
pub fn sha256_hex<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; CHUNK_SIZE];
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// ファイルのSHA256を計算
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    sha256_hex(file)
}

/// 計算値と期待値を比較する
///
/// 期待値は前後の空白を除いて小文字に正規化してから比較する。
pub fn digest_matches(actual: &str, expected: &str) -> bool {
    let expected = expected.trim().to_ascii_lowercase();
    !expected.is_empty() && actual == expected
}
