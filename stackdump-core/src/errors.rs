//! キャプチャ処理のエラー型

use stackdump_target::TargetError;
use std::path::PathBuf;
use thiserror::Error;

/// 1 スレッド分のキャプチャで発生するエラー
///
/// スレッド単位で報告され、実行全体は止めません。
#[derive(Debug, Error)]
pub enum CaptureError {
    /// アタッチ・レジスタ取得・マップ読み取り・メモリ読み取りの失敗
    #[error(transparent)]
    Target(#[from] TargetError),

    /// 領域がアドレス空間のサイズを超えている
    #[error("stack region 0x{start:x}-0x{end:x} is too large to copy")]
    RegionTooLarge { start: u64, end: u64 },

    /// 出力ファイルの書き込みに失敗した
    #[error("failed to write {}", .path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
