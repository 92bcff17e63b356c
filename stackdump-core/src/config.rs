//! キャプチャ設定

use stackdump_target::{ProcFs, STACK_MARKER};
use std::path::PathBuf;

/// キャプチャ設定
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// 出力ファイルを書き出すディレクトリ
    pub output_dir: PathBuf,
    /// スタック領域と見なすラベルの部分文字列
    pub stack_marker: String,
    /// procfs のマウント位置
    pub procfs: ProcFs,
}

impl CaptureConfig {
    pub fn with_output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_procfs(mut self, procfs: ProcFs) -> Self {
        self.procfs = procfs;
        self
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            stack_marker: STACK_MARKER.to_string(),
            procfs: ProcFs::default(),
        }
    }
}
