//! stackdump のコア機能
//!
//! このクレートは、稼働中のプロセスの全スレッドについてスタック領域を
//! ファイルへ書き出す処理を提供します。
//! スレッド列挙、停止とレジスタ取得、メモリマップからのスタック領域の特定、
//! メモリの読み出しと保存を、スレッドごとに独立して順番に実行します。

pub mod artifact;
pub mod capture;
pub mod config;
pub mod dumper;
pub mod errors;
pub mod source;

pub use artifact::{Artifact, ArtifactWriter};
pub use capture::{StackCapture, StackReport, StackSnapshot, ThreadReport};
pub use config::CaptureConfig;
pub use dumper::{dump_process, RunSummary, StackDumper};
pub use errors::CaptureError;
pub use source::{LiveSource, StackSource};

// 他のクレートから使用するために再エクスポート
pub use stackdump_target::{MemoryRegion, Permissions, RegisterSnapshot, TargetError, ThreadId};

/// コア処理の結果型
pub type Result<T> = anyhow::Result<T>;
