//! stackdump ターゲットプロセスアクセス
//!
//! このクレートは、稼働中のプロセスを観察するための低レベル機能を提供します。
//! /proc の読み取り、ptrace によるスレッド停止、レジスタ取得、
//! メモリマップの解析、プロセスメモリの読み取りを行います。
//! ターゲットのメモリやレジスタへの書き込みは一切行いません。

pub mod errors;
pub mod maps;
pub mod memory;
pub mod procfs;
pub mod process;
pub mod registers;
pub mod thread;

pub use errors::TargetError;
pub use maps::{MemoryRegion, Permissions, STACK_MARKER};
pub use memory::Memory;
pub use procfs::ProcFs;
pub use process::Process;
pub use registers::{RegisterSnapshot, Registers};
pub use thread::{with_suspended_thread, SuspendedThread, ThreadId};

/// ターゲットアクセスの結果型
pub type Result<T> = std::result::Result<T, TargetError>;
