//! メモリアクセス機能

use crate::{ProcFs, Result, TargetError};
use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

/// プロセスメモリの読み取り専用ビュー（/proc/pid/mem）
///
/// 一度だけ開いてスレッド間で使い回し、破棄時に閉じます。
/// 読み取り中も対象プロセスは停止しません。
pub struct Memory {
    file: File,
    path: PathBuf,
}

impl Memory {
    /// /proc/pid/mem を読み取り専用で開く
    pub fn open(procfs: &ProcFs, pid: i32) -> Result<Self> {
        Self::open_path(procfs.mem(pid))
    }

    /// 任意のファイルをメモリビューとして開く
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| TargetError::io("open", &path, e))?;
        Ok(Self { file, path })
    }

    /// `start` から `length` バイトを 1 回の位置指定読み取りで読む
    ///
    /// 読み取りが短かった場合（領域の縮小、権限の境界など）は
    /// 実際に読めたバイト数だけを返します。再試行はしません。
    pub fn read_range(&self, start: u64, length: usize) -> Result<Vec<u8>> {
        if length == 0 {
            return Ok(Vec::new());
        }

        // 領域サイズは対象プロセス由来なので、確保できない大きさもエラーで返す
        let mut buffer: Vec<u8> = Vec::new();
        buffer.try_reserve_exact(length).map_err(|e| {
            TargetError::io(
                "allocate read buffer for",
                &self.path,
                io::Error::new(io::ErrorKind::OutOfMemory, e),
            )
        })?;
        buffer.resize(length, 0);
        let nread = self
            .file
            .read_at(&mut buffer, start)
            .map_err(|e| TargetError::io("read", &self.path, e))?;

        if nread < length {
            tracing::debug!(
                "short read at 0x{:x}: {} of {} bytes",
                start,
                nread,
                length
            );
        }
        buffer.truncate(nread);
        Ok(buffer)
    }
}
