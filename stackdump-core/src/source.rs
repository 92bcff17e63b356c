//! キャプチャ対象へのアクセス

use stackdump_target::{
    with_suspended_thread, Memory, MemoryRegion, ProcFs, Process, RegisterSnapshot, ThreadId,
};

type TargetResult<T> = stackdump_target::Result<T>;

/// スタックを取り出す対象
///
/// 実プロセスでは [`LiveSource`] が /proc と ptrace を使って実装します。
pub trait StackSource {
    /// 対象プロセスのID
    fn pid(&self) -> i32;

    /// スレッドIDを列挙する
    fn list_threads(&self) -> TargetResult<Vec<ThreadId>>;

    /// スレッドを停止させてレジスタを読み、再開させる
    fn read_registers(&self, tid: ThreadId) -> TargetResult<RegisterSnapshot>;

    /// スレッドのメモリマップを読む
    fn read_regions(&self, tid: ThreadId) -> TargetResult<Vec<MemoryRegion>>;

    /// `start` から最大 `length` バイトを読む
    fn read_range(&self, start: u64, length: usize) -> TargetResult<Vec<u8>>;
}

/// 稼働中のプロセス
///
/// /proc/pid/mem は生成時に一度だけ開き、破棄時に閉じます。
/// 開けなかった場合もスレッドの列挙やレジスタ取得は続け、
/// その失敗を各領域の読み取りエラーとして返します。
pub struct LiveSource {
    process: Process,
    memory: TargetResult<Memory>,
}

impl LiveSource {
    /// プロセスのメモリビューを開く
    pub fn open(pid: i32, procfs: ProcFs) -> Self {
        let memory = Memory::open(&procfs, pid);
        if let Err(e) = &memory {
            tracing::warn!("process {}: {}", pid, e);
        }
        Self {
            process: Process::with_procfs(pid, procfs),
            memory,
        }
    }
}

impl StackSource for LiveSource {
    fn pid(&self) -> i32 {
        self.process.pid()
    }

    fn list_threads(&self) -> TargetResult<Vec<ThreadId>> {
        self.process.list_threads()
    }

    fn read_registers(&self, tid: ThreadId) -> TargetResult<RegisterSnapshot> {
        with_suspended_thread(tid, |thread| thread.registers().snapshot())
    }

    fn read_regions(&self, tid: ThreadId) -> TargetResult<Vec<MemoryRegion>> {
        self.process.thread_regions(tid)
    }

    fn read_range(&self, start: u64, length: usize) -> TargetResult<Vec<u8>> {
        match &self.memory {
            Ok(memory) => memory.read_range(start, length),
            Err(e) => Err(e.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackdump_target::TargetError;
    use std::fs;

    fn fake_procfs(with_mem: Option<&[u8]>) -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        let thread_dir = root.path().join("10").join("task").join("11");
        fs::create_dir_all(&thread_dir).unwrap();
        fs::write(
            thread_dir.join("maps"),
            "1000-2000 rw-p 00000000 00:00 0 [stack]\n",
        )
        .unwrap();
        if let Some(mem) = with_mem {
            fs::write(root.path().join("10").join("mem"), mem).unwrap();
        }
        root
    }

    #[test]
    fn test_missing_memory_view_fails_each_read() {
        let root = fake_procfs(None);
        let source = LiveSource::open(10, ProcFs::new(root.path()));

        // 列挙とマップ読み取りは続けられる
        assert_eq!(source.list_threads().unwrap(), vec![11]);
        assert_eq!(source.read_regions(11).unwrap().len(), 1);

        for _ in 0..2 {
            match source.read_range(0x1000, 0x1000) {
                Err(TargetError::Io { context, path, .. }) => {
                    assert_eq!(context, "open");
                    assert_eq!(path, root.path().join("10").join("mem"));
                }
                other => panic!("Expected Io error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_oversized_range_is_an_error() {
        let root = fake_procfs(Some(&[0u8; 0x2000]));
        let source = LiveSource::open(10, ProcFs::new(root.path()));

        assert_eq!(source.read_range(0x1000, 0x1000).unwrap().len(), 0x1000);
        assert!(matches!(
            source.read_range(0x1000, 0xffff_ffff_ffff_efff),
            Err(TargetError::Io { .. })
        ));
    }
}
