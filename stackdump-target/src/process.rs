//! 対象プロセスとスレッド列挙

use crate::{maps, MemoryRegion, ProcFs, Result, TargetError, ThreadId};
use std::fs;

/// 観察対象のプロセス
///
/// 外部で稼働しているプロセスを pid で指すだけで、所有はしません。
#[derive(Debug, Clone)]
pub struct Process {
    pid: i32,
    procfs: ProcFs,
}

impl Process {
    /// procfs の位置を指定して作成する
    pub fn with_procfs(pid: i32, procfs: ProcFs) -> Self {
        Self { pid, procfs }
    }

    /// プロセスIDを取得する
    pub fn pid(&self) -> i32 {
        self.pid
    }

    /// スレッドIDを列挙する
    ///
    /// /proc/pid/task のエントリのうち、数字のみからなる名前のディレクトリを
    /// スレッドIDとして返します（昇順）。
    /// 一覧そのものを開けない場合（プロセスが存在しないなど）のみエラーになります。
    pub fn list_threads(&self) -> Result<Vec<ThreadId>> {
        let task_dir = self.procfs.task_dir(self.pid);
        let entries =
            fs::read_dir(&task_dir).map_err(|e| TargetError::io("list", &task_dir, e))?;

        let mut tids = Vec::new();
        for entry in entries {
            // 列挙中に消えたエントリは読み飛ばす
            let Ok(entry) = entry else { continue };

            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                continue;
            }

            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !is_thread_id(name) {
                continue;
            }

            match name.parse::<ThreadId>() {
                Ok(tid) => tids.push(tid),
                Err(e) => tracing::debug!("skipping task entry {}: {}", name, e),
            }
        }

        tids.sort_unstable();
        Ok(tids)
    }

    /// スレッドから見たメモリマップを読み取る
    pub fn thread_regions(&self, tid: ThreadId) -> Result<Vec<MemoryRegion>> {
        maps::read_regions(&self.procfs, self.pid, tid)
    }
}

/// ディレクトリ名がスレッドID（数字のみ）かどうか
pub fn is_thread_id(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_is_thread_id() {
        assert!(is_thread_id("1"));
        assert!(is_thread_id("123456"));

        assert!(!is_thread_id(""));
        assert!(!is_thread_id("."));
        assert!(!is_thread_id(".."));
        assert!(!is_thread_id("12a"));
        assert!(!is_thread_id("-12"));
        assert!(!is_thread_id("+12"));
        assert!(!is_thread_id(" 12"));
    }

    #[test]
    fn test_list_threads_filters_and_sorts() {
        let root = tempfile::tempdir().unwrap();
        let task_dir = root.path().join("100").join("task");
        for name in ["105", "100", "self", "103"] {
            fs::create_dir_all(task_dir.join(name)).unwrap();
        }
        // 数字名でもディレクトリでなければスレッドではない
        fs::write(task_dir.join("999"), b"").unwrap();

        let process = Process::with_procfs(100, ProcFs::new(root.path()));
        assert_eq!(process.list_threads().unwrap(), vec![100, 103, 105]);
    }

    #[test]
    fn test_list_threads_skips_overflowing_names() {
        let root = tempfile::tempdir().unwrap();
        let task_dir = root.path().join("1").join("task");
        fs::create_dir_all(task_dir.join("1")).unwrap();
        fs::create_dir_all(task_dir.join("99999999999999999999")).unwrap();

        let process = Process::with_procfs(1, ProcFs::new(root.path()));
        assert_eq!(process.list_threads().unwrap(), vec![1]);
    }

    #[test]
    fn test_list_threads_missing_process() {
        let root = tempfile::tempdir().unwrap();
        let process = Process::with_procfs(4242, ProcFs::new(root.path()));

        match process.list_threads() {
            Err(TargetError::Io { context, path, .. }) => {
                assert_eq!(context, "list");
                assert_eq!(path, root.path().join("4242").join("task"));
            }
            other => panic!("Expected Io error, got {:?}", other),
        }
    }
}
