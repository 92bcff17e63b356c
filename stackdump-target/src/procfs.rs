//! /proc ファイルシステム上のパス解決

use crate::ThreadId;
use std::path::{Path, PathBuf};

/// procfs のマウント位置
///
/// テストでは一時ディレクトリを指すことで、/proc と同じ構造の
/// 偽ツリーを読ませることができます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcFs {
    root: PathBuf,
}

impl ProcFs {
    /// 指定したディレクトリを procfs のルートとして扱う
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// /proc/pid/task
    pub fn task_dir(&self, pid: i32) -> PathBuf {
        self.root.join(pid.to_string()).join("task")
    }

    /// /proc/pid/task/tid/maps
    pub fn thread_maps(&self, pid: i32, tid: ThreadId) -> PathBuf {
        self.task_dir(pid).join(tid.to_string()).join("maps")
    }

    /// /proc/pid/mem
    pub fn mem(&self, pid: i32) -> PathBuf {
        self.root.join(pid.to_string()).join("mem")
    }
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new("/proc")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let procfs = ProcFs::default();
        assert_eq!(procfs.task_dir(1234), PathBuf::from("/proc/1234/task"));
        assert_eq!(
            procfs.thread_maps(1234, 1240),
            PathBuf::from("/proc/1234/task/1240/maps")
        );
        assert_eq!(procfs.mem(1234), PathBuf::from("/proc/1234/mem"));
    }

    #[test]
    fn test_custom_root() {
        let procfs = ProcFs::new("/tmp/fakeproc");
        assert_eq!(procfs.mem(7), PathBuf::from("/tmp/fakeproc/7/mem"));
    }
}
