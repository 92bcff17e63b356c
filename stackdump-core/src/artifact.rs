//! スタックの書き出し

use crate::{CaptureError, StackSnapshot};
use std::fs;
use std::path::{Path, PathBuf};

/// 書き出したファイル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    /// 書き込んだバイト数（実際に読めたバイト数と一致する）
    pub len: usize,
    /// 領域のサイズ
    pub requested: u64,
}

impl Artifact {
    /// 領域の一部しか読めなかったか
    pub fn is_partial(&self) -> bool {
        (self.len as u64) < self.requested
    }
}

/// 出力ファイル名を決める
///
/// 1 スレッドに複数のスタック領域がある場合、2 つ目以降は
/// `stack_<pid>_<tid>_<n>.bin` になります。
pub fn artifact_name(pid: i32, snapshot: &StackSnapshot, index: usize) -> String {
    if index == 0 {
        format!("stack_{}_{}.bin", pid, snapshot.tid)
    } else {
        format!("stack_{}_{}_{}.bin", pid, snapshot.tid, index)
    }
}

/// スタックをファイルへ書き出す
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// スナップショットの内容をそのまま書き出す
    ///
    /// 一時ファイル（`.part`）に書いてから名前を変えるので、
    /// 書き込み途中のファイルが最終的な名前で残ることはありません。
    /// 同名のファイルは上書きされます。
    pub fn write(
        &self,
        pid: i32,
        snapshot: &StackSnapshot,
        index: usize,
    ) -> Result<Artifact, CaptureError> {
        let name = artifact_name(pid, snapshot, index);
        let path = self.dir.join(&name);
        let part = self.dir.join(format!("{}.part", name));

        let written = fs::write(&part, &snapshot.bytes).and_then(|()| fs::rename(&part, &path));
        if let Err(source) = written {
            let _ = fs::remove_file(&part);
            return Err(CaptureError::Artifact { path, source });
        }

        Ok(Artifact {
            path,
            len: snapshot.bytes.len(),
            requested: snapshot.region.size(),
        })
    }
}
