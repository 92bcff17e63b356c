//! メモリマップ（/proc/pid/task/tid/maps）の解析

use crate::{ProcFs, Result, TargetError, ThreadId};
use std::fmt;
use std::fs;

/// スタック領域を示すラベル
///
/// 現行カーネルは `[stack]`、古いカーネルはスレッドごとに `[stack:tid]` を出力する。
pub const STACK_MARKER: &str = "[stack";

/// マッピングのアクセス権
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Permissions {
    pub readable: bool,
    pub writable: bool,
    pub executable: bool,
    pub shared: bool,
}

impl Permissions {
    /// "rw-p" 形式の文字列をパースする
    pub fn parse(s: &str) -> Option<Self> {
        if s.is_empty() || !s.chars().all(|c| matches!(c, 'r' | 'w' | 'x' | 's' | 'p' | '-')) {
            return None;
        }

        let mut chars = s.chars();
        Some(Self {
            readable: chars.next() == Some('r'),
            writable: chars.next() == Some('w'),
            executable: chars.next() == Some('x'),
            shared: chars.next() == Some('s'),
        })
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |on: bool, c: char| if on { c } else { '-' };
        write!(
            f,
            "{}{}{}{}",
            flag(self.readable, 'r'),
            flag(self.writable, 'w'),
            flag(self.executable, 'x'),
            if self.shared { 's' } else { 'p' }
        )
    }
}

/// メモリ領域
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRegion {
    pub start: u64,
    pub end: u64,
    pub permissions: Permissions,
    /// マッピング名（パス、`[heap]` など）。匿名マッピングでは空
    pub label: String,
}

impl MemoryRegion {
    /// 領域のサイズ（バイト数）
    pub fn size(&self) -> u64 {
        self.end - self.start
    }

    /// アドレスが [start, end) に含まれるか
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end
    }

    /// ラベルに `marker` を含むか
    pub fn has_label(&self, marker: &str) -> bool {
        self.label.contains(marker)
    }

    /// スタック領域か
    pub fn is_stack(&self) -> bool {
        self.has_label(STACK_MARKER)
    }
}

/// スレッドのメモリマップを読み取る
///
/// 形式に合わない行は読み飛ばします。
/// ファイルを開けない・読めない場合のみエラーになります。
pub fn read_regions(procfs: &ProcFs, pid: i32, tid: ThreadId) -> Result<Vec<MemoryRegion>> {
    let path = procfs.thread_maps(pid, tid);
    // パスに UTF-8 以外が含まれていても他の行は読めるようにする
    let contents = fs::read(&path).map_err(|e| TargetError::io("read", &path, e))?;
    Ok(parse_maps(&String::from_utf8_lossy(&contents)))
}

/// maps の内容全体をパースする
pub fn parse_maps(contents: &str) -> Vec<MemoryRegion> {
    contents
        .lines()
        .filter_map(|line| {
            let region = parse_line(line);
            if region.is_none() && !line.trim().is_empty() {
                tracing::debug!("skipping malformed maps line: {:?}", line);
            }
            region
        })
        .collect()
}

/// maps の 1 行をパースする
///
/// フォーマット: "address perms offset dev inode pathname"
/// 例: "7ffd4b1c2000-7ffd4b1e3000 rw-p 00000000 00:00 0 [stack]"
///
/// アドレス範囲とアクセス権があれば領域として扱い、
/// inode の後ろに続く残りをラベルとします。
pub fn parse_line(line: &str) -> Option<MemoryRegion> {
    let mut fields = [""; 5];
    let mut rest = line;
    for field in fields.iter_mut() {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        *field = &rest[..end];
        rest = &rest[end..];
    }

    let (start, end) = fields[0].split_once('-')?;
    let start = u64::from_str_radix(start, 16).ok()?;
    let end = u64::from_str_radix(end, 16).ok()?;
    if end < start {
        return None;
    }
    let permissions = Permissions::parse(fields[1])?;

    // inode まで揃っている行だけがラベルを持つ
    let label = if fields[4].is_empty() { "" } else { rest.trim() };

    Some(MemoryRegion {
        start,
        end,
        permissions,
        label: label.to_string(),
    })
}
