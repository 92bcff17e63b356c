//! レジスタアクセス機能

use crate::{Result, TargetError, ThreadId};

/// 停止した瞬間のレジスタ値
///
/// スレッドを再開した後は実際の状態と一致しているとは限りません。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterSnapshot {
    pub stack_pointer: u64,
    pub program_counter: u64,
}

/// レジスタアクセス
///
/// 停止中のスレッドからのみ取得できます（[`crate::SuspendedThread::registers`]）。
pub struct Registers {
    tid: ThreadId,
}

impl Registers {
    pub(crate) fn new(tid: ThreadId) -> Self {
        Self { tid }
    }

    /// スタックポインタとプログラムカウンタを読み取る
    pub fn snapshot(&self) -> Result<RegisterSnapshot> {
        read_snapshot(self.tid)
    }
}

#[cfg(any(
    target_arch = "x86_64",
    all(target_arch = "aarch64", target_env = "gnu")
))]
fn read_error(tid: ThreadId, e: nix::Error) -> TargetError {
    TargetError::Read {
        tid,
        reason: e.to_string(),
    }
}

#[cfg(target_arch = "x86_64")]
fn read_snapshot(tid: ThreadId) -> Result<RegisterSnapshot> {
    let regs = nix::sys::ptrace::getregs(nix::unistd::Pid::from_raw(tid))
        .map_err(|e| read_error(tid, e))?;
    Ok(RegisterSnapshot {
        stack_pointer: regs.rsp,
        program_counter: regs.rip,
    })
}

// aarch64 では PTRACE_GETREGSET(NT_PRSTATUS) 経由で user_pt_regs を取得する
#[cfg(all(target_arch = "aarch64", target_env = "gnu"))]
fn read_snapshot(tid: ThreadId) -> Result<RegisterSnapshot> {
    let regs = nix::sys::ptrace::getregs(nix::unistd::Pid::from_raw(tid))
        .map_err(|e| read_error(tid, e))?;
    Ok(RegisterSnapshot {
        stack_pointer: regs.sp,
        program_counter: regs.pc,
    })
}

#[cfg(not(any(
    target_arch = "x86_64",
    all(target_arch = "aarch64", target_env = "gnu")
)))]
fn read_snapshot(tid: ThreadId) -> Result<RegisterSnapshot> {
    Err(TargetError::Read {
        tid,
        reason: format!("unsupported architecture: {}", std::env::consts::ARCH),
    })
}
