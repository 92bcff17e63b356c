//! スレッド停止制御
//!
//! ptrace で 1 スレッドだけを停止させ、検査が終わったら必ずデタッチします。
//! 停止は [`SuspendedThread`] の生存期間に対応し、`Drop` でデタッチされるため、
//! 検査中にエラーが起きても対象スレッドが止まったまま残ることはありません。
//! 他のスレッドは実行を続けます。

use crate::{Registers, Result, TargetError};
use nix::sys::ptrace;
use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

/// スレッドID
pub type ThreadId = i32;

/// 停止中のスレッド
///
/// 生成 = PTRACE_ATTACH + 停止の確認、破棄 = PTRACE_DETACH。
pub struct SuspendedThread {
    tid: ThreadId,
}

impl SuspendedThread {
    /// スレッドにアタッチし、停止が観測できるまで待機する
    pub fn attach(tid: ThreadId) -> Result<Self> {
        let pid = Pid::from_raw(tid);
        ptrace::attach(pid).map_err(|e| TargetError::Attach {
            tid,
            reason: e.to_string(),
        })?;
        tracing::debug!("attached to thread {}", tid);

        // ここから先の失敗は Drop でデタッチされる
        let thread = Self { tid };
        thread.wait_for_stop()?;
        Ok(thread)
    }

    /// 停止中のスレッドのレジスタアクセスを取得する
    pub fn registers(&self) -> Registers {
        Registers::new(self.tid)
    }

    /// アタッチ時の SIGSTOP による停止を待つ
    ///
    /// 先に別のシグナルで停止した場合は、そのシグナルを渡して実行を続けさせ、
    /// SIGSTOP が届くまで待ち直す。キューに残った SIGSTOP がデタッチ後に
    /// プロセス全体を止めることはない。
    fn wait_for_stop(&self) -> Result<()> {
        let pid = Pid::from_raw(self.tid);
        loop {
            // メインスレッド以外は __WALL がないと待てない
            let status =
                waitpid(pid, Some(WaitPidFlag::__WALL)).map_err(|e| TargetError::Attach {
                    tid: self.tid,
                    reason: format!("waiting for stop: {}", e),
                })?;
            tracing::debug!("thread {} wait status: {:?}", self.tid, status);

            match classify_stop(status) {
                StopAction::Suspended => return Ok(()),
                StopAction::Resume(signal) => {
                    ptrace::cont(pid, signal).map_err(|e| TargetError::Attach {
                        tid: self.tid,
                        reason: format!("resuming before stop: {}", e),
                    })?;
                }
                StopAction::Failed(reason) => {
                    return Err(TargetError::Attach {
                        tid: self.tid,
                        reason,
                    })
                }
            }
        }
    }
}

/// 停止待ちで観測した状態への対応
#[derive(Debug, PartialEq, Eq)]
enum StopAction {
    /// アタッチの SIGSTOP で停止した
    Suspended,
    /// 別の理由で停止したので、シグナルを渡して再開し待ち直す
    Resume(Option<Signal>),
    Failed(String),
}

fn classify_stop(status: WaitStatus) -> StopAction {
    match status {
        WaitStatus::Stopped(_, Signal::SIGSTOP) => StopAction::Suspended,
        WaitStatus::Stopped(_, signal) => StopAction::Resume(Some(signal)),
        WaitStatus::PtraceEvent(..) | WaitStatus::PtraceSyscall(..) => StopAction::Resume(None),
        WaitStatus::Exited(_, code) => {
            StopAction::Failed(format!("thread exited with code {} before stopping", code))
        }
        WaitStatus::Signaled(_, signal, _) => {
            StopAction::Failed(format!("thread killed by {:?} before stopping", signal))
        }
        status => StopAction::Failed(format!("unexpected wait status: {:?}", status)),
    }
}

impl Drop for SuspendedThread {
    fn drop(&mut self) {
        match ptrace::detach(Pid::from_raw(self.tid), None) {
            Ok(()) => tracing::debug!("detached from thread {}", self.tid),
            // 終了済みのスレッドはデタッチできないが問題ない
            Err(e) => tracing::debug!("detach from thread {} failed: {}", self.tid, e),
        }
    }
}

/// スレッドを停止させた状態で `f` を実行する
///
/// `f` の成否にかかわらず、戻る前にスレッドはデタッチ（再開）されます。
/// 停止できなかった場合は [`TargetError::Attach`] を返します。
pub fn with_suspended_thread<T, F>(tid: ThreadId, f: F) -> Result<T>
where
    F: FnOnce(&SuspendedThread) -> Result<T>,
{
    let thread = SuspendedThread::attach(tid)?;
    f(&thread)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn test_classify_stop() {
        let pid = Pid::from_raw(100);
        assert_eq!(
            classify_stop(WaitStatus::Stopped(pid, Signal::SIGSTOP)),
            StopAction::Suspended
        );
        // SIGSTOP より先に届いたシグナルは捨てずに渡す
        assert_eq!(
            classify_stop(WaitStatus::Stopped(pid, Signal::SIGALRM)),
            StopAction::Resume(Some(Signal::SIGALRM))
        );
        assert_eq!(
            classify_stop(WaitStatus::Stopped(pid, Signal::SIGCHLD)),
            StopAction::Resume(Some(Signal::SIGCHLD))
        );
        assert!(matches!(
            classify_stop(WaitStatus::Exited(pid, 3)),
            StopAction::Failed(reason) if reason.contains("exited with code 3")
        ));
        assert!(matches!(
            classify_stop(WaitStatus::Signaled(pid, Signal::SIGKILL, false)),
            StopAction::Failed(reason) if reason.contains("SIGKILL")
        ));
        assert!(matches!(
            classify_stop(WaitStatus::StillAlive),
            StopAction::Failed(_)
        ));
    }

    #[test]
    fn test_attach_missing_thread() {
        // pid_max は i32::MAX より小さいので、このIDのスレッドは存在しない
        let result = with_suspended_thread(i32::MAX, |_| Ok(()));
        match result {
            Err(TargetError::Attach { tid, .. }) => assert_eq!(tid, i32::MAX),
            Err(e) => panic!("Expected Attach error, got {}", e),
            Ok(()) => panic!("Attach to a missing thread should fail"),
        }
    }

    #[test]
    #[ignore = "requires ptrace permission over child processes"]
    fn test_thread_resumes_after_failing_inspection() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let tid = child.id() as ThreadId;

        let result: Result<()> = with_suspended_thread(tid, |thread| {
            thread.registers().snapshot()?;
            Err(TargetError::Read {
                tid,
                reason: "forced failure".to_string(),
            })
        });
        assert!(matches!(result, Err(TargetError::Read { .. })));

        // デタッチ済みなので再度アタッチできる
        let snapshot = with_suspended_thread(tid, |thread| thread.registers().snapshot()).unwrap();
        assert_ne!(snapshot.stack_pointer, 0);
        assert_ne!(snapshot.program_counter, 0);

        child.kill().unwrap();
        child.wait().unwrap();
    }
}
