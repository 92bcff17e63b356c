//! ターゲットアクセスのエラー型

use crate::ThreadId;
use std::path::PathBuf;
use thiserror::Error;

/// ターゲットプロセスへのアクセスで発生するエラー
#[derive(Debug, Error)]
pub enum TargetError {
    /// スレッドを停止（アタッチ）できなかった
    #[error("failed to attach to thread {tid}: {reason}")]
    Attach { tid: ThreadId, reason: String },

    /// 停止後のレジスタ取得に失敗した
    #[error("failed to read registers of thread {tid}: {reason}")]
    Read { tid: ThreadId, reason: String },

    /// /proc 配下のファイルを開けない、または読めない
    #[error("failed to {context} {}", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TargetError {
    /// I/O エラーに操作内容とパスを付与する
    pub fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.into(),
            source,
        }
    }
}

// 一度開けなかったメモリビューの失敗を、領域ごとに同じ内容で報告するため
impl Clone for TargetError {
    fn clone(&self) -> Self {
        match self {
            Self::Attach { tid, reason } => Self::Attach {
                tid: *tid,
                reason: reason.clone(),
            },
            Self::Read { tid, reason } => Self::Read {
                tid: *tid,
                reason: reason.clone(),
            },
            Self::Io {
                context,
                path,
                source,
            } => {
                let source = match source.raw_os_error() {
                    Some(code) => std::io::Error::from_raw_os_error(code),
                    None => std::io::Error::new(source.kind(), source.to_string()),
                };
                Self::io(context, path.clone(), source)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_display_includes_context() {
        let err = TargetError::io(
            "open",
            "/proc/1/mem",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        // OS エラーはメッセージに重複させず source() で辿る
        assert_eq!(err.to_string(), "failed to open /proc/1/mem");
        assert!(err.source().is_some());

        let err = TargetError::Attach {
            tid: 42,
            reason: "EPERM: Operation not permitted".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to attach to thread 42: EPERM: Operation not permitted"
        );
    }

    #[test]
    fn test_clone_keeps_os_error() {
        let err = TargetError::io(
            "open",
            "/proc/10/mem",
            std::io::Error::from_raw_os_error(13),
        );
        let copy = err.clone();
        assert_eq!(copy.to_string(), err.to_string());
        match copy {
            TargetError::Io { source, .. } => assert_eq!(source.raw_os_error(), Some(13)),
            other => panic!("Expected Io error, got {:?}", other),
        }
    }
}
