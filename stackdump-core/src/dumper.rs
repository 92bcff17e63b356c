//! 全スレッドのスタック書き出し

use crate::{
    ArtifactWriter, CaptureConfig, LiveSource, Result, StackCapture, StackSource, ThreadReport,
};
use anyhow::Context as _;

/// 実行結果の集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// 列挙したスレッド数
    pub threads: usize,
    /// 1 つ以上ファイルを書き出したスレッド数
    pub captured_threads: usize,
    /// 書き出したファイル数
    pub artifacts: usize,
    /// 何らかの失敗があったスレッド数
    pub failed_threads: usize,
}

impl RunSummary {
    fn record(&mut self, report: &ThreadReport) {
        let artifacts = report.artifacts().count();
        self.artifacts += artifacts;
        if artifacts > 0 {
            self.captured_threads += 1;
        }
        if report.has_failures() {
            self.failed_threads += 1;
        }
    }
}

/// 全スレッドのスタックを順番に書き出す
pub struct StackDumper<S> {
    source: S,
    writer: ArtifactWriter,
    stack_marker: String,
}

impl<S: StackSource> StackDumper<S> {
    pub fn new(source: S, config: &CaptureConfig) -> Self {
        Self {
            source,
            writer: ArtifactWriter::new(&config.output_dir),
            stack_marker: config.stack_marker.clone(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// スレッドを列挙し、1 つずつキャプチャする
    ///
    /// スレッド単位の失敗は `on_report` に渡すレポートに含まれ、処理は続行します。
    /// エラーになるのはスレッドを列挙できなかった場合のみです。
    pub fn run<F>(&self, mut on_report: F) -> Result<RunSummary>
    where
        F: FnMut(&ThreadReport),
    {
        let pid = self.source.pid();
        let tids = self
            .source
            .list_threads()
            .with_context(|| format!("Failed to list threads of process {}", pid))?;
        tracing::debug!("process {} has {} threads", pid, tids.len());

        let capture = StackCapture::new(&self.source, &self.writer, &self.stack_marker);
        let mut summary = RunSummary {
            threads: tids.len(),
            ..RunSummary::default()
        };

        for tid in tids {
            let report = capture.capture(tid);
            summary.record(&report);
            on_report(&report);
        }

        Ok(summary)
    }
}

/// 稼働中のプロセスの全スレッドのスタックを書き出す
///
/// /proc/pid/mem は実行中ずっと開いたままにし、終了時に閉じます。
/// エラーになるのはスレッドを列挙できなかった場合のみです。
pub fn dump_process<F>(pid: i32, config: &CaptureConfig, on_report: F) -> Result<RunSummary>
where
    F: FnMut(&ThreadReport),
{
    let source = LiveSource::open(pid, config.procfs.clone());
    StackDumper::new(source, config).run(on_report)
}
