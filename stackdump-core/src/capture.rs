//! スレッド単位のスタックキャプチャ

use crate::{Artifact, ArtifactWriter, CaptureError, StackSource};
use stackdump_target::{MemoryRegion, RegisterSnapshot, ThreadId};

/// 読み出したスタックの内容
///
/// 書き出した後は保持しません。
#[derive(Debug, Clone)]
pub struct StackSnapshot {
    pub tid: ThreadId,
    pub region: MemoryRegion,
    /// 実際に読めたバイト列（領域サイズ以下）
    pub bytes: Vec<u8>,
}

/// スタック領域 1 つ分の結果
#[derive(Debug)]
pub struct StackReport {
    pub region: MemoryRegion,
    /// スタックポインタが領域内にあったか（情報のみ）
    pub sp_inside: bool,
    pub outcome: Result<Artifact, CaptureError>,
}

/// スレッド 1 つ分の結果
#[derive(Debug)]
pub struct ThreadReport {
    pub tid: ThreadId,
    pub registers: Option<RegisterSnapshot>,
    pub stacks: Vec<StackReport>,
    /// 停止・レジスタ取得・マップ読み取りの失敗
    pub error: Option<CaptureError>,
}

impl ThreadReport {
    fn new(tid: ThreadId) -> Self {
        Self {
            tid,
            registers: None,
            stacks: Vec::new(),
            error: None,
        }
    }

    fn failed(mut self, error: CaptureError) -> Self {
        tracing::warn!("thread {}: {}", self.tid, error);
        self.error = Some(error);
        self
    }

    /// 書き出したファイル
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.stacks.iter().filter_map(|s| s.outcome.as_ref().ok())
    }

    /// 何らかの失敗があったか
    pub fn has_failures(&self) -> bool {
        self.error.is_some() || self.stacks.iter().any(|s| s.outcome.is_err())
    }
}

/// スレッド単位のキャプチャ
pub struct StackCapture<'a, S> {
    source: &'a S,
    writer: &'a ArtifactWriter,
    stack_marker: &'a str,
}

impl<'a, S: StackSource> StackCapture<'a, S> {
    pub fn new(source: &'a S, writer: &'a ArtifactWriter, stack_marker: &'a str) -> Self {
        Self {
            source,
            writer,
            stack_marker,
        }
    }

    /// 1 スレッドのスタックを書き出す
    ///
    /// 失敗はレポートに記録して返し、呼び出し元には伝播しません。
    /// スタック領域が見つからないスレッドは、ファイルもエラーもない空のレポートになります。
    pub fn capture(&self, tid: ThreadId) -> ThreadReport {
        let mut report = ThreadReport::new(tid);

        // レジスタは停止中に取得し、マップの読み取りより前に確定させる
        let registers = match self.source.read_registers(tid) {
            Ok(registers) => registers,
            Err(e) => return report.failed(e.into()),
        };
        report.registers = Some(registers);

        let regions = match self.source.read_regions(tid) {
            Ok(regions) => regions,
            Err(e) => return report.failed(e.into()),
        };

        let stacks = regions
            .into_iter()
            .filter(|region| region.has_label(self.stack_marker));
        for (index, region) in stacks.enumerate() {
            let sp_inside = region.contains(registers.stack_pointer);
            let outcome = self.extract(tid, &region, index);
            if let Err(e) = &outcome {
                tracing::warn!(
                    "thread {}: stack 0x{:x}-0x{:x}: {}",
                    tid,
                    region.start,
                    region.end,
                    e
                );
            }
            report.stacks.push(StackReport {
                region,
                sp_inside,
                outcome,
            });
        }

        report
    }

    fn extract(
        &self,
        tid: ThreadId,
        region: &MemoryRegion,
        index: usize,
    ) -> Result<Artifact, CaptureError> {
        let length = usize::try_from(region.size()).map_err(|_| CaptureError::RegionTooLarge {
            start: region.start,
            end: region.end,
        })?;

        let mut bytes = self.source.read_range(region.start, length)?;
        // 要求より長く返ってきても領域外は保存しない
        bytes.truncate(length);

        let snapshot = StackSnapshot {
            tid,
            region: region.clone(),
            bytes,
        };
        self.writer.write(self.source.pid(), &snapshot, index)
    }
}
