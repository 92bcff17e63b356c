//! stackdump CLI - コマンドラインインターフェース
//!
//! 稼働中のプロセスの全スレッドのスタックをファイルへ書き出す

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use stackdump_core::{CaptureConfig, RunSummary, StackReport, ThreadReport};
use tracing_subscriber::EnvFilter;

/// stackdump - dump every thread's stack of a running process
#[derive(Parser, Debug)]
#[command(name = "stackdump")]
#[command(version)]
#[command(about = "Dump the stack memory of every thread of a running process", long_about = None)]
struct Cli {
    /// Process ID to inspect
    #[arg(value_parser = clap::value_parser!(i32).range(1..))]
    pid: i32,
}

fn main() -> Result<()> {
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                println!("{}", e.render());
                std::process::exit(1);
            }
        },
    };

    let config = CaptureConfig::default();
    tracing::debug!("capturing process {} into {}", cli.pid, config.output_dir.display());
    match stackdump_core::dump_process(cli.pid, &config, print_report) {
        Ok(summary) => print_summary(cli.pid, &summary),
        // 実行全体の失敗も報告のみで、終了コードは 0 のまま
        Err(e) => println!("Error: {:#}", e),
    }

    Ok(())
}

/// RUST_LOG で診断ログを有効にする（既定は warn）
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// スレッドごとの結果を表示する
fn print_report(report: &ThreadReport) {
    let tid = report.tid;

    if let Some(registers) = &report.registers {
        println!("Thread {} PC 0x{:016x}", tid, registers.program_counter);
        println!("Thread {} stack pointer: 0x{:x}", tid, registers.stack_pointer);
    }

    for stack in &report.stacks {
        print_stack(tid, stack);
    }

    if let Some(error) = &report.error {
        println!("Thread {}: {}", tid, error_chain(error));
    }
}

fn print_stack(tid: i32, stack: &StackReport) {
    let region = &stack.region;
    println!(
        "Thread {} stack region: 0x{:x} - 0x{:x}",
        tid, region.start, region.end
    );

    if stack.sp_inside {
        println!("Stack pointer is inside the stack region.");
    } else {
        println!("Stack pointer is outside the stack region.");
    }

    match &stack.outcome {
        Ok(artifact) if artifact.is_partial() => println!(
            "Stack dumped to {} (partial: {} of {} bytes)",
            artifact.path.display(),
            artifact.len,
            artifact.requested
        ),
        Ok(artifact) => println!(
            "Stack dumped to {} ({} bytes)",
            artifact.path.display(),
            artifact.len
        ),
        Err(e) => println!("Thread {}: {}", tid, error_chain(e)),
    }
}

/// エラーを原因までつなげて 1 行にする（anyhow の `{:#}` と同じ形式）
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn print_summary(pid: i32, summary: &RunSummary) {
    println!();
    println!(
        "Process {}: {} threads, {} captured, {} files written, {} failed",
        pid, summary.threads, summary.captured_threads, summary.artifacts, summary.failed_threads
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackdump_core::{CaptureError, TargetError};

    #[test]
    fn test_parse_pid() {
        let cli = Cli::try_parse_from(["stackdump", "1234"]).unwrap();
        assert_eq!(cli.pid, 1234);
    }

    #[test]
    fn test_reject_bad_arguments() {
        assert!(Cli::try_parse_from(["stackdump"]).is_err());
        assert!(Cli::try_parse_from(["stackdump", "abc"]).is_err());
        assert!(Cli::try_parse_from(["stackdump", "0"]).is_err());
        assert!(Cli::try_parse_from(["stackdump", "-5"]).is_err());
        assert!(Cli::try_parse_from(["stackdump", "12", "34"]).is_err());
    }

    #[test]
    fn test_error_chain_includes_cause() {
        let error = CaptureError::from(TargetError::io(
            "open",
            "/proc/42/mem",
            std::io::Error::from_raw_os_error(13),
        ));
        let message = error_chain(&error);
        assert!(message.starts_with("failed to open /proc/42/mem: "));
        assert!(message.contains("Permission denied"));
        // 原因は 1 回だけ表示される
        assert_eq!(message.matches("Permission denied").count(), 1);
    }
}
