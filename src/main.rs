// Wortmann CSV 导入命令行入口。
//
// Usage:
//   cargo run --bin wortmann-import -- <file.csv> [db_path]
//
// 读取 cp1252 编码的 Wortmann CSV 文件，对 SQLite 库执行导入，
// 并在 stdout 打印导入报告。

use std::process::ExitCode;
use wortmann_invoice_import::domain::report::ImportStatus;
use wortmann_invoice_import::{logging, ImportApi};

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let mut args = std::env::args().skip(1);
    let file_path = match args.next() {
        Some(p) => p,
        None => {
            eprintln!("用法: wortmann-import <file.csv> [db_path]");
            return ExitCode::from(2);
        }
    };
    let db_path = args.next().unwrap_or_else(|| "wortmann_invoices.db".to_string());

    let file_bytes = match std::fs::read(&file_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("读取文件失败 {}: {}", file_path, e);
            return ExitCode::from(2);
        }
    };

    let file_name = std::path::Path::new(&file_path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(&file_path)
        .to_string();

    let api = ImportApi::new(db_path);
    let report = api.submit_import(file_bytes, &file_name).await;

    println!(
        "status={} total={} created={} skipped={} rejected={}",
        report.status.as_str(),
        report.total_rows,
        report.created,
        report.skipped,
        report.rejected
    );
    println!("{}", report.message);

    match report.status {
        ImportStatus::Success => ExitCode::SUCCESS,
        ImportStatus::Partial => ExitCode::from(1),
        ImportStatus::Failed => ExitCode::from(2),
    }
}
