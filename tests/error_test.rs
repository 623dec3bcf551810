//! 错误情形测试
//!
//! 各种错误条件下的错误处理

use payroll_merge::error::PayrollError;
use payroll_merge::scanner;
use payroll_merge_common::pipeline::PipelineStage;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// 扫描不存在的文件夹
#[test]
fn test_scan_nonexistent_folder() {
    let result = scanner::scan_folder(Path::new("/nonexistent/path/12345"));
    assert!(result.is_err());

    let err = result.unwrap_err();
    assert!(matches!(err, PayrollError::FolderNotFound(_)));
}

/// 空文件夹不是错误
#[test]
fn test_scan_empty_folder() {
    let dir = tempdir().expect("Failed to create temp dir");
    let result = scanner::scan_folder(dir.path());

    assert!(result.is_ok());
    assert!(result.unwrap().is_empty());
}

/// 命令行输入中没有表格文件
#[test]
fn test_collect_sources_without_spreadsheets() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("说明.txt"), "hello").unwrap();
    std::fs::write(dir.path().join("~$锁定.xlsx"), "").unwrap();

    let result = scanner::collect_sources(&[dir.path().to_path_buf()]);
    assert!(matches!(result, Err(PayrollError::NoSourceFiles(_))));
}

/// 命令行输入的文件不存在
#[test]
fn test_collect_sources_missing_file() {
    let result = scanner::collect_sources(&[PathBuf::from("/nonexistent/工资.xlsx")]);
    assert!(matches!(result, Err(PayrollError::FileNotFound(_))));
}

/// PayrollError 的 Display
#[test]
fn test_error_display() {
    let errors = vec![
        PayrollError::Config("测试配置错误".to_string()),
        PayrollError::FileNotFound("rules.json".to_string()),
        PayrollError::FolderNotFound("/path/to/folder".to_string()),
        PayrollError::NoSourceFiles("工资表".to_string()),
        PayrollError::spreadsheet(Path::new("a.xlsx"), "损坏"),
        PayrollError::Validation(3),
        PayrollError::ExcelGeneration("Excel生成错误".to_string()),
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "错误信息为空: {:?}", err);
    }

    let err = PayrollError::Validation(3);
    assert!(err.to_string().contains("--skip-validation"));
}

/// 公共错误原样透出
#[test]
fn test_common_error_transparent() {
    let inner = payroll_merge_common::Error::HeaderNotFound {
        keyword: "人员身份".into(),
        scanned: 10,
    };
    let expected = inner.to_string();
    let err: PayrollError = inner.into();

    assert_eq!(err.to_string(), expected);
    assert!(err.is_per_file());
}

/// 批处理中止时带出文件名和原因
#[test]
fn test_batch_aborted_display() {
    let inner = payroll_merge_common::Error::HeaderNotFound {
        keyword: "人员身份".into(),
        scanned: 10,
    }
    .at_stage(PipelineStage::HeaderDetect);
    let err = PayrollError::BatchAborted {
        file: "01_机关.xlsx".into(),
        source: Box::new(inner.into()),
    };

    let display = err.to_string();
    assert!(display.contains("01_机关.xlsx"));
    assert!(display.contains("表头检测"));
    assert!(!err.is_per_file());
}

/// 只影响单个文件的错误
#[test]
fn test_is_per_file() {
    assert!(PayrollError::spreadsheet(Path::new("a.xlsx"), "损坏").is_per_file());
    assert!(!PayrollError::Config("x".into()).is_per_file());
    assert!(!PayrollError::Common(payroll_merge_common::Error::InvalidRuleset("x".into())).is_per_file());
}

/// IO错误转换
#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: PayrollError = io_error.into();
    assert!(matches!(err, PayrollError::Io(_)));
    assert!(err.to_string().contains("IO错误"));
}

/// JSON错误转换
#[test]
fn test_json_error_conversion() {
    let json_error = serde_json::from_str::<serde_json::Value>("{invalid").unwrap_err();
    let err: PayrollError = json_error.into();
    assert!(matches!(err, PayrollError::JsonParse(_)));
}
