pub mod excel;

use crate::cli::Period;
use std::path::{Path, PathBuf};

/// 报表文件名: `<单位>_<YYYYMM>_工资发放表_已处理.xlsx`
pub fn report_file_name(unit_name: &str, period: &Period) -> String {
    format!("{}_{}_工资发放表_已处理.xlsx", unit_name, period.compact())
}

/// 输出路径：未指定或为文件夹时使用默认文件名
pub fn report_path(output: Option<&Path>, unit_name: &str, period: &Period) -> PathBuf {
    let file_name = report_file_name(unit_name, period);
    match output {
        None => PathBuf::from(file_name),
        Some(path) if path.is_dir() || path.extension().is_none() => path.join(file_name),
        Some(path) => path.to_path_buf(),
    }
}
