//! 工资发放表写出（CLI）
//!
//! 报表先写入目标文件夹中的临时文件，成功后再改名为最终文件；
//! 任一步失败时临时文件随 drop 删除。

use crate::error::{PayrollError, Result};
use payroll_merge_common::export::excel_core::{generate_report_buffer, ReportOptions};
use payroll_merge_common::Table;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub fn write_report(table: &Table, options: &ReportOptions, output_path: &Path) -> Result<()> {
    let buffer = generate_report_buffer(table, options).map_err(PayrollError::ExcelGeneration)?;

    let dir = match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(&buffer)?;
    temp.flush()?;
    temp.persist(output_path).map_err(|e| PayrollError::Io(e.error))?;

    Ok(())
}
