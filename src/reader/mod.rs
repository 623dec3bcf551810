//! 工作簿读取
//!
//! 只读取第一个工作表，转换为无表头的单元格网格；网格从 A1 开始，
//! 工作表数据不从 A1 开始时前面补空行/空列，保证行号与 Excel 一致。

use crate::error::{PayrollError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use payroll_merge_common::header::{self, Grid};
use payroll_merge_common::{CellValue, Table};
use std::path::Path;

fn to_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.trim().is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        // 日期保留序列值
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(format!("#{:?}", e)),
    }
}

/// 读取第一个工作表的全部单元格
pub fn read_grid(path: &Path) -> Result<Grid> {
    if !path.exists() {
        return Err(PayrollError::FileNotFound(path.display().to_string()));
    }

    let mut workbook = open_workbook_auto(path).map_err(|e| PayrollError::spreadsheet(path, e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| PayrollError::spreadsheet(path, "工作簿中没有工作表"))?
        .map_err(|e| PayrollError::spreadsheet(path, e))?;

    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut grid: Grid = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; start_col as usize];
        cells.extend(row.iter().map(to_cell));
        grid.push(cells);
    }

    Ok(grid)
}

/// 表头在固定行（0 起）的表格
pub fn read_table_at(path: &Path, header_row: usize) -> Result<Table> {
    let grid = read_grid(path)?;
    if grid.len() <= header_row {
        return Err(PayrollError::spreadsheet(
            path,
            format!("行数不足，找不到第 {} 行表头", header_row + 1),
        ));
    }
    Ok(header::table_from_grid(&grid, header_row))
}

/// 固定表头行的列名
pub fn read_header_at(path: &Path, header_row: usize) -> Result<Vec<String>> {
    Ok(read_table_at(path, header_row)?.columns().to_vec())
}

/// 按关键字检测表头行并返回列名
pub fn detect_header(path: &Path, keywords: &[String], scan_rows: usize) -> Result<Vec<String>> {
    let grid = read_grid(path)?;
    let row = header::locate_any(&grid, keywords, scan_rows)?;
    Ok(header::header_names(&grid[row]))
}
