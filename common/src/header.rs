//! 表头行检测
//!
//! 工资表在真正的表头之前通常有几行标题（单位、月份等），
//! 按关键字扫描前若干行找到表头所在行。

use crate::error::{Error, Result};
use crate::types::{CellValue, Row, Table};

/// 表头扫描的默认行数
pub const DEFAULT_SCAN_ROWS: usize = 10;

/// 原始单元格网格（无表头）
pub type Grid = Vec<Vec<CellValue>>;

/// 在前 `max_scan_rows` 行中查找任一单元格包含 `keyword` 的行
pub fn locate(preview: &[Vec<CellValue>], keyword: &str, max_scan_rows: usize) -> Result<usize> {
    preview
        .iter()
        .take(max_scan_rows)
        .position(|row| row.iter().any(|cell| cell.to_string().contains(keyword)))
        .ok_or_else(|| Error::HeaderNotFound {
            keyword: keyword.to_string(),
            scanned: max_scan_rows.min(preview.len()),
        })
}

/// 同 `locate`，但接受多个关键字（任一命中即可）
pub fn locate_any(preview: &[Vec<CellValue>], keywords: &[String], max_scan_rows: usize) -> Result<usize> {
    preview
        .iter()
        .take(max_scan_rows)
        .position(|row| {
            row.iter().any(|cell| {
                let text = cell.to_string();
                keywords.iter().any(|k| text.contains(k.as_str()))
            })
        })
        .ok_or_else(|| Error::HeaderNotFound {
            keyword: keywords.join("/"),
            scanned: max_scan_rows.min(preview.len()),
        })
}

/// 将表头行的单元格转换为列名
///
/// 空白列名记为 `Unnamed: <序号>`，重名列依次追加 `.1`、`.2`。
pub fn header_names(header: &[CellValue]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(header.len());
    for (idx, cell) in header.iter().enumerate() {
        let base = match cell.as_key() {
            Some(name) => name,
            None => format!("Unnamed: {}", idx),
        };
        let mut name = base.clone();
        let mut suffix = 1;
        while names.contains(&name) {
            name = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        names.push(name);
    }
    names
}

/// 以 `header_row` 为表头，把其后的行转换为表格；整行空白的数据行被忽略
pub fn table_from_grid(grid: &[Vec<CellValue>], header_row: usize) -> Table {
    let Some(header) = grid.get(header_row) else {
        return Table::default();
    };
    let columns = header_names(header);
    let mut table = Table::new(columns.clone());

    for cells in grid.iter().skip(header_row + 1) {
        if cells.iter().all(CellValue::is_blank) {
            continue;
        }
        let row: Row = columns
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.as_str(), cells.get(idx).cloned().unwrap_or_default()))
            .collect();
        table.push_row(row);
    }
    table
}
