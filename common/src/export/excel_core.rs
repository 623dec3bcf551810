//! 工资发放表 Excel 生成（公共库）
//!
//! layout.rs 的定义决定标题区、表头着色和冻结位置。

use crate::layout::{
    display_width, FieldCategory, BANNER_ROWS, COLUMN_PADDING, DATE_COL,
    DEFAULT_FROZEN_COLUMNS, TITLE_FONT_SIZE, UNIT_NAME_COL,
};
use crate::types::{CellValue, Table};
use rust_xlsxwriter::*;

/// 报表参数
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    /// 合并在第一行的标题
    pub title: String,
    /// 单位名称（写在 B2，自动加 "单位名称：" 前缀）
    pub unit_name: String,
    /// 制表时间行（写在 G2）
    pub date_line: String,
    pub sheet_name: String,
    /// 冻结的列数（表头以下同时冻结）
    pub frozen_columns: u16,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            title: String::new(),
            unit_name: String::new(),
            date_line: String::new(),
            sheet_name: "工资发放表".to_string(),
            frozen_columns: DEFAULT_FROZEN_COLUMNS,
        }
    }
}

/// 整列没有任何非空白值的列
pub fn blank_columns(table: &Table) -> Vec<usize> {
    table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, column)| table.column_values(column).all(CellValue::is_blank))
        .map(|(idx, _)| idx)
        .collect()
}

/// 按表头与内容计算列宽
pub fn column_widths(table: &Table) -> Vec<f64> {
    table
        .columns()
        .iter()
        .map(|column| {
            let content = table
                .column_values(column)
                .map(|v| display_width(&v.to_string()))
                .max()
                .unwrap_or(0);
            content.max(display_width(column)) as f64 + COLUMN_PADDING
        })
        .collect()
}

/// 工资发放表生成到缓冲区
///
/// 第 1 行为标题（合并整行），第 2 行为单位名称与制表时间，第 3 行为表头。
pub fn generate_report_buffer(table: &Table, options: &ReportOptions) -> Result<Vec<u8>, String> {
    let mut workbook = Workbook::new();

    let title_format = Format::new()
        .set_bold()
        .set_font_size(TITLE_FONT_SIZE)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);

    let bold_format = Format::new().set_bold();

    let header_base = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);

    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(&options.sheet_name)
        .map_err(|e| format!("工作表名称设置错误: {}", e))?;

    let columns = table.columns();
    let last_col = columns.len().saturating_sub(1) as u16;

    // 标题区
    if last_col > 0 {
        worksheet
            .merge_range(0, 0, 0, last_col, &options.title, &title_format)
            .map_err(|e| format!("标题合并错误: {}", e))?;
    } else {
        worksheet
            .write_string_with_format(0, 0, &options.title, &title_format)
            .map_err(|e| format!("标题写入错误: {}", e))?;
    }
    worksheet
        .write_string_with_format(1, UNIT_NAME_COL, format!("单位名称：{}", options.unit_name), &bold_format)
        .map_err(|e| format!("单位名称写入错误: {}", e))?;
    worksheet
        .write_string_with_format(1, DATE_COL, &options.date_line, &bold_format)
        .map_err(|e| format!("制表时间写入错误: {}", e))?;

    // 表头
    let header_row = BANNER_ROWS;
    for (idx, column) in columns.iter().enumerate() {
        let format = match FieldCategory::classify(column) {
            Some(category) => header_base
                .clone()
                .set_background_color(Color::RGB(category.fill_color())),
            None => header_base.clone(),
        };
        worksheet
            .write_string_with_format(header_row, idx as u16, column, &format)
            .map_err(|e| format!("表头写入错误: {}", e))?;
    }

    // 数据
    for (row_idx, row) in table.rows().iter().enumerate() {
        let excel_row = header_row + 1 + row_idx as u32;
        for (col_idx, column) in columns.iter().enumerate() {
            let col = col_idx as u16;
            match row.value(column) {
                CellValue::Empty => {}
                CellValue::Number(n) => {
                    worksheet
                        .write_number(excel_row, col, *n)
                        .map_err(|e| format!("数值写入错误: {}", e))?;
                }
                CellValue::Text(s) => {
                    worksheet
                        .write_string(excel_row, col, s)
                        .map_err(|e| format!("文本写入错误: {}", e))?;
                }
            }
        }
    }

    // 列宽与空列隐藏
    for (idx, width) in column_widths(table).into_iter().enumerate() {
        worksheet
            .set_column_width(idx as u16, width)
            .map_err(|e| format!("列宽设置错误: {}", e))?;
    }
    for idx in blank_columns(table) {
        worksheet
            .set_column_hidden(idx as u16)
            .map_err(|e| format!("列隐藏设置错误: {}", e))?;
    }

    worksheet
        .set_freeze_panes(header_row + 1, options.frozen_columns)
        .map_err(|e| format!("冻结窗格设置错误: {}", e))?;

    workbook
        .save_to_buffer()
        .map_err(|e| format!("Excel保存错误: {}", e))
}
