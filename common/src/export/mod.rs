//! 报表导出（CLI 与测试共用）

#[cfg(feature = "excel")]
pub mod excel_core;
