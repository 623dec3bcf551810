//! 工资表合并处理工具
//!
//! 源工资表 + 扣款表 + 字段映射规则 → 工资发放表

pub mod batch;
pub mod cli;
pub mod column_selector;
pub mod config;
pub mod error;
pub mod export;
pub mod reader;
pub mod scanner;
