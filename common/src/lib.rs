//! Payroll Merge Common Library
//!
//! 工资表合并流水线：规则查找、表头检测、字段映射、扣款合并、计算字段。
//! 不做任何文件读写，CLI 负责读取工作簿和写出报表。

pub mod types;
pub mod error;
pub mod rules;
pub mod header;
pub mod projector;
pub mod merger;
pub mod expr;
pub mod calc;
pub mod pipeline;
pub mod runlog;
pub mod validation;
pub mod layout;
pub mod export;

pub use types::{CellValue, Row, Table};
pub use error::{Error, Result};
pub use rules::{Calculation, FieldMapping, MappingRule, RuleIndex, RuleSet, RuleStore};
pub use header::Grid;
pub use merger::{DeductionTable, MergeOutcome};
pub use calc::{CalcDiagnostic, NetPayBasis, PayrollFields};
pub use pipeline::{PipelineOptions, PipelineStage, SheetOutcome, SheetPipeline};
pub use runlog::{LogEntry, LogLevel, RunLog};
pub use validation::{validate, ValidationInput, ValidationReport};
pub use layout::FieldCategory;
