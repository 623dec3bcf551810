//! 单个工资表的处理流水线
//!
//! 表头检测 → 汇总行过滤 → 逐行映射 → 拼接 → 扣款合并 → 计算字段 → 实发工资推导
//!
//! 表头检测失败时返回带阶段信息的错误，调用方记录后该文件输出空结果；
//! 找不到公共合并列只跳过合并并记录警告，其余阶段照常进行。

use crate::calc::{self, CalcDiagnostic, NetPayBasis, PayrollFields};
use crate::error::{Error, Result};
use crate::header::{self, DEFAULT_SCAN_ROWS};
use crate::merger::{self, DeductionTable, DEFAULT_KEY_COLUMNS};
use crate::projector;
use crate::rules::{RuleIndex, RuleSet};
use crate::runlog::RunLog;
use crate::types::{CellValue, Table};
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;

/// 默认的汇总行关键字
pub const DEFAULT_SUMMARY_KEYWORDS: &[&str] = &["合计", "汇总", "总计", "备注", "说明"];

/// 身份列不存在时用于过滤汇总行的列
pub const FALLBACK_FILTER_COLUMN: &str = "人员身份";

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    HeaderDetect,
    RowFilter,
    PerRowProjection,
    Concatenate,
    DeductionMerge,
    ComplexCalculation,
    NetPayDerivation,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::HeaderDetect => "表头检测",
            PipelineStage::RowFilter => "汇总行过滤",
            PipelineStage::PerRowProjection => "逐行映射",
            PipelineStage::Concatenate => "拼接",
            PipelineStage::DeductionMerge => "扣款合并",
            PipelineStage::ComplexCalculation => "计算字段",
            PipelineStage::NetPayDerivation => "实发工资推导",
            PipelineStage::Done => "完成",
        };
        write!(f, "{}", name)
    }
}

/// 追溯列：匹配时使用的身份值
pub fn matched_field_column(identity_column: &str) -> String {
    format!("_匹配字段 ({})", identity_column)
}

/// 追溯列：规则在规则键下的值
pub fn matched_rule_key_column(rule_key: &str) -> String {
    format!("_匹配规则键 ({})", rule_key)
}

/// 流水线参数
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// 源表中的身份列（同时作为表头检测关键字）
    pub identity_column: String,
    /// 规则中的身份键
    pub rule_key: String,
    pub scan_rows: usize,
    pub key_aliases: Vec<String>,
    pub summary_keywords: Vec<String>,
    pub payroll_fields: PayrollFields,
}

impl PipelineOptions {
    pub fn new(identity_column: impl Into<String>, rule_key: impl Into<String>) -> Self {
        Self {
            identity_column: identity_column.into(),
            rule_key: rule_key.into(),
            scan_rows: DEFAULT_SCAN_ROWS,
            key_aliases: DEFAULT_KEY_COLUMNS.iter().map(|s| s.to_string()).collect(),
            summary_keywords: DEFAULT_SUMMARY_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            payroll_fields: PayrollFields::default(),
        }
    }

    /// 汇总行匹配（不区分大小写的子串匹配）
    fn summary_pattern(&self) -> Result<Option<Regex>> {
        let keywords: Vec<String> = self
            .summary_keywords
            .iter()
            .filter(|k| !k.trim().is_empty())
            .map(|k| regex::escape(k.trim()))
            .collect();
        if keywords.is_empty() {
            return Ok(None);
        }
        Regex::new(&format!("(?i){}", keywords.join("|")))
            .map(Some)
            .map_err(|e| Error::Config(format!("汇总关键字无效: {}", e)))
    }
}

/// 合并阶段摘要
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeSummary {
    pub key: String,
    pub matched_rows: usize,
    pub unmatched_keys: Vec<String>,
}

/// 单个文件的处理结果
#[derive(Debug, Clone, PartialEq)]
pub struct SheetOutcome {
    pub table: Table,
    /// 表头所在行（0 起）
    pub header_row: usize,
    /// 被过滤掉的汇总行数
    pub filtered_rows: usize,
    /// 没有匹配规则的身份值
    pub uncovered_identities: BTreeSet<String>,
    /// None 表示合并被跳过
    pub merge: Option<MergeSummary>,
    pub net_pay_basis: Option<NetPayBasis>,
    pub diagnostics: Vec<CalcDiagnostic>,
    pub log: RunLog,
}

impl SheetOutcome {
    fn empty(header_row: usize, filtered_rows: usize, log: RunLog) -> Self {
        Self {
            table: Table::default(),
            header_row,
            filtered_rows,
            uncovered_identities: BTreeSet::new(),
            merge: None,
            net_pay_basis: None,
            diagnostics: Vec::new(),
            log,
        }
    }
}

/// 单表流水线
///
/// 规则索引在构建时建立一次，之后可用于同一批次的多个文件。
pub struct SheetPipeline<'a> {
    options: &'a PipelineOptions,
    rules: RuleIndex<'a>,
    summary: Option<Regex>,
}

impl<'a> SheetPipeline<'a> {
    pub fn new(rules: &'a RuleSet, options: &'a PipelineOptions) -> Result<Self> {
        Ok(Self {
            options,
            rules: rules.store().index(&options.rule_key),
            summary: options.summary_pattern()?,
        })
    }

    /// 处理一个工资表的原始网格
    pub fn run(&self, grid: &[Vec<CellValue>], deductions: &DeductionTable) -> Result<SheetOutcome> {
        let options = self.options;
        let mut log = RunLog::new();

        // 表头检测
        let header_row = header::locate(grid, &options.identity_column, options.scan_rows)
            .map_err(|e| e.at_stage(PipelineStage::HeaderDetect))?;
        log.info(format!("表头位于第 {} 行", header_row + 1));
        let table = header::table_from_grid(grid, header_row);
        log.info(format!("读取数据 {} 行，{} 列", table.len(), table.columns().len()));

        // 汇总行过滤
        let (table, filtered_rows) = self.filter_summary_rows(table, &mut log);

        // 逐行映射
        let matched_field = matched_field_column(&options.identity_column);
        let matched_rule_key = matched_rule_key_column(&options.rule_key);
        let mut uncovered_identities = BTreeSet::new();
        let mut projected = Vec::new();
        let mut warnings: BTreeSet<String> = BTreeSet::new();

        for row in table.rows() {
            let Some(identity) = row.value(&options.identity_column).as_identity() else {
                continue;
            };
            let Some(rule) = self.rules.get(&identity) else {
                uncovered_identities.insert(identity);
                continue;
            };
            let mut result = projector::project(row, rule);
            warnings.extend(result.warnings);
            result.row.set(matched_field.as_str(), CellValue::Text(identity));
            result.row.set(
                matched_rule_key.as_str(),
                rule.identity(&options.rule_key)
                    .map(CellValue::from)
                    .unwrap_or_default(),
            );
            projected.push(result.row);
        }

        for warning in &warnings {
            log.warning(warning.clone());
        }
        if !uncovered_identities.is_empty() {
            log.warning(format!(
                "以下 {} 值没有对应的映射规则: {:?}",
                options.rule_key, uncovered_identities
            ));
        }
        if projected.is_empty() {
            log.warning("没有成功处理的数据行");
            let mut outcome = SheetOutcome::empty(header_row, filtered_rows, log);
            outcome.uncovered_identities = uncovered_identities;
            return Ok(outcome);
        }

        // 拼接
        let mut table = Table::from_rows(projected);
        log.info(format!("映射完成 {} 行", table.len()));

        // 扣款合并
        let merge = match merger::merge(&table, &deductions.table, &deductions.fields, &options.key_aliases) {
            Ok(outcome) => {
                log.info(format!(
                    "按 '{}' 合并扣款：{}/{} 行匹配",
                    outcome.key,
                    outcome.matched_rows,
                    outcome.table.len()
                ));
                table = outcome.table;
                Some(MergeSummary {
                    key: outcome.key,
                    matched_rows: outcome.matched_rows,
                    unmatched_keys: outcome.unmatched_keys,
                })
            }
            Err(e) if e.is_recoverable() => {
                log.warning(format!("{}，跳过扣款合并", e.at_stage(PipelineStage::DeductionMerge)));
                None
            }
            Err(e) => return Err(e.at_stage(PipelineStage::DeductionMerge)),
        };

        // 计算字段
        let fields = calc::collect_calc_fields(&table, &matched_field, &self.rules);
        let diagnostics = calc::apply_calculations(&mut table, &fields);
        if !fields.is_empty() {
            log.info(format!("计算字段 {} 个", fields.len()));
        }
        for diagnostic in &diagnostics {
            log.warning(diagnostic.to_string());
        }

        // 实发工资
        let basis = calc::derive_net_pay(&mut table, &options.payroll_fields);
        let names = &options.payroll_fields;
        match basis {
            NetPayBasis::GrossMinusDeductions => {}
            NetPayBasis::GrossOnly => log.warning(format!(
                "缺少 '{}'，'{}' 按 '{}' 计算",
                names.total_deductions, names.net_pay, names.gross_pay
            )),
            NetPayBasis::Zero => log.warning(format!(
                "缺少 '{}' 和 '{}'，'{}' 记为 0",
                names.gross_pay, names.total_deductions, names.net_pay
            )),
        }

        log.success(format!("处理完成 {} 行", table.len()));

        Ok(SheetOutcome {
            table,
            header_row,
            filtered_rows,
            uncovered_identities,
            merge,
            net_pay_basis: Some(basis),
            diagnostics,
            log,
        })
    }

    fn filter_summary_rows(&self, table: Table, log: &mut RunLog) -> (Table, usize) {
        let Some(pattern) = &self.summary else {
            return (table, 0);
        };

        let identity_column = self.options.identity_column.as_str();
        let filter_column = if table.has_column(identity_column) {
            identity_column
        } else if table.has_column(FALLBACK_FILTER_COLUMN) {
            log.warning(format!(
                "身份列 '{}' 不存在，使用 '{}' 过滤汇总行",
                identity_column, FALLBACK_FILTER_COLUMN
            ));
            FALLBACK_FILTER_COLUMN
        } else {
            log.warning(format!("列 '{}' 不存在，无法过滤汇总行", identity_column));
            return (table, 0);
        };

        let before = table.len();
        let mut kept = Table::new(table.columns().to_vec());
        for row in table.rows() {
            if !pattern.is_match(&row.value(filter_column).to_string()) {
                kept.push_row(row.clone());
            }
        }
        let filtered = before - kept.len();
        if filtered > 0 {
            log.info(format!("过滤汇总行 {} 行", filtered));
        }
        (kept, filtered)
    }
}
