//! 批处理
//!
//! 读取规则、扣款表、模板和各源文件表头，逐个文件运行流水线并汇总。
//! 只影响单个文件的错误默认记录并继续；`fail_fast` 时或遇到其他错误时中止。

use crate::config::{Config, MAX_SCAN_ROWS};
use crate::error::{PayrollError, Result};
use crate::reader;
use crate::scanner::{self, SheetFile};
use payroll_merge_common::validation::{self, ValidationInput, ValidationReport};
use payroll_merge_common::{DeductionTable, PipelineOptions, RuleSet, RunLog, SheetPipeline, Table};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

/// 未匹配姓名示例的最大数量
pub const UNMATCHED_EXAMPLES: usize = 5;

/// 一次运行的全部输入
#[derive(Debug, Clone)]
pub struct Inputs {
    pub sources: Vec<SheetFile>,
    pub rules: RuleSet,
    pub deductions: DeductionTable,
    /// 模板列（None 表示未提供模板）
    pub template: Option<Vec<String>>,
    /// 所有源文件表头的并集
    pub source_fields: HashSet<String>,
    pub log: RunLog,
}

impl Inputs {
    pub fn load(
        sources: &[PathBuf],
        rules: &Path,
        deductions: &Path,
        template: Option<&Path>,
        config: &Config,
    ) -> Result<Self> {
        let mut log = RunLog::new();

        let sources = scanner::collect_sources(sources)?;
        log.info(format!("检测到 {} 个工资表文件", sources.len()));

        if !rules.exists() {
            return Err(PayrollError::FileNotFound(rules.display().to_string()));
        }
        let rules = RuleSet::from_file(rules)?;
        log.info(format!("读取映射规则 {} 条", rules.field_mappings.len()));

        let table = reader::read_table_at(deductions, config.deduction_header_row)?;
        let deductions = DeductionTable::from_table(table, &config.key_aliases)?;
        if deductions.fields.is_empty() {
            log.warning(format!("扣款表中除 '{}' 外没有其他字段", deductions.key_column));
        } else {
            log.info(format!(
                "扣款表 {} 行，扣款字段 {} 个",
                deductions.table.len(),
                deductions.fields.len()
            ));
        }

        let template = match template {
            Some(path) => {
                let columns = reader::read_header_at(path, config.template_header_row)?;
                log.info(format!("模板列 {} 个", columns.len()));
                Some(columns)
            }
            None => None,
        };

        let mut source_fields = HashSet::new();
        for file in &sources {
            match reader::detect_header(&file.path, &config.key_aliases, MAX_SCAN_ROWS) {
                Ok(columns) => source_fields.extend(columns),
                Err(e) => log.warning(format!("{}: 未能读取表头 ({})", file.file_name, e)),
            }
        }

        Ok(Self {
            sources,
            rules,
            deductions,
            template,
            source_fields,
            log,
        })
    }

    /// 第一个能检测到表头的源文件的列名（交互选择身份列用）
    pub fn sample_header(&self, config: &Config) -> Option<Vec<String>> {
        self.sources
            .iter()
            .find_map(|file| reader::detect_header(&file.path, &config.key_aliases, MAX_SCAN_ROWS).ok())
    }

    pub fn validate(&self, config: &Config, rule_key: &str) -> ValidationReport {
        let deduction_fields: HashSet<String> = self.deductions.table.columns().iter().cloned().collect();
        let input = ValidationInput {
            source_fields: self.source_fields.clone(),
            deduction_fields,
            template_fields: self.template.as_deref(),
            key_columns: &config.key_aliases,
            rule_label_key: rule_key,
        };
        validation::validate(&self.rules, &input)
    }

    /// 去掉源字段只在扣款表中的简单映射
    pub fn pruned_rules(&self, log: &mut RunLog) -> RuleSet {
        if self.source_fields.is_empty() {
            log.warning("未能获取源文件字段，不过滤映射规则");
            return self.rules.clone();
        }
        let deduction_fields: HashSet<String> = self.deductions.table.columns().iter().cloned().collect();
        let (rules, removed) = self
            .rules
            .prune_deduction_only_sources(&self.source_fields, &deduction_fields);
        log.info(format!("映射规则预过滤完成，去掉 {} 个只存在于扣款表的简单映射", removed));
        rules
    }
}

/// 单个文件的处理状态
#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    Succeeded { rows: usize },
    Empty,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub file_name: String,
    pub status: FileStatus,
}

/// 结果表与扣款表的姓名匹配情况
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameMatchStats {
    pub key: String,
    pub total: usize,
    pub matched: usize,
    pub unmatched_examples: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub identity_column: String,
    pub rule_key: String,
    pub fail_fast: bool,
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub table: Table,
    pub files: Vec<FileReport>,
    pub uncovered_identities: BTreeSet<String>,
    pub name_match: Option<NameMatchStats>,
    pub log: RunLog,
}

impl BatchReport {
    pub fn count(&self, predicate: impl Fn(&FileStatus) -> bool) -> usize {
        self.files.iter().filter(|f| predicate(&f.status)).count()
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Failed(_)))
    }
}

/// 运行批处理
pub fn run_batch(inputs: &Inputs, config: &Config, options: &BatchOptions) -> Result<BatchReport> {
    let mut log = inputs.log.clone();
    let rules = inputs.pruned_rules(&mut log);
    let pipeline_options: PipelineOptions = config.pipeline_options(&options.identity_column, &options.rule_key);
    let pipeline = SheetPipeline::new(&rules, &pipeline_options)?;

    let mut files = Vec::new();
    let mut tables = Vec::new();
    let mut uncovered_identities = BTreeSet::new();

    for file in &inputs.sources {
        log.info(format!("处理文件: {}", file.file_name));

        let result = reader::read_grid(&file.path)
            .and_then(|grid| pipeline.run(&grid, &inputs.deductions).map_err(PayrollError::from));

        match result {
            Ok(outcome) => {
                for entry in outcome.log {
                    log.push(entry.level, format!("{}: {}", file.file_name, entry.message));
                }
                uncovered_identities.extend(outcome.uncovered_identities);
                let status = if outcome.table.is_empty() {
                    FileStatus::Empty
                } else {
                    FileStatus::Succeeded {
                        rows: outcome.table.len(),
                    }
                };
                files.push(FileReport {
                    file_name: file.file_name.clone(),
                    status,
                });
                tables.push(outcome.table);
            }
            Err(e) if options.fail_fast || !e.is_per_file() => {
                return Err(PayrollError::BatchAborted {
                    file: file.file_name.clone(),
                    source: Box::new(e),
                });
            }
            Err(e) => {
                log.error(format!("{}: {}", file.file_name, e));
                files.push(FileReport {
                    file_name: file.file_name.clone(),
                    status: FileStatus::Failed(e.to_string()),
                });
            }
        }
    }

    let combined = Table::concat(tables.into_iter().filter(|t| !t.is_empty()));
    let name_match = name_match_stats(&combined, &inputs.deductions, &config.key_aliases);
    if let Some(stats) = &name_match {
        if stats.matched < stats.total {
            log.warning(format!(
                "'{}' 匹配扣款 {}/{}，未匹配示例: {:?}",
                stats.key, stats.matched, stats.total, stats.unmatched_examples
            ));
        } else {
            log.info(format!("'{}' 全部匹配扣款 ({})", stats.key, stats.total));
        }
    }

    let table = match &inputs.template {
        Some(columns) if !combined.is_empty() => {
            log.info("按模板列重排输出");
            combined.reindex(columns)
        }
        _ => combined,
    };

    let succeeded = files
        .iter()
        .filter(|f| matches!(f.status, FileStatus::Succeeded { .. }))
        .count();
    let empty = files.iter().filter(|f| f.status == FileStatus::Empty).count();
    let failed = files.len() - succeeded - empty;
    let summary = format!(
        "处理完成：成功 {} 个，无数据 {} 个，失败 {} 个，共 {} 行",
        succeeded,
        empty,
        failed,
        table.len()
    );
    if failed > 0 || succeeded == 0 {
        log.warning(summary);
    } else {
        log.success(summary);
    }

    Ok(BatchReport {
        table,
        files,
        uncovered_identities,
        name_match,
        log,
    })
}

/// 结果表中的姓名有多少在扣款表中
pub fn name_match_stats(
    table: &Table,
    deductions: &DeductionTable,
    key_aliases: &[String],
) -> Option<NameMatchStats> {
    let key = key_aliases
        .iter()
        .find(|k| table.has_column(k) && deductions.table.has_column(k))?;

    let known: HashSet<String> = deductions.table.unique_keys(key).into_iter().collect();
    let names = table.unique_keys(key);
    let unmatched: Vec<String> = names.iter().filter(|n| !known.contains(*n)).cloned().collect();

    Some(NameMatchStats {
        key: key.clone(),
        total: names.len(),
        matched: names.len() - unmatched.len(),
        unmatched_examples: unmatched.into_iter().take(UNMATCHED_EXAMPLES).collect(),
    })
}
