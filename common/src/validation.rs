//! 映射规则与输入文件的一致性检查
//!
//! 错误（阻止处理）:
//! - 同一字段同时出现在源表和扣款表中（关键列除外）
//! - 目标字段不在模板中（提供模板时）
//!
//! 警告:
//! - 简单映射的源字段在源表/扣款表中都不存在
//! - 计算映射的源字段既不存在，也不是任何规则的目标字段
//! - 计算表达式无法解析，或引用了未列入 `source_fields` 的字段
//! - 无法识别的映射格式

use crate::expr::Expr;
use crate::rules::{Calculation, FieldMapping, RuleSet};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

/// 检查所需的表头信息
#[derive(Debug, Clone, Default)]
pub struct ValidationInput<'a> {
    /// 所有源表的列名
    pub source_fields: HashSet<String>,
    /// 扣款表的列名
    pub deduction_fields: HashSet<String>,
    /// 模板列名（None 表示未提供模板）
    pub template_fields: Option<&'a [String]>,
    /// 姓名类关键列
    pub key_columns: &'a [String],
    /// 用于在消息中标识规则的属性名
    pub rule_label_key: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// 源字段存在的简单映射数
    pub valid_simple: usize,
    /// 源字段不存在的简单映射数
    pub invalid_simple: usize,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn validate(rules: &RuleSet, input: &ValidationInput<'_>) -> ValidationReport {
    let mut report = ValidationReport::default();

    if input.source_fields.is_empty() {
        report.errors.push("未能从任何源文件中读取列名".to_string());
        return report;
    }

    let keys: HashSet<&str> = input.key_columns.iter().map(String::as_str).collect();
    let repeated: BTreeSet<&str> = input
        .source_fields
        .intersection(&input.deduction_fields)
        .map(String::as_str)
        .filter(|f| !keys.contains(f))
        .collect();
    if !repeated.is_empty() {
        report.errors.push(format!(
            "字段冲突：以下字段同时存在于源文件和扣款表中（非关键列）: {:?}",
            repeated
        ));
    }

    let available = |field: &str| input.source_fields.contains(field) || input.deduction_fields.contains(field);
    let defined_targets = rules.target_fields();
    let template: Option<HashSet<&str>> = input
        .template_fields
        .map(|fields| fields.iter().map(String::as_str).collect());

    for (idx, rule) in rules.field_mappings.iter().enumerate() {
        let label = rule
            .identity(input.rule_label_key)
            .map(str::to_string)
            .unwrap_or_else(|| format!("规则 #{}", idx));

        for mapping in &rule.mappings {
            match mapping {
                FieldMapping::Simple {
                    source_field,
                    target_field,
                } => {
                    if available(source_field) {
                        report.valid_simple += 1;
                    } else {
                        report.invalid_simple += 1;
                        report.warnings.push(format!(
                            "规则 '{}': 源字段 '{}' 在源文件或扣款表中未找到",
                            label, source_field
                        ));
                    }
                    if let Some(template) = &template {
                        if !template.contains(target_field.as_str()) {
                            report.errors.push(format!(
                                "规则 '{}': 目标字段 '{}'（来自源 '{}'）在模板文件中未找到",
                                label, target_field, source_field
                            ));
                        }
                    }
                }
                FieldMapping::Complex {
                    source_fields,
                    target_field,
                    calculation,
                } => {
                    if let Calculation::Expression(text) = calculation {
                        match Expr::parse(text) {
                            Ok(expr) => {
                                for name in expr.variables() {
                                    if !source_fields.iter().any(|s| s == name) {
                                        report.warnings.push(format!(
                                            "规则 '{}'（计算）: '{}' 的表达式引用了未列入 source_fields 的字段 '{}'",
                                            label, target_field, name
                                        ));
                                    }
                                }
                            }
                            Err(e) => report.warnings.push(format!(
                                "规则 '{}'（计算）: '{}' 的表达式无效 ({})",
                                label, target_field, e
                            )),
                        }
                    }
                    for source in source_fields {
                        if !available(source) && !defined_targets.contains(source.as_str()) {
                            report.warnings.push(format!(
                                "规则 '{}'（计算）: 源字段 '{}' 在源文件/扣款表中未找到，且未被其他规则定义为目标字段",
                                label, source
                            ));
                        }
                    }
                    if let Some(template) = &template {
                        if !template.contains(target_field.as_str()) {
                            report.errors.push(format!(
                                "规则 '{}'（计算）: 目标字段 '{}' 在模板文件中未找到",
                                label, target_field
                            ));
                        }
                    }
                }
                FieldMapping::Unrecognized(value) => {
                    report
                        .warnings
                        .push(format!("规则 '{}': 无法识别的映射格式 {}", label, value));
                }
            }
        }
    }

    report
}
