//! 计算字段
//!
//! 合并扣款之后，对整张结果表计算复杂映射的目标字段，并推导实发工资。
//!
//! ## 处理流程
//! 1. 按结果表中出现的身份值收集各规则的复杂映射（同名目标字段先定义者优先）
//! 2. 逐行计算：来源列不存在 → 空值；非数值 → 按 0 计算并记录
//! 3. 实发工资 = 应发工资 − 扣发合计 − 其他补扣

use crate::expr::Expr;
use crate::rules::{Calculation, FieldMapping, RuleIndex};
use crate::types::{CellValue, Table};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 工资合计相关的字段名
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayrollFields {
    /// 应发工资
    pub gross_pay: String,
    /// 扣发合计
    pub total_deductions: String,
    /// 其他补扣（不存在时按 0）
    pub other_withholdings: String,
    /// 实发工资（推导结果）
    pub net_pay: String,
}

impl Default for PayrollFields {
    fn default() -> Self {
        Self {
            gross_pay: "应发工资".into(),
            total_deductions: "扣发合计".into(),
            other_withholdings: "其他补扣".into(),
            net_pay: "实发工资".into(),
        }
    }
}

/// 一个待计算的目标字段
#[derive(Debug, Clone, PartialEq)]
pub struct CalcField {
    pub target: String,
    pub sources: Vec<String>,
    pub calculation: Calculation,
}

/// 计算诊断信息
#[derive(Debug, Clone, PartialEq)]
pub enum CalcDiagnostic {
    /// 来源列不在结果表中，整列为空
    MissingSources { target: String, fields: Vec<String> },
    /// 非数值按 0 参与计算
    NonNumeric {
        target: String,
        row: usize,
        field: String,
        value: String,
    },
    /// 表达式解析或求值失败（row 为 None 表示整列）
    Evaluation {
        target: String,
        row: Option<usize>,
        message: String,
    },
    /// 不支持的计算定义
    Unsupported { target: String, calculation: String },
}

impl std::fmt::Display for CalcDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalcDiagnostic::MissingSources { target, fields } => {
                write!(f, "'{}' 的来源字段不存在: {:?}，结果置空", target, fields)
            }
            CalcDiagnostic::NonNumeric {
                target,
                row,
                field,
                value,
            } => write!(
                f,
                "'{}' 第 {} 行: 字段 '{}' 的值 '{}' 不是数值，按 0 计算",
                target,
                row + 1,
                field,
                value
            ),
            CalcDiagnostic::Evaluation {
                target,
                row: Some(row),
                message,
            } => write!(f, "'{}' 第 {} 行计算失败: {}", target, row + 1, message),
            CalcDiagnostic::Evaluation {
                target,
                row: None,
                message,
            } => write!(f, "'{}' 计算失败: {}", target, message),
            CalcDiagnostic::Unsupported {
                target,
                calculation,
            } => write!(f, "'{}' 的计算方式不受支持: {}", target, calculation),
        }
    }
}

/// 实发工资采用的公式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetPayBasis {
    /// 应发 − 扣发合计 − 其他补扣
    GrossMinusDeductions,
    /// 只有应发
    GrossOnly,
    /// 两者都没有，记 0
    Zero,
}

/// 收集结果表中各身份值对应规则的复杂映射
///
/// `identity_column` 为记录身份值的列；同一目标字段先定义者优先。
pub fn collect_calc_fields(table: &Table, identity_column: &str, rules: &RuleIndex<'_>) -> Vec<CalcField> {
    let mut fields: Vec<CalcField> = Vec::new();

    for identity in table.distinct_identities(identity_column) {
        let Some(rule) = rules.get(&identity) else {
            continue;
        };
        for mapping in rule.complex_mappings() {
            if let FieldMapping::Complex {
                source_fields,
                target_field,
                calculation,
            } = mapping
            {
                if fields.iter().any(|f| f.target == *target_field) {
                    continue;
                }
                fields.push(CalcField {
                    target: target_field.clone(),
                    sources: source_fields.clone(),
                    calculation: calculation.clone(),
                });
            }
        }
    }

    fields
}

/// 对整张表计算目标字段，返回诊断信息
pub fn apply_calculations(table: &mut Table, fields: &[CalcField]) -> Vec<CalcDiagnostic> {
    let mut diagnostics = Vec::new();

    for field in fields {
        let values = compute_field(table, field, &mut diagnostics);
        table.set_column(&field.target, values);
    }

    diagnostics
}

fn compute_field(table: &Table, field: &CalcField, diagnostics: &mut Vec<CalcDiagnostic>) -> Vec<CellValue> {
    let all_empty = || vec![CellValue::Empty; table.len()];

    let missing: Vec<String> = field
        .sources
        .iter()
        .filter(|s| !table.has_column(s))
        .cloned()
        .collect();
    if !missing.is_empty() {
        diagnostics.push(CalcDiagnostic::MissingSources {
            target: field.target.clone(),
            fields: missing,
        });
        return all_empty();
    }

    let expr = match &field.calculation {
        Calculation::Sum => None,
        Calculation::Expression(text) => match Expr::parse(text) {
            Ok(expr) => Some(expr),
            Err(e) => {
                diagnostics.push(CalcDiagnostic::Evaluation {
                    target: field.target.clone(),
                    row: None,
                    message: e.to_string(),
                });
                return all_empty();
            }
        },
        Calculation::Unsupported(value) => {
            diagnostics.push(CalcDiagnostic::Unsupported {
                target: field.target.clone(),
                calculation: value.to_string(),
            });
            return all_empty();
        }
    };

    (0..table.len())
        .map(|row| {
            let numbers: Vec<f64> = field
                .sources
                .iter()
                .map(|source| {
                    let value = table.value(row, source);
                    value.as_number().unwrap_or_else(|| {
                        if !value.is_blank() {
                            diagnostics.push(CalcDiagnostic::NonNumeric {
                                target: field.target.clone(),
                                row,
                                field: source.clone(),
                                value: value.to_string(),
                            });
                        }
                        0.0
                    })
                })
                .collect();

            match &expr {
                None => CellValue::Number(numbers.iter().sum()),
                Some(expr) => {
                    let bindings: HashMap<&str, f64> = field
                        .sources
                        .iter()
                        .map(String::as_str)
                        .zip(numbers.iter().copied())
                        .collect();
                    match expr.eval(&|name: &str| bindings.get(name).copied()) {
                        Ok(n) => CellValue::Number(n),
                        Err(e) => {
                            diagnostics.push(CalcDiagnostic::Evaluation {
                                target: field.target.clone(),
                                row: Some(row),
                                message: e.to_string(),
                            });
                            CellValue::Empty
                        }
                    }
                }
            }
        })
        .collect()
}

/// 推导实发工资列
pub fn derive_net_pay(table: &mut Table, names: &PayrollFields) -> NetPayBasis {
    let numeric = |table: &Table, column: &str| -> Vec<f64> {
        table
            .column_values(column)
            .map(|v| v.as_number().unwrap_or(0.0))
            .collect()
    };

    let has_gross = table.has_column(&names.gross_pay);
    let has_total = table.has_column(&names.total_deductions);

    let (basis, values): (NetPayBasis, Vec<f64>) = if has_gross && has_total {
        let gross = numeric(table, &names.gross_pay);
        let total = numeric(table, &names.total_deductions);
        let other = if table.has_column(&names.other_withholdings) {
            numeric(table, &names.other_withholdings)
        } else {
            vec![0.0; table.len()]
        };
        let net = gross
            .iter()
            .zip(&total)
            .zip(&other)
            .map(|((g, t), o)| g - t - o)
            .collect();
        (NetPayBasis::GrossMinusDeductions, net)
    } else if has_gross {
        (NetPayBasis::GrossOnly, numeric(table, &names.gross_pay))
    } else {
        (NetPayBasis::Zero, vec![0.0; table.len()])
    };

    table.set_column(&names.net_pay, values.into_iter().map(CellValue::Number).collect());
    basis
}
