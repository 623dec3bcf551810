//! 扣款项合并
//!
//! 以两表都存在的姓名类列为键左连接扣款表，扣款表中的非空值优先。

use crate::error::{Error, Result};
use crate::types::{CellValue, Table};
use std::collections::HashMap;

/// 默认的姓名类关键列（按优先级）
pub const DEFAULT_KEY_COLUMNS: &[&str] = &["姓名", "人员姓名"];

/// 扣款表
#[derive(Debug, Clone, Default)]
pub struct DeductionTable {
    pub table: Table,
    /// 扣款表中找到的关键列
    pub key_column: String,
    /// 参与合并的扣款字段（除关键列以外的所有列）
    pub fields: Vec<String>,
}

impl DeductionTable {
    /// 由读取的扣款表构建
    ///
    /// 扣款字段统一转换为数值，无法转换或空值记为 0。
    pub fn from_table(table: Table, key_aliases: &[String]) -> Result<Self> {
        let key_column = key_aliases
            .iter()
            .find(|k| table.has_column(k))
            .cloned()
            .ok_or_else(|| Error::MissingKeyColumn(key_aliases.to_vec()))?;

        let fields: Vec<String> = table
            .columns()
            .iter()
            .filter(|c| **c != key_column)
            .cloned()
            .collect();

        let mut table = table;
        for field in &fields {
            let values = table
                .column_values(field)
                .map(|v| CellValue::Number(v.as_number().unwrap_or(0.0)))
                .collect();
            table.set_column(field, values);
        }

        Ok(Self {
            table,
            key_column,
            fields,
        })
    }
}

/// 合并结果
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub table: Table,
    /// 实际使用的合并键
    pub key: String,
    /// 找到扣款记录的行数
    pub matched_rows: usize,
    /// 未找到扣款记录的键值（首次出现顺序）
    pub unmatched_keys: Vec<String>,
}

/// 左连接扣款表
///
/// - 合并键取 `key_aliases` 中第一个两表都存在的列，找不到返回 `NoCommonKey`
/// - `deduction_fields` 中的字段先在结果表中补齐空列
/// - 扣款表键重复时取第一条
/// - 扣款表的非空值覆盖原值，空值保留原值
pub fn merge(
    rows: &Table,
    deductions: &Table,
    deduction_fields: &[String],
    key_aliases: &[String],
) -> Result<MergeOutcome> {
    let Some(key) = key_aliases
        .iter()
        .find(|k| rows.has_column(k) && deductions.has_column(k))
    else {
        return Err(Error::NoCommonKey {
            source_keys: key_aliases.iter().filter(|k| rows.has_column(k)).cloned().collect(),
            deduction_keys: key_aliases
                .iter()
                .filter(|k| deductions.has_column(k))
                .cloned()
                .collect(),
        });
    };

    let mut lookup: HashMap<String, usize> = HashMap::new();
    for (idx, value) in deductions.column_values(key).enumerate() {
        if let Some(name) = value.as_key() {
            lookup.entry(name).or_insert(idx);
        }
    }

    let joined_fields: Vec<&String> = deduction_fields
        .iter()
        .filter(|f| *f != key && deductions.has_column(f))
        .collect();

    let mut merged = rows.clone();
    for field in deduction_fields {
        merged.ensure_column(field);
    }

    let mut matched_rows = 0;
    let mut unmatched_keys = Vec::new();
    for idx in 0..merged.len() {
        let name = merged.value(idx, key).as_key();
        let Some(found) = name.as_ref().and_then(|n| lookup.get(n)).copied() else {
            if let Some(name) = name {
                if !unmatched_keys.contains(&name) {
                    unmatched_keys.push(name);
                }
            }
            continue;
        };
        matched_rows += 1;
        for field in &joined_fields {
            let value = deductions.value(found, field);
            if !value.is_empty() {
                merged.set_value(idx, field, value.clone());
            }
        }
    }

    Ok(MergeOutcome {
        table: merged,
        key: key.clone(),
        matched_rows,
        unmatched_keys,
    })
}
