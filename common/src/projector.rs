//! 字段投影
//!
//! 按匹配到的规则把一行源数据转换为部分结果行:
//! 1. 简单映射：源字段复制到目标字段（源字段缺失时置空并警告）
//! 2. 复杂映射：暂不计算，只把参与计算的源字段原样带入结果行
//! 3. 规则级属性（除 mappings）写入结果行，不覆盖已有字段

use crate::rules::{FieldMapping, MappingRule};
use crate::types::{CellValue, Row};

/// 投影结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectedRow {
    pub row: Row,
    pub warnings: Vec<String>,
}

/// 按规则投影一行
pub fn project(source: &Row, rule: &MappingRule) -> ProjectedRow {
    let mut row = Row::new();
    let mut warnings = Vec::new();

    for mapping in &rule.mappings {
        match mapping {
            FieldMapping::Simple {
                source_field,
                target_field,
            } => match source.get(source_field) {
                Some(value) => row.set(target_field.as_str(), value.clone()),
                None => {
                    warnings.push(format!(
                        "源字段 '{}' 不存在，目标字段 '{}' 置为空",
                        source_field, target_field
                    ));
                    row.set(target_field.as_str(), CellValue::Empty);
                }
            },
            FieldMapping::Complex { .. } => {}
            FieldMapping::Unrecognized(value) => {
                warnings.push(format!("无法识别的映射格式: {}", value));
            }
        }
    }

    // 计算字段的来源在合并后统一计算时使用
    for mapping in &rule.mappings {
        if let FieldMapping::Complex { source_fields, .. } = mapping {
            for field in source_fields {
                if let Some(value) = source.get(field) {
                    row.set_if_absent(field, value.clone());
                }
            }
        }
    }

    for (key, value) in rule.static_fields() {
        row.set_if_absent(key, value);
    }

    ProjectedRow { row, warnings }
}
