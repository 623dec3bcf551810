//! 身份列交互选择

use crate::error::{PayrollError, Result};
use dialoguer::Select;

/// 常见的身份列名（按优先级），用作默认选中项
const PREFERRED_COLUMNS: &[&str] = &["人员身份", "人员类别", "身份", "编制"];

/// 默认选中项：优先常见身份列，否则第一个非 `Unnamed` 列
pub fn default_index(columns: &[String]) -> usize {
    PREFERRED_COLUMNS
        .iter()
        .find_map(|preferred| columns.iter().position(|c| c == preferred))
        .or_else(|| columns.iter().position(|c| !c.starts_with("Unnamed")))
        .unwrap_or(0)
}

/// 从表头中选择身份列
pub fn select_identity_column(columns: &[String]) -> Result<String> {
    let owned: Vec<String> = columns
        .iter()
        .filter(|c| !c.starts_with("Unnamed"))
        .cloned()
        .collect();
    if owned.is_empty() {
        return Err(PayrollError::Config(
            "源文件中没有可选的列，请使用 --identity-column 指定".into(),
        ));
    }

    println!("\n📋 请选择用于匹配规则的身份列:\n");
    let selection = Select::new()
        .with_prompt("身份列")
        .items(&owned)
        .default(default_index(&owned))
        .interact_opt()
        .map_err(|e| PayrollError::Config(e.to_string()))?;

    match selection {
        Some(index) => {
            println!("→ 使用 '{}'", owned[index]);
            Ok(owned[index].clone())
        }
        None => Err(PayrollError::Config("未选择身份列".into())),
    }
}
