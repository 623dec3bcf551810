//! 表格数据类型
//!
//! - CellValue: 单元格值（空 / 数值 / 文本）
//! - Row: 有序的 列名 → 值 映射
//! - Table: 有序列结构 + 行集合，拼接时取列的并集

use std::fmt;

/// 单元格值
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellValue {
    /// 缺失值（对应空单元格或无法计算的结果）
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

static EMPTY: CellValue = CellValue::Empty;

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// 空值或只含空白的文本
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// 数值转换：数值直接返回，文本按去空白后解析，失败或空值返回 None
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            CellValue::Empty => None,
        }
    }

    /// 以字符串形式比较用（匹配键、身份值）
    pub fn as_key(&self) -> Option<String> {
        let text = self.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// 身份值：原样文本（不去空白），空白单元格为 None
    pub fn as_identity(&self) -> Option<String> {
        let text = self.to_string();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            // 整数不带小数点
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<Option<f64>> for CellValue {
    fn from(n: Option<f64>) -> Self {
        n.map(CellValue::Number).unwrap_or_default()
    }
}

/// 一行数据（保持列顺序）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, CellValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// 取值，不存在的列视为空值
    pub fn value(&self, column: &str) -> &CellValue {
        self.get(column).unwrap_or(&EMPTY)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.cells.iter().any(|(name, _)| name == column)
    }

    /// 设置值（已存在则覆盖，否则追加到末尾）
    pub fn set(&mut self, column: impl Into<String>, value: CellValue) {
        let column = column.into();
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.cells.push((column, value)),
        }
    }

    /// 仅在列不存在时设置，返回是否写入
    pub fn set_if_absent(&mut self, column: &str, value: CellValue) -> bool {
        if self.contains(column) {
            return false;
        }
        self.cells.push((column.to_string(), value));
        true
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, CellValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, CellValue)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (name, value) in iter {
            row.set(name, value);
        }
        row
    }
}

/// 表格：列结构 + 行
///
/// 某行缺少的列读取为空值；"列存在"始终指列结构中存在。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// 由若干行构建，列结构为各行列名按首次出现顺序的并集
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut table = Table::default();
        for row in rows {
            table.push_row(row);
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// 列不存在时追加（所有行为空值）
    pub fn ensure_column(&mut self, column: &str) {
        if !self.has_column(column) {
            self.columns.push(column.to_string());
        }
    }

    pub fn push_row(&mut self, row: Row) {
        for name in row.columns() {
            if !self.has_column(name) {
                self.columns.push(name.to_string());
            }
        }
        self.rows.push(row);
    }

    pub fn value(&self, row: usize, column: &str) -> &CellValue {
        self.rows.get(row).map(|r| r.value(column)).unwrap_or(&EMPTY)
    }

    pub fn set_value(&mut self, row: usize, column: &str, value: CellValue) {
        self.ensure_column(column);
        if let Some(r) = self.rows.get_mut(row) {
            r.set(column, value);
        }
    }

    /// 整列赋值（长度与行数一致）
    pub fn set_column(&mut self, column: &str, values: Vec<CellValue>) {
        self.ensure_column(column);
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.set(column, value);
        }
    }

    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a CellValue> + 'a {
        self.rows.iter().map(move |r| r.value(column))
    }

    /// 列中首次出现顺序的不重复非空值
    pub fn unique_keys(&self, column: &str) -> Vec<String> {
        let mut seen = Vec::new();
        for value in self.column_values(column) {
            if let Some(key) = value.as_key() {
                if !seen.contains(&key) {
                    seen.push(key);
                }
            }
        }
        seen
    }

    /// 列中不同的身份值（原样文本，出现顺序）
    pub fn distinct_identities(&self, column: &str) -> Vec<String> {
        let mut seen = Vec::new();
        for value in self.column_values(column) {
            if let Some(identity) = value.as_identity() {
                if !seen.contains(&identity) {
                    seen.push(identity);
                }
            }
        }
        seen
    }

    /// 纵向拼接，列结构取并集
    pub fn concat(tables: impl IntoIterator<Item = Table>) -> Table {
        let mut combined = Table::default();
        for table in tables {
            for column in &table.columns {
                combined.ensure_column(column);
            }
            combined.rows.extend(table.rows);
        }
        combined
    }

    /// 按给定列表重建列结构：丢弃不在列表中的列，缺少的列补空值
    pub fn reindex(&self, columns: &[String]) -> Table {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|c| (c.clone(), row.value(c).clone()))
                    .collect::<Row>()
            })
            .collect();
        Table {
            columns: columns.to_vec(),
            rows,
        }
    }
}
