//! 报表布局
//!
//! 表头按字段类别着色；类别按关键字子串匹配，先匹配的类别优先
//! （基本信息 → 统计 → 收入 → 扣款）。

/// 标题行数（标题 + 单位/日期）
pub const BANNER_ROWS: u32 = 2;

/// 默认冻结的列数
pub const DEFAULT_FROZEN_COLUMNS: u16 = 7;

/// 标题字号
pub const TITLE_FONT_SIZE: f64 = 20.0;

/// 单位名称所在列（B）
pub const UNIT_NAME_COL: u16 = 1;

/// 制表时间所在列（G）
pub const DATE_COL: u16 = 6;

/// 列宽在内容宽度之外的余量
pub const COLUMN_PADDING: f64 = 2.0;

/// 表头字段类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldCategory {
    Basic,
    Statistic,
    Income,
    Deduction,
}

const CATEGORY_KEYWORDS: &[(FieldCategory, &[&str])] = &[
    (FieldCategory::Basic, &["姓名", "人员", "部门", "编号", "身份证", "职级"]),
    (FieldCategory::Statistic, &["编制", "身份", "财政供养", "统发", "合计", "小计"]),
    (FieldCategory::Income, &["工资", "津贴", "补贴", "绩效", "奖金"]),
    (FieldCategory::Deduction, &["扣", "缴", "个税", "所得税"]),
];

impl FieldCategory {
    /// 按列名分类，不属于任何类别返回 None
    pub fn classify(column: &str) -> Option<Self> {
        CATEGORY_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| column.contains(k)))
            .map(|(category, _)| *category)
    }

    /// 表头填充色（RGB）
    pub fn fill_color(&self) -> u32 {
        match self {
            FieldCategory::Basic => 0xDCE6F1,
            FieldCategory::Statistic => 0xEAEAEA,
            FieldCategory::Income => 0xE2F0D9,
            FieldCategory::Deduction => 0xFCE4D6,
        }
    }
}

/// 显示宽度：全角字符按 2 计
pub fn display_width(text: &str) -> usize {
    text.chars().map(|c| if c.is_ascii() { 1 } else { 2 }).sum()
}
