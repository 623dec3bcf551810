use crate::error::{PayrollError, Result};
use payroll_merge_common::calc::PayrollFields;
use payroll_merge_common::export::excel_core::ReportOptions;
use payroll_merge_common::header::DEFAULT_SCAN_ROWS;
use payroll_merge_common::layout::DEFAULT_FROZEN_COLUMNS;
use payroll_merge_common::merger::DEFAULT_KEY_COLUMNS;
use payroll_merge_common::pipeline::{PipelineOptions, DEFAULT_SUMMARY_KEYWORDS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 表头扫描行数的上限
pub const MAX_SCAN_ROWS: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub unit_name: String,
    /// 标题模板，`{year}` `{month}` 会被替换（月份补零两位）
    pub title_template: String,
    pub header_scan_rows: usize,
    /// 扣款表表头行（0 起）
    pub deduction_header_row: usize,
    /// 模板表头行（0 起）
    pub template_header_row: usize,
    pub key_aliases: Vec<String>,
    pub summary_keywords: Vec<String>,
    pub payroll_fields: PayrollFields,
    pub frozen_columns: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            unit_name: "高新区财政局".into(),
            title_template: "{year}年{month}月工资基金 机关工资发放表（实发）".into(),
            header_scan_rows: DEFAULT_SCAN_ROWS,
            deduction_header_row: 2,
            template_header_row: 2,
            key_aliases: DEFAULT_KEY_COLUMNS.iter().map(|s| s.to_string()).collect(),
            summary_keywords: DEFAULT_SUMMARY_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            payroll_fields: PayrollFields::default(),
            frozen_columns: DEFAULT_FROZEN_COLUMNS,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// 指定路径读取，文件不存在时使用默认值
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| PayrollError::Config("找不到用户主目录".into()))?;
        Ok(home.join(".config").join("payroll-merge").join("config.json"))
    }

    pub fn set_unit_name(&mut self, name: String) -> Result<()> {
        self.unit_name = name;
        self.save()
    }

    /// 扫描行数限制在 10–20 行
    pub fn scan_rows(&self) -> usize {
        self.header_scan_rows.clamp(DEFAULT_SCAN_ROWS, MAX_SCAN_ROWS)
    }

    pub fn pipeline_options(&self, identity_column: &str, rule_key: &str) -> PipelineOptions {
        PipelineOptions {
            scan_rows: self.scan_rows(),
            key_aliases: self.key_aliases.clone(),
            summary_keywords: self.summary_keywords.clone(),
            payroll_fields: self.payroll_fields.clone(),
            ..PipelineOptions::new(identity_column, rule_key)
        }
    }

    pub fn render_title(&self, year: i32, month: u32) -> String {
        self.title_template
            .replace("{year}", &year.to_string())
            .replace("{month}", &format!("{:02}", month))
    }

    pub fn report_options(&self, year: i32, month: u32, date_line: String) -> ReportOptions {
        ReportOptions {
            title: self.render_title(year, month),
            unit_name: self.unit_name.clone(),
            date_line,
            frozen_columns: self.frozen_columns,
            ..ReportOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_render_title_pads_month() {
        let config = Config::default();
        assert_eq!(config.render_title(2024, 3), "2024年03月工资基金 机关工资发放表（实发）");
    }

    #[test]
    fn test_scan_rows_clamped() {
        let mut config = Config::default();
        config.header_scan_rows = 50;
        assert_eq!(config.scan_rows(), 20);
        config.header_scan_rows = 3;
        assert_eq!(config.scan_rows(), 10);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"unit_name": "某局"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.unit_name, "某局");
        assert_eq!(config.deduction_header_row, 2);
        assert_eq!(config.payroll_fields.net_pay, "实发工资");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("nested").join("config.json");
        let mut config = Config::default();
        config.frozen_columns = 3;

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_gives_default() {
        let dir = tempdir().expect("Failed to create temp dir");
        let config = Config::load_from(&dir.path().join("none.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_pipeline_options_carry_config() {
        let mut config = Config::default();
        config.summary_keywords = vec!["小计".into()];
        let options = config.pipeline_options("人员类别", "人员身份");
        assert_eq!(options.identity_column, "人员类别");
        assert_eq!(options.rule_key, "人员身份");
        assert_eq!(options.summary_keywords, vec!["小计"]);
    }
}
