//! 集成测试用的工作簿生成

#![allow(dead_code)]

use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};

/// 写入一个工作表：可解析为数值的单元格写为数值，空字符串跳过
pub fn write_sheet(path: &Path, rows: &[&[&str]]) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            match cell.parse::<f64>() {
                Ok(n) => sheet.write_number(r as u32, c as u16, n).unwrap(),
                Err(_) => sheet.write_string(r as u32, c as u16, *cell).unwrap(),
            };
        }
    }
    workbook.save(path).expect("Failed to write fixture workbook");
}

pub const RULES_JSON: &str = r#"{
    "field_mappings": [
        {
            "人员身份": "在编",
            "编制": "行政",
            "mappings": [
                {"source_field": "姓名", "target_field": "姓名"},
                {"source_field": "岗位工资", "target_field": "岗位工资"},
                {"source_fields": ["岗位工资", "薪级工资", "绩效"], "target_field": "应发工资", "calculation": "sum"},
                {"source_fields": ["公积金", "医保"], "target_field": "扣发合计"}
            ]
        },
        {
            "人员身份": "聘用",
            "编制": "聘用",
            "mappings": [
                {"source_field": "姓名", "target_field": "姓名"},
                {"source_field": "岗位工资", "target_field": "岗位工资"},
                {"source_fields": ["岗位工资", "绩效"], "target_field": "应发工资", "calculation": "岗位工资 + 绩效 * 0.5"},
                {"source_fields": ["公积金", "医保"], "target_field": "扣发合计"}
            ]
        }
    ]
}"#;

pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub sources: PathBuf,
    pub rules: PathBuf,
    pub deductions: PathBuf,
    pub template: PathBuf,
}

/// 两个源文件 + 扣款表 + 模板 + 规则
pub fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let sources = dir.path().join("工资表");
    std::fs::create_dir(&sources).unwrap();

    write_sheet(
        &sources.join("01_机关.xlsx"),
        &[
            &["2024年3月机关工资表"],
            &["单位：某局"],
            &[],
            &["姓名", "人员身份", "岗位工资", "薪级工资", "绩效"],
            &["张三", "在编", "3000", "1000", "500"],
            &["李四", "聘用", "2000", "", "800"],
            &["王五", "临时", "1500", "", ""],
            &["", "合计", "6500", "1000", "1300"],
        ],
    );
    write_sheet(
        &sources.join("02_事业.xlsx"),
        &[
            &["姓名", "人员身份", "岗位工资", "薪级工资", "绩效"],
            &["孙七", "聘用", "2000", "", "800"],
            &["赵六", "在编", "2800", "900", "0"],
        ],
    );

    let deductions = dir.path().join("扣款.xlsx");
    write_sheet(
        &deductions,
        &[
            &["2024年3月扣款表"],
            &[],
            &["序号", "姓名", "公积金", "医保"],
            &["1", "张三", "300", "100"],
            &["2", "李四", "200", "无"],
            &["3", "张三", "999", "999"],
        ],
    );

    let template = dir.path().join("模板.xlsx");
    write_sheet(
        &template,
        &[
            &["模板"],
            &[],
            &["姓名", "编制", "岗位工资", "应发工资", "扣发合计", "实发工资", "备注"],
        ],
    );

    let rules = dir.path().join("rules.json");
    std::fs::write(&rules, RULES_JSON).unwrap();

    Fixture {
        dir,
        sources,
        rules,
        deductions,
        template,
    }
}
