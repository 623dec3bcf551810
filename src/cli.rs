use clap::{Parser, Subcommand};
use regex::Regex;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "payroll-merge")]
#[command(about = "工资表合并工具：源工资表 + 扣款表 + 映射规则 → 工资发放表", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 输出详细日志
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 合并工资表并生成工资发放表
    Run {
        /// 工资表文件或所在文件夹
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// 字段映射规则 JSON
        #[arg(short, long)]
        rules: PathBuf,

        /// 扣款表
        #[arg(short, long)]
        deductions: PathBuf,

        /// 模板表（输出按模板列重排）
        #[arg(short, long)]
        template: Option<PathBuf>,

        /// 源表中用于匹配规则的身份列（省略时交互选择）
        #[arg(short, long)]
        identity_column: Option<String>,

        /// 规则中的身份键（省略时与身份列同名）
        #[arg(short = 'k', long)]
        rule_key: Option<String>,

        /// 工资所属期 (YYYY-MM，默认本月)
        #[arg(short, long)]
        period: Option<Period>,

        /// 单位名称（覆盖配置）
        #[arg(long)]
        unit_name: Option<String>,

        /// 输出文件或文件夹（默认: 当前目录）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 任一文件失败即中止
        #[arg(long)]
        fail_fast: bool,

        /// 忽略规则校验错误
        #[arg(long)]
        skip_validation: bool,
    },

    /// 校验映射规则与输入文件
    Validate {
        /// 工资表文件或所在文件夹
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// 字段映射规则 JSON
        #[arg(short, long)]
        rules: PathBuf,

        /// 扣款表
        #[arg(short, long)]
        deductions: PathBuf,

        /// 模板表
        #[arg(short, long)]
        template: Option<PathBuf>,

        /// 规则中的身份键（用于在消息中标识规则）
        #[arg(short = 'k', long, default_value = "人员身份")]
        rule_key: String,
    },

    /// 显示/编辑设置
    Config {
        /// 设置单位名称
        #[arg(long)]
        set_unit_name: Option<String>,

        /// 显示设置
        #[arg(long)]
        show: bool,
    },
}

/// 工资所属期
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    /// 报表文件名用 YYYYMM
    pub fn compact(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }
}

impl std::str::FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lazy_static::lazy_static! {
            // 2024-03 / 2024-3 / 202403 / 2024年3月
            static ref PERIOD_RE: Regex = Regex::new(r"^(\d{4})\s*(?:[-/.年]\s*)?(\d{1,2})\s*月?$").unwrap();
        }

        let caps = PERIOD_RE
            .captures(s.trim())
            .ok_or_else(|| format!("Unknown period: {}. Use YYYY-MM", s))?;
        let year: i32 = caps[1].parse().map_err(|_| format!("Invalid year: {}", &caps[1]))?;
        let month: u32 = caps[2].parse().map_err(|_| format!("Invalid month: {}", &caps[2]))?;
        if !(1..=12).contains(&month) {
            return Err(format!("Invalid month: {}", month));
        }
        Ok(Period { year, month })
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_formats() {
        let expected = Period { year: 2024, month: 3 };
        for input in ["2024-03", "2024-3", "202403", "2024/03", "2024年3月"] {
            assert_eq!(input.parse::<Period>().unwrap(), expected, "{}", input);
        }
    }

    #[test]
    fn test_period_rejects_invalid() {
        assert!("2024-13".parse::<Period>().is_err());
        assert!("2024-00".parse::<Period>().is_err());
        assert!("March".parse::<Period>().is_err());
    }

    #[test]
    fn test_period_display() {
        let period = Period { year: 2024, month: 3 };
        assert_eq!(period.to_string(), "2024-03");
        assert_eq!(period.compact(), "202403");
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "payroll-merge",
            "run",
            "--rules",
            "rules.json",
            "--deductions",
            "扣款.xlsx",
            "-i",
            "人员身份",
            "--period",
            "2024-03",
            "a.xlsx",
            "b.xlsx",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                sources,
                identity_column,
                period,
                fail_fast,
                ..
            } => {
                assert_eq!(sources.len(), 2);
                assert_eq!(identity_column.as_deref(), Some("人员身份"));
                assert_eq!(period, Some(Period { year: 2024, month: 3 }));
                assert!(!fail_fast);
            }
            _ => panic!("expected run"),
        }
    }
}
