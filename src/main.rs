use chrono::{Datelike, Local};
use clap::Parser;
use payroll_merge::{batch, cli, column_selector, config, error, export};
use payroll_merge_common::{LogLevel, RunLog, ValidationReport};
use cli::{Cli, Commands, Period};
use config::Config;
use error::{PayrollError, Result};

fn print_log(log: &RunLog, verbose: bool) {
    for entry in log.entries() {
        if entry.level == LogLevel::Info && !verbose {
            continue;
        }
        let line = format!(
            "[{}] {} {}",
            Local::now().format("%H:%M:%S"),
            entry.level.glyph(),
            entry.message
        );
        match entry.level {
            LogLevel::Error | LogLevel::Warning => eprintln!("{}", line),
            _ => println!("{}", line),
        }
    }
}

fn print_validation(report: &ValidationReport) {
    println!(
        "简单映射: 有效 {} 个，源字段缺失 {} 个",
        report.valid_simple, report.invalid_simple
    );
    for warning in &report.warnings {
        println!("⚠ {}", warning);
    }
    for error in &report.errors {
        println!("❌ {}", error);
    }
    if report.is_ok() {
        println!("✔ 校验通过");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Run {
            sources,
            rules,
            deductions,
            template,
            identity_column,
            rule_key,
            period,
            unit_name,
            output,
            fail_fast,
            skip_validation,
        } => {
            println!("📊 payroll-merge - 工资表合并\n");

            let mut config = config;
            if let Some(name) = unit_name {
                config.unit_name = name;
            }

            // 1. 读取输入
            println!("[1/4] 读取输入文件...");
            let inputs = batch::Inputs::load(&sources, &rules, &deductions, template.as_deref(), &config)?;
            println!("✔ 工资表 {} 个\n", inputs.sources.len());

            // 2. 身份列与规则校验
            let identity_column = match identity_column {
                Some(column) => column,
                None => {
                    let header = inputs.sample_header(&config).ok_or_else(|| {
                        PayrollError::Config("无法从源文件检测表头，请使用 --identity-column 指定".into())
                    })?;
                    column_selector::select_identity_column(&header)?
                }
            };
            let rule_key = rule_key.unwrap_or_else(|| identity_column.clone());

            println!("[2/4] 校验映射规则...");
            let report = inputs.validate(&config, &rule_key);
            print_validation(&report);
            if !report.is_ok() {
                if skip_validation {
                    println!("⚠ 已忽略校验错误");
                } else {
                    return Err(PayrollError::Validation(report.errors.len()));
                }
            }
            println!();

            // 3. 批处理
            println!("[3/4] 处理工资表...");
            let options = batch::BatchOptions {
                identity_column,
                rule_key,
                fail_fast,
            };
            let result = batch::run_batch(&inputs, &config, &options)?;
            print_log(&result.log, cli.verbose);
            let warnings = result.log.count(LogLevel::Warning);
            let errors = result.log.count(LogLevel::Error);
            if warnings + errors > 0 {
                println!("日志: 警告 {} 条，错误 {} 条", warnings, errors);
            }
            println!();

            if result.table.is_empty() {
                println!("❌ 没有成功处理的数据，未生成报表");
                return Ok(());
            }

            // 4. 输出
            println!("[4/4] 生成工资发放表...");
            let now = Local::now();
            let period = period.unwrap_or(Period {
                year: now.year(),
                month: now.month(),
            });
            let date_line = now.format("制表时间：%Y 年 %m 月 %d 日").to_string();
            let report_options = config.report_options(period.year, period.month, date_line);
            let output_path = export::report_path(output.as_deref(), &config.unit_name, &period);
            export::excel::write_report(&result.table, &report_options, &output_path)?;
            println!("✔ 报表输出: {}", output_path.display());

            if result.failed() > 0 {
                println!("\n⚠ 完成（{} 个文件失败）", result.failed());
            } else {
                println!("\n✅ 完成");
            }
        }

        Commands::Validate {
            sources,
            rules,
            deductions,
            template,
            rule_key,
        } => {
            println!("🔍 payroll-merge - 规则校验\n");

            let inputs = batch::Inputs::load(&sources, &rules, &deductions, template.as_deref(), &config)?;
            print_log(&inputs.log, cli.verbose);
            let report = inputs.validate(&config, &rule_key);
            print_validation(&report);

            if !report.is_ok() {
                return Err(PayrollError::Validation(report.errors.len()));
            }
        }

        Commands::Config { set_unit_name, show } => {
            let mut config = config;

            if let Some(name) = set_unit_name {
                config.set_unit_name(name)?;
                println!("✔ 已设置单位名称");
            }

            if show {
                println!("设置:");
                println!("  单位名称: {}", config.unit_name);
                println!("  标题模板: {}", config.title_template);
                println!("  表头扫描行数: {}", config.scan_rows());
                println!("  扣款表表头行: {}", config.deduction_header_row + 1);
                println!("  模板表头行: {}", config.template_header_row + 1);
                println!("  姓名关键列: {:?}", config.key_aliases);
                println!("  汇总关键字: {:?}", config.summary_keywords);
                println!(
                    "  工资字段: 应发 '{}' / 扣发 '{}' / 其他补扣 '{}' / 实发 '{}'",
                    config.payroll_fields.gross_pay,
                    config.payroll_fields.total_deductions,
                    config.payroll_fields.other_withholdings,
                    config.payroll_fields.net_pay
                );
                println!("  冻结列数: {}", config.frozen_columns);
                println!("  配置文件: {}", Config::config_path()?.display());
            }
        }
    }

    Ok(())
}
