use thiserror::Error;

#[derive(Error, Debug)]
pub enum PayrollError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件夹不存在: {0}")]
    FolderNotFound(String),

    #[error("没有找到工资表文件: {0}")]
    NoSourceFiles(String),

    #[error("读取表格失败 ({path}): {message}")]
    SpreadsheetRead { path: String, message: String },

    #[error("规则校验未通过（{0} 个错误），可使用 --skip-validation 跳过")]
    Validation(usize),

    #[error("Excel生成错误: {0}")]
    ExcelGeneration(String),

    #[error("批处理中止 ({file}): {source}")]
    BatchAborted {
        file: String,
        #[source]
        source: Box<PayrollError>,
    },

    #[error("JSON解析错误: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] payroll_merge_common::Error),
}

impl PayrollError {
    pub fn spreadsheet(path: &std::path::Path, message: impl std::fmt::Display) -> Self {
        PayrollError::SpreadsheetRead {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    /// 只影响单个源文件的错误（该文件输出空结果，其余文件继续）
    pub fn is_per_file(&self) -> bool {
        match self {
            PayrollError::SpreadsheetRead { .. } => true,
            PayrollError::Common(e) => e.is_recoverable(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, PayrollError>;
