//! 错误类型定义

use crate::pipeline::PipelineStage;
use thiserror::Error;

/// 公共错误类型
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    /// 映射规则文件结构错误（缺少 field_mappings 等）
    #[error("映射规则无效: {0}")]
    InvalidRuleset(String),

    #[error("未在前 {scanned} 行找到包含 '{keyword}' 的表头行")]
    HeaderNotFound { keyword: String, scanned: usize },

    #[error("找不到公共合并列。源表候选: {source_keys:?}，扣款表候选: {deduction_keys:?}")]
    NoCommonKey {
        source_keys: Vec<String>,
        deduction_keys: Vec<String>,
    },

    #[error("缺少关键标识列（需要 {0:?} 之一）")]
    MissingKeyColumn(Vec<String>),

    #[error("表达式错误: {0}")]
    Expression(String),

    #[error("[{stage}] {source}")]
    Pipeline {
        stage: PipelineStage,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// 附加流水线阶段信息
    pub fn at_stage(self, stage: PipelineStage) -> Self {
        Error::Pipeline {
            stage,
            source: Box::new(self),
        }
    }

    /// 按文件可恢复的错误（该文件输出空结果，批处理可继续）
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::HeaderNotFound { .. } | Error::NoCommonKey { .. } => true,
            Error::Pipeline { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error = Error::Io(io_error);
        let display = format!("{}", error);
        assert!(display.contains("IO error"));
        assert!(display.contains("file not found"));
    }

    #[test]
    fn test_error_display_config() {
        let error = Error::Config("配置文件不存在".to_string());
        assert_eq!(format!("{}", error), "Config error: 配置文件不存在");
    }

    #[test]
    fn test_error_from_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: Error = json_error.into();
        assert!(matches!(error, Error::Json(_)));
    }

    #[test]
    fn test_header_not_found_display() {
        let error = Error::HeaderNotFound {
            keyword: "人员身份".to_string(),
            scanned: 10,
        };
        let display = format!("{}", error);
        assert!(display.contains("人员身份"));
        assert!(display.contains("10"));
    }

    #[test]
    fn test_pipeline_stage_wrapping() {
        let error = Error::HeaderNotFound {
            keyword: "姓名".to_string(),
            scanned: 10,
        }
        .at_stage(PipelineStage::HeaderDetect);

        let display = format!("{}", error);
        assert!(display.starts_with("[表头检测]"));
        assert!(error.is_recoverable());
    }

    #[test]
    fn test_io_error_not_recoverable() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error: Error = io_error.into();
        assert!(!error.is_recoverable());
    }
}
