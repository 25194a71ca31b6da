//! 翻译模块统一错误处理
//!
//! 提供结构化错误类型和错误处理机制。错误需要 `Clone`，
//! 因为同一轮次失败时要把同一个错误交付给该轮次内的每一个请求。

use std::fmt;

use thiserror::Error;

/// 翻译错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    /// 翻译引擎调用失败
    #[error("翻译引擎失败: {0}")]
    TranslationFailure(String),

    /// 转义标记与保留片段数量不一致
    ///
    /// 说明引擎损坏或复制了转义标记，继续还原会静默地错配文本。
    #[error("转义还原不一致: 输出中有 {markers} 个转义标记，保留了 {preserved} 个片段")]
    CodecConsistency { markers: usize, preserved: usize },

    /// 请求在进入批次前被取消，或调度器已关闭
    #[error("翻译请求已取消")]
    Cancelled,

    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 解析错误
    #[error("解析错误: {0}")]
    ParseError(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl TranslationError {
    /// 检查错误是否可重试
    ///
    /// 调度器自身从不重试，这里只是给调用方的提示。
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslationError::TranslationFailure(_) => true,
            TranslationError::CodecConsistency { .. } => false,
            TranslationError::Cancelled => false,
            TranslationError::ConfigError(_) => false,
            TranslationError::ParseError(_) => false,
            TranslationError::InternalError(_) => false,
        }
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TranslationError::TranslationFailure(_) => ErrorSeverity::Error,
            TranslationError::CodecConsistency { .. } => ErrorSeverity::Critical,
            TranslationError::Cancelled => ErrorSeverity::Info,
            TranslationError::ConfigError(_) => ErrorSeverity::Critical,
            TranslationError::ParseError(_) => ErrorSeverity::Error,
            TranslationError::InternalError(_) => ErrorSeverity::Critical,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            TranslationError::TranslationFailure(_) => ErrorCategory::Engine,
            TranslationError::CodecConsistency { .. } => ErrorCategory::Codec,
            TranslationError::Cancelled => ErrorCategory::Cancellation,
            TranslationError::ConfigError(_) => ErrorCategory::Configuration,
            TranslationError::ParseError(_) => ErrorCategory::Parsing,
            TranslationError::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(mut self, context: T) -> Self {
        let new_msg = format!("{} (上下文: {})", self, context);

        match &mut self {
            TranslationError::TranslationFailure(ref mut msg) => *msg = new_msg,
            TranslationError::ConfigError(ref mut msg) => *msg = new_msg,
            TranslationError::ParseError(ref mut msg) => *msg = new_msg,
            TranslationError::InternalError(ref mut msg) => *msg = new_msg,
            TranslationError::CodecConsistency { .. } | TranslationError::Cancelled => {}
        }

        self
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Engine,
    Codec,
    Cancellation,
    Configuration,
    Parsing,
    Internal,
}

/// 标准错误转换
impl From<std::io::Error> for TranslationError {
    fn from(error: std::io::Error) -> Self {
        TranslationError::InternalError(format!("IO错误: {}", error))
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(error: serde_json::Error) -> Self {
        TranslationError::ParseError(format!("JSON解析错误: {}", error))
    }
}

impl From<toml::de::Error> for TranslationError {
    fn from(error: toml::de::Error) -> Self {
        TranslationError::ParseError(format!("TOML解析错误: {}", error))
    }
}

impl From<regex::Error> for TranslationError {
    fn from(error: regex::Error) -> Self {
        TranslationError::InternalError(format!("正则表达式错误: {}", error))
    }
}

impl From<crate::env::EnvError> for TranslationError {
    fn from(error: crate::env::EnvError) -> Self {
        TranslationError::ConfigError(error.to_string())
    }
}

/// 错误结果类型别名
pub type TranslationResult<T> = Result<T, TranslationError>;

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 按严重程度记录错误
    pub fn log(error: &TranslationError) {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!("翻译信息: {}", error),
            ErrorSeverity::Warning => tracing::warn!("翻译警告: {}", error),
            ErrorSeverity::Error => tracing::error!("翻译错误: {}", error),
            ErrorSeverity::Critical => tracing::error!("翻译严重错误: {}", error),
        }
    }

    /// 创建翻译引擎错误
    pub fn engine_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::TranslationFailure(msg.to_string())
    }

    /// 创建配置错误
    pub fn config_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::ConfigError(msg.to_string())
    }

    /// 创建内部错误
    pub fn internal_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::InternalError(msg.to_string())
    }
}
