//! 批次翻译模块
//!
//! 为慢速、单线程、会改写空白与符号的翻译引擎提供并发访问：
//! - **core**: 批次翻译服务、引擎接口
//! - **pipeline**: 请求合并与切分、转义编解码、代码页检测
//! - **config**: 配置管理
//! - **error**: 错误处理
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use transbatch::translation::{BatchTranslator, CommandTranslator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = BatchTranslator::from_env(CommandTranslator::new("my-engine"))?;
//!
//! let translated = service.translate("こんにちは  世界").await?;
//! println!("{}", translated);
//!
//! service.shutdown();
//! # Ok(())
//! # }
//! ```

/// 配置管理模块
///
/// 每轮字符预算、引擎代码页、工作线程名称
pub mod config;

/// 核心模块 - 批次翻译服务与引擎接口
pub mod core;

/// 错误处理模块 - 统一的错误类型和处理机制
pub mod error;

/// 管道模块 - 合并、切分与转义
pub mod pipeline;

// ============================================================================
// 核心API导出
// ============================================================================

pub use core::{
    BatchTranslator, CommandTranslator, EscapedTranslator, HealthLevel, HealthStatus,
    ServiceStats, ServiceStatsSnapshot, Translator,
};

pub use config::{constants, BatchConfig, ConfigManager};

pub use error::{ErrorCategory, ErrorSeverity, TranslationError, TranslationResult};

pub use pipeline::{EncodabilityOracle, EscapeCodec, Escaped, PendingTranslation, Sidecar};
