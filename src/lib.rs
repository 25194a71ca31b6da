//! # transbatch
//!
//! 把慢速、单线程、会改写空白与符号的翻译引擎包装成可以并发使用的翻译服务。
//!
//! ## 模块组织
//!
//! - `translation` - 批次翻译服务、转义编解码、配置与错误处理
//! - `env` - 类型化的环境变量

pub mod env;
pub mod translation;

pub use translation::{BatchConfig, BatchTranslator, TranslationError, TranslationResult, Translator};
