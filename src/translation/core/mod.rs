//! 翻译核心模块
//!
//! 把单线程、调用开销大的翻译引擎包装成可以并发使用的服务。
//!
//! ## 架构设计
//!
//! - **服务层** (`service.rs`): 请求队列、工作线程、按轮次合并与交付
//! - **引擎层** (`engine.rs`): 引擎接口，以及在调用前后做转义处理的包装
//! - **命令引擎** (`command.rs`): 把外部命令当作翻译引擎使用
//!
//! ## 模块依赖关系
//!
//! ```text
//! BatchTranslator (service.rs)
//!     ├── drain_round / Round (pipeline/batch.rs)
//!     ├── BatchConfig (config/manager.rs)
//!     └── EscapedTranslator (engine.rs)
//!             ├── EscapeCodec (pipeline/escape.rs)
//!             │       └── EncodabilityOracle (pipeline/encoding.rs)
//!             └── Translator (调用方提供)
//! ```

pub mod command;
pub mod engine;
pub mod service;

/// 批次翻译服务 - 主要的对外接口
pub use service::BatchTranslator;

/// 引擎接口与转义包装
pub use engine::{EscapedTranslator, Translator};

/// 外部命令引擎
pub use command::CommandTranslator;

/// 服务统计与健康状态
pub use service::{HealthLevel, HealthStatus, ServiceStats, ServiceStatsSnapshot};
