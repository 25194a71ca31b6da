//! 翻译管道模块
//!
//! 提供请求合并与切分、转义编解码以及代码页检测

pub mod batch;
pub mod encoding;
pub mod escape;

// 重新导出主要类型
pub use batch::{PendingTranslation, Round, Work};
pub use encoding::EncodabilityOracle;
pub use escape::{EscapeCodec, Escaped, Sidecar};
