//! 翻译配置管理模块
//!
//! 提供简化的配置管理，支持环境变量、配置文件和默认值

pub mod manager;

// 重新导出主要类型
pub use manager::{BatchConfig, ConfigManager};

/// 配置常量
pub mod constants {
    // 批次处理相关
    /// 每轮合并的原文字符预算
    pub const DEFAULT_ROUND_CHAR_BUDGET: usize = 4000;
    /// 合并轮次时使用的分隔符，切分依赖它是换行符
    pub const ROUND_SEPARATOR: char = '\n';
    pub const DEFAULT_WORKER_THREAD_NAME: &str = "transbatch-worker";

    // 引擎代码页
    pub const DEFAULT_CODE_PAGE: &str = "shift_jis";

    // 转义标记
    pub const ESCAPE_MARKER: &str = "[;:}";
    pub const MARKER_LEAD: char = '[';
    /// 只含一个换行，保证合并文本的换行计数不变
    pub const NEWLINE_ESCAPE: &str = "\r\n";

    /// 重复出现时个数可能被引擎改变的符号
    pub const MUTABLE_SYMBOLS: &[char] = &['─', '―', '#', '\\'];

    /// 单独出现也可能被引擎改写的字符
    ///
    /// `@` 是引擎词典插件自己的转义字符，`-` 可能被改成 `―`。
    pub const UNSAFE_CHARS: &[char] = &['@', '-'];

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "transbatch.toml",
        ".transbatch.toml",
        "transbatch.json",
        "~/.config/transbatch/config.toml",
        "/etc/transbatch/config.toml",
    ];

    pub const ENV_FILES: &[&str] = &[".env.local", ".env"];
}
