//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问。每个变量是一个实现了
//! [`EnvVar`] 的零大小类型，名称、默认值、说明和解析规则集中在一处。

use std::env;
use std::fmt;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    /// 只在变量被显式设置时返回值，设置了但无效时报错
    fn get_if_set() -> EnvResult<Option<T>> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value).map(Some),
            Err(_) => Ok(None),
        }
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "TRANSBATCH_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }

    /// 禁用颜色输出
    pub struct NoColor;
    impl EnvVar<bool> for NoColor {
        const NAME: &'static str = "NO_COLOR";
        const DEFAULT: Option<bool> = Some(false);
        const DESCRIPTION: &'static str = "Disable colored output when set to any value";

        fn parse(value: &str) -> EnvResult<bool> {
            // NO_COLOR 遵循标准：任何值都表示禁用颜色
            Ok(!value.is_empty())
        }
    }
}

/// 批次翻译相关环境变量
pub mod batch {
    use super::*;

    /// 每轮字符预算
    pub struct RoundCharBudget;
    impl EnvVar<usize> for RoundCharBudget {
        const NAME: &'static str = "TRANSBATCH_ROUND_CHAR_BUDGET";
        const DEFAULT: Option<usize> = Some(crate::translation::config::constants::DEFAULT_ROUND_CHAR_BUDGET);
        const DESCRIPTION: &'static str = "Maximum characters merged into one engine call";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 1_000_000)
        }
    }

    /// 引擎代码页
    pub struct CodePage;
    impl EnvVar<String> for CodePage {
        const NAME: &'static str = "TRANSBATCH_CODE_PAGE";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Legacy code page label of the engine (e.g. shift_jis)";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok(crate::translation::config::constants::DEFAULT_CODE_PAGE.to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            let label = value.trim();
            if encoding_rs::Encoding::for_label(label.as_bytes()).is_none() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!("Unknown encoding label '{}'", value),
                });
            }
            Ok(label.to_string())
        }
    }

    /// 工作线程名称
    pub struct WorkerThreadName;
    impl EnvVar<String> for WorkerThreadName {
        const NAME: &'static str = "TRANSBATCH_WORKER_THREAD_NAME";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Name of the engine worker thread";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok(crate::translation::config::constants::DEFAULT_WORKER_THREAD_NAME.to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            let name = value.trim();
            if name.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Thread name must not be empty".to_string(),
                });
            }
            Ok(name.to_string())
        }
    }
}

/// 辅助函数
fn parse_positive_usize(value: &str, var_name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let num: usize = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid positive number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} exceeds maximum {}", num, max),
        });
    }

    Ok(num)
}

/// 生成环境变量文档
pub fn generate_env_docs() -> String {
    let mut docs = String::from("# Environment Variables\n");

    docs.push_str("\n## Core Configuration\n\n");
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        core::LogLevel::NAME,
        core::LogLevel::DESCRIPTION,
        "info"
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        core::NoColor::NAME,
        core::NoColor::DESCRIPTION,
        core::NoColor::DEFAULT
    ));

    docs.push_str("\n## Batch Configuration\n\n");
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        batch::RoundCharBudget::NAME,
        batch::RoundCharBudget::DESCRIPTION,
        batch::RoundCharBudget::DEFAULT
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        batch::CodePage::NAME,
        batch::CodePage::DESCRIPTION,
        crate::translation::config::constants::DEFAULT_CODE_PAGE
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        batch::WorkerThreadName::NAME,
        batch::WorkerThreadName::DESCRIPTION,
        crate::translation::config::constants::DEFAULT_WORKER_THREAD_NAME
    ));

    docs
}
