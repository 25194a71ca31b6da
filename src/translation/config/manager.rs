//! 简化的配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值。
//! 优先级：环境变量 > 配置文件 > 默认值。

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::constants;
use crate::translation::error::{helpers, TranslationError, TranslationResult};
use crate::translation::pipeline::encoding::EncodabilityOracle;

/// 批次翻译配置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    /// 每轮合并的原文字符数上限（按字符计）
    pub round_char_budget: usize,
    /// 引擎使用的旧式代码页标签
    pub code_page: String,
    /// 工作线程名称
    pub worker_thread_name: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            round_char_budget: constants::DEFAULT_ROUND_CHAR_BUDGET,
            code_page: constants::DEFAULT_CODE_PAGE.to_string(),
            worker_thread_name: constants::DEFAULT_WORKER_THREAD_NAME.to_string(),
        }
    }
}

impl BatchConfig {
    /// 验证配置
    pub fn validate(&self) -> TranslationResult<()> {
        if self.round_char_budget == 0 {
            return Err(helpers::config_error("轮次字符预算不能为0"));
        }

        if self.worker_thread_name.trim().is_empty() {
            return Err(helpers::config_error("工作线程名称不能为空"));
        }

        EncodabilityOracle::for_label(&self.code_page)?;

        Ok(())
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) -> TranslationResult<()> {
        use crate::env::{batch, EnvVar};

        if let Some(budget) = batch::RoundCharBudget::get_if_set()? {
            self.round_char_budget = budget;
            tracing::info!("环境变量覆盖轮次字符预算: {}", budget);
        }

        if let Some(code_page) = batch::CodePage::get_if_set()? {
            self.code_page = code_page;
            tracing::info!("环境变量覆盖代码页: {}", self.code_page);
        }

        if let Some(name) = batch::WorkerThreadName::get_if_set()? {
            self.worker_thread_name = name;
        }

        Ok(())
    }
}

/// 简化的配置管理器
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: BatchConfig,
}

impl ConfigManager {
    /// 按搜索路径加载配置并应用环境变量
    pub fn new() -> TranslationResult<Self> {
        let config = Self::load_config()?;
        Self::from_config(config)
    }

    /// 从指定文件加载配置并应用环境变量
    pub fn from_file<P: AsRef<Path>>(path: P) -> TranslationResult<Self> {
        let config = Self::load_from_file(path.as_ref())?;
        Self::from_config(config)
    }

    fn from_config(mut config: BatchConfig) -> TranslationResult<Self> {
        config.apply_env_overrides()?;
        config.validate()?;

        Ok(Self { config })
    }

    pub fn into_config(self) -> BatchConfig {
        self.config
    }

    fn load_config() -> TranslationResult<BatchConfig> {
        // 首先尝试加载 .env 文件
        Self::load_dotenv();

        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            let path = Path::new(expanded_path.as_ref());
            if path.exists() {
                tracing::info!("加载配置文件: {}", path.display());
                return Self::load_from_file(path);
            }
        }

        tracing::debug!("未找到配置文件，使用默认配置");
        Ok(BatchConfig::default())
    }

    /// 从指定文件加载配置，按扩展名区分 TOML 和 JSON
    pub fn load_from_file(path: &Path) -> TranslationResult<BatchConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TranslationError::ConfigError(format!("读取配置文件 {} 失败: {}", path.display(), e))
        })?;

        Self::parse(&content, path.extension().and_then(|ext| ext.to_str()))
    }

    /// 解析配置文本，默认按 TOML 处理
    pub fn parse(content: &str, extension: Option<&str>) -> TranslationResult<BatchConfig> {
        match extension {
            Some("json") => Ok(serde_json::from_str(content)?),
            _ => Ok(toml::from_str(content)?),
        }
    }

    fn load_dotenv() {
        for env_file in constants::ENV_FILES {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config<P: AsRef<Path>>(path: P) -> TranslationResult<()> {
        let content = toml::to_string_pretty(&BatchConfig::default())
            .map_err(|e| TranslationError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TranslationError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}
