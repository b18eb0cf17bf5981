use crate::error::{AppError, AppResult, ConfigError};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 同时执行的任务数量
    pub max_concurrent_tasks: usize,
    /// 单个任务中判定服务调用的超时（秒）
    pub judgment_timeout_secs: u64,
    /// 模拟设备延迟的时间单位（毫秒），0 表示不真正等待
    pub latency_unit_ms: u64,
    /// 模拟器随机种子，未设置时使用进程级随机源
    pub simulator_seed: Option<u64>,
    /// 测试项 TOML 文件目录
    pub test_items_folder: String,
    /// 输出报告文件
    pub output_report_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- 判定服务（LLM）配置 ---
    pub llm_enabled: bool,
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 判定服务出现连接失败后，本次运行内不再尝试
    pub skip_judgment_after_unreachable: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 5,
            judgment_timeout_secs: 30,
            latency_unit_ms: 50,
            simulator_seed: None,
            test_items_folder: "test_items".to_string(),
            output_report_file: "validation_report.json".to_string(),
            verbose_logging: false,
            llm_enabled: true,
            llm_api_key: String::new(),
            llm_api_base_url: "http://localhost:11434/v1".to_string(),
            llm_model_name: "llama3.3:latest".to_string(),
            skip_judgment_after_unreachable: true,
        }
    }
}

impl Config {
    /// 从环境变量读取配置，未设置或无法解析的项使用默认值
    pub fn from_env() -> Self {
        Self::default().overlay_env()
    }

    /// 加载配置：默认值 ← TOML 文件（可选）← 环境变量
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let base = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        let config = base.overlay_env();
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件读取配置，缺失字段使用默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file(path.display().to_string(), e))?;
        toml::from_str(&content).map_err(|source| {
            ConfigError::TomlParseFailed {
                path: path.display().to_string(),
                source,
            }
            .into()
        })
    }

    /// 检查配置是否可用
    pub fn validate(&self) -> AppResult<()> {
        if self.max_concurrent_tasks == 0 {
            return Err(AppError::invalid_config("max_concurrent_tasks", "并发数必须大于 0"));
        }
        if self.judgment_timeout_secs == 0 {
            return Err(AppError::invalid_config("judgment_timeout_secs", "超时必须大于 0"));
        }
        Ok(())
    }

    pub fn judgment_timeout(&self) -> Duration {
        Duration::from_secs(self.judgment_timeout_secs)
    }

    pub fn latency_unit(&self) -> Duration {
        Duration::from_millis(self.latency_unit_ms)
    }

    /// 是否需要创建判定服务客户端
    pub fn judgment_configured(&self) -> bool {
        self.llm_enabled && !self.llm_api_base_url.is_empty()
    }

    fn overlay_env(self) -> Self {
        Self {
            max_concurrent_tasks: env_parse("MAX_CONCURRENT_TASKS")
                .unwrap_or(self.max_concurrent_tasks),
            judgment_timeout_secs: env_parse("JUDGMENT_TIMEOUT_SECS")
                .unwrap_or(self.judgment_timeout_secs),
            latency_unit_ms: env_parse("LATENCY_UNIT_MS").unwrap_or(self.latency_unit_ms),
            simulator_seed: env_parse("SIMULATOR_SEED").or(self.simulator_seed),
            test_items_folder: std::env::var("TEST_ITEMS_FOLDER").unwrap_or(self.test_items_folder),
            output_report_file: std::env::var("OUTPUT_REPORT_FILE")
                .unwrap_or(self.output_report_file),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
            llm_enabled: env_parse("LLM_ENABLED").unwrap_or(self.llm_enabled),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(self.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
            skip_judgment_after_unreachable: env_parse("SKIP_JUDGMENT_AFTER_UNREACHABLE")
                .unwrap_or(self.skip_judgment_after_unreachable),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
