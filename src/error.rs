use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误（分类/设备映射、配置值、测试项文件）
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 判定服务错误（仅在分析器内部出现，会被兜底规则吸收）
    #[error("判定服务错误: {0}")]
    Judgment(#[from] JudgmentError),
    /// 编排错误
    #[error("编排错误: {0}")]
    Orchestration(#[from] OrchestrationError),
    /// 文件操作错误
    #[error("文件错误 ({path}): {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// JSON 序列化失败
    #[error("JSON序列化失败: {0}")]
    Json(#[from] serde_json::Error),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 测试分类没有对应的设备命令
    #[error("未知的测试分类，无法映射到设备命令: {category}")]
    UnknownCategory { category: String },
    /// 设备类型标签无法识别
    #[error("未知的设备类型: {label}")]
    UnknownEquipment { label: String },
    /// 配置值不合法
    #[error("配置项 {field} 不合法: {reason}")]
    InvalidValue { field: String, reason: String },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 目录不存在
    #[error("目录不存在: {path}")]
    DirectoryNotFound { path: String },
}

/// 判定服务错误
///
/// 任何一种都视为第一层判定失败，分析器会转入兜底规则。
#[derive(Debug, Error)]
pub enum JudgmentError {
    /// 服务不可达（连接失败、HTTP 错误等）
    #[error("判定服务不可达 (模型: {model}): {reason}")]
    Unreachable { model: String, reason: String },
    /// 服务可达但返回了错误（HTTP 4xx/5xx、响应体无法解析等），不缓存为不可用
    #[error("判定服务返回错误 (模型: {model}): {reason}")]
    ServiceError { model: String, reason: String },
    /// 调用超时
    #[error("判定服务调用超时 ({timeout_secs}秒)")]
    Timeout { timeout_secs: u64 },
    /// 返回内容无法解析为判定结果
    #[error("判定结果格式不正确: {reason}")]
    Malformed { reason: String },
    /// 返回内容为空
    #[error("判定服务返回内容为空 (模型: {model})")]
    EmptyReply { model: String },
    /// 本次运行已确认服务不可用，直接跳过
    #[error("判定服务已被标记为不可用，跳过")]
    Skipped,
}

/// 编排错误
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// 批次状态迁移不合法
    #[error("批次 {batch_id} 状态迁移不合法: {from} -> {to}")]
    InvalidTransition {
        batch_id: String,
        from: String,
        to: String,
    },
    /// 无法创建工作池，任务一个都没有派发
    #[error("无法创建工作池 (并发数: {concurrency}): {reason}")]
    WorkerPool { concurrency: usize, reason: String },
    /// 单个任务发生 panic
    #[error("任务 {task} 执行时发生 panic: {message}")]
    TaskPanicked { task: String, message: String },
    /// 批次被取消
    #[error("批次已取消，{completed}/{total} 个任务完成")]
    Cancelled { completed: usize, total: usize },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件操作错误
    pub fn file(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File {
            path: path.into(),
            source,
        }
    }

    /// 创建配置值错误
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Config(ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        })
    }
}

impl JudgmentError {
    /// 创建格式错误
    pub fn malformed(reason: impl Into<String>) -> Self {
        JudgmentError::Malformed {
            reason: reason.into(),
        }
    }

    /// 是否属于连接层面的失败（用于运行期的可用性缓存）
    pub fn is_connectivity(&self) -> bool {
        matches!(self, JudgmentError::Unreachable { .. })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
