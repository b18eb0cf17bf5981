//! LLM 客户端 - 技术实现层
//!
//! 通过 `async-openai` 调用兼容 OpenAI API 的服务（Ollama、Azure 等），
//! 作为第一层语义判定的实现。只负责收发文本，不解析判定结果。

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::JudgmentError;
use crate::services::judgment::{JudgmentPrompt, JudgmentService};

/// LLM 客户端
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl LlmClient {
    /// 根据配置创建客户端
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn send_to_llm(&self, prompt: &JudgmentPrompt) -> Result<String, JudgmentError> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", prompt.user.len());

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(prompt.system.as_str())
            .build()
            .map_err(|e| JudgmentError::malformed(format!("构建系统消息失败: {}", e)))?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt.user.as_str())
            .build()
            .map_err(|e| JudgmentError::malformed(format!("构建用户消息失败: {}", e)))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .temperature(0.3)
            .max_tokens(1024u32)
            .build()
            .map_err(|e| JudgmentError::malformed(format!("构建请求失败: {}", e)))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            classify_error(&self.model_name, e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| JudgmentError::EmptyReply {
                model: self.model_name.clone(),
            })?;

        Ok(content)
    }
}

/// 只有建立连接失败才视为服务不可用，其余错误本次回退、后续照常调用
fn classify_error(model: &str, err: OpenAIError) -> JudgmentError {
    match err {
        OpenAIError::Reqwest(e) if e.is_connect() => JudgmentError::Unreachable {
            model: model.to_string(),
            reason: e.to_string(),
        },
        other => JudgmentError::ServiceError {
            model: model.to_string(),
            reason: other.to_string(),
        },
    }
}

#[async_trait]
impl JudgmentService for LlmClient {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn judge(&self, prompt: &JudgmentPrompt) -> Result<String, JudgmentError> {
        self.send_to_llm(prompt).await
    }
}
