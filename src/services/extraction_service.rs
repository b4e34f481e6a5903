//! 词汇提取服务 - 业务能力层
//!
//! 只负责"把图片交给视觉模型，拿回原始文本"，不解析、不保存
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - Gemini 通过 OpenAI 兼容端点访问，图片以 base64 data URL 内联发送
//! - 不自动重试，失败直接交给调用方

use std::future::Future;
use std::sync::{Arc, OnceLock};

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestUserMessageArgs,
        ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
        CreateChatCompletionRequestArgs, ImageDetail, ImageUrl,
    },
    Client,
};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, UpstreamError};
use crate::logger::truncate_text;
use crate::services::image::ImagePayload;
use crate::services::settings_service::CredentialStore;

/// 固定的提取指令
pub const VOCABULARY_PROMPT: &str = "Auf diesem Bild ist eine Vokabelliste aus einem Englischbuch zu sehen. \
Gib die abgebildeten Vokabeln als CSV aus, jeweils als Paar pro Zeile: \
zuerst die deutsche Vokabel, dann die englische. \
Ignoriere Beschreibungen und Lautschrift.";

/// 视觉模型后端
///
/// 返回模型给出的原始文本；失败时返回 `UpstreamError`
pub trait ExtractionBackend: Send + Sync {
    fn extract(
        &self,
        api_key: &str,
        prompt: &str,
        image: &ImagePayload,
    ) -> impl Future<Output = AppResult<String>> + Send;
}

/// OpenAI 兼容的视觉模型（默认 Gemini 2.0 Flash）
#[derive(Debug, Clone)]
pub struct OpenAiVisionBackend {
    api_base_url: String,
    model_name: String,
}

impl OpenAiVisionBackend {
    pub fn new(config: &Config) -> Self {
        Self {
            api_base_url: config.llm_api_base_url.clone(),
            model_name: config.llm_model_name.clone(),
        }
    }

    async fn send(&self, api_key: &str, prompt: &str, image: &ImagePayload) -> anyhow::Result<Option<String>> {
        // 密钥随时可能被修改，每次调用都用当前密钥构造客户端
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(&self.api_base_url);
        let client = Client::with_config(openai_config);

        let content_parts = vec![
            ChatCompletionRequestUserMessageContentPart::Text(
                ChatCompletionRequestMessageContentPartText {
                    text: prompt.to_string(),
                },
            ),
            ChatCompletionRequestUserMessageContentPart::ImageUrl(
                ChatCompletionRequestMessageContentPartImage {
                    image_url: ImageUrl {
                        url: image.to_data_url(),
                        detail: Some(ImageDetail::High),
                    },
                },
            ),
        ];

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Array(content_parts))
            .build()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![ChatCompletionRequestMessage::User(user_msg)])
            .temperature(0.0)
            .max_tokens(4096u32)
            .build()?;

        let response = client.chat().create(request).await?;

        Ok(response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone()))
    }
}

impl ExtractionBackend for OpenAiVisionBackend {
    async fn extract(&self, api_key: &str, prompt: &str, image: &ImagePayload) -> AppResult<String> {
        debug!(
            "调用视觉模型，模型: {}，图片: {} ({} 字节)",
            self.model_name,
            image.mime_type(),
            image.bytes().len()
        );

        match self.send(api_key, prompt, image).await {
            Ok(Some(content)) => Ok(content),
            Ok(None) => Err(AppError::upstream_failure("Der Dienst hat keinen Text zurückgegeben.")),
            Err(e) => {
                let message = e.to_string();
                warn!("视觉模型调用失败: {}", message);
                Err(classify_failure(&message).into())
            }
        }
    }
}

/// 把服务返回的错误消息分成"密钥无效"和"其他失败"
pub fn classify_failure(message: &str) -> UpstreamError {
    if credential_pattern().is_some_and(|re| re.is_match(message)) {
        UpstreamError::InvalidCredential
    } else {
        UpstreamError::Failure {
            message: message.to_string(),
        }
    }
}

fn credential_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"(?i)API_KEY_INVALID|invalid[ _-]?api[ _-]?key|api key not valid|incorrect api key|\b40[13]\b|unauthori[sz]ed|permission[ _]denied",
            )
            .ok()
        })
        .as_ref()
}

/// 提取服务
///
/// 职责：
/// - 读取当前 API 密钥（未配置时不发请求）
/// - 用固定指令调用后端
/// - 只返回原始文本，不关心解析和保存
pub struct ExtractionService<B> {
    backend: B,
    credentials: Arc<CredentialStore>,
    prompt: String,
}

impl<B: ExtractionBackend> ExtractionService<B> {
    pub fn new(backend: B, credentials: Arc<CredentialStore>) -> Self {
        Self {
            backend,
            credentials,
            prompt: VOCABULARY_PROMPT.to_string(),
        }
    }

    /// 替换提取指令
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// 提取原始文本
    pub async fn extract(&self, image: &ImagePayload) -> AppResult<String> {
        let api_key = self
            .credentials
            .get()
            .ok_or(UpstreamError::MissingCredential)?;

        info!("🤖 正在提取词汇...");
        let raw_text = self.backend.extract(&api_key, &self.prompt, image).await?;
        info!("✓ 提取完成，返回 {} 字符", raw_text.chars().count());
        debug!("模型输出: {}", truncate_text(&raw_text, 200));

        Ok(raw_text)
    }
}
