//! 扫描流程 - 流程层
//!
//! 核心职责：定义"一张图片"的完整处理流程
//!
//! 流程顺序：
//! 1. 提取：图片 + 固定指令 → 原始文本
//! 2. 解析：原始文本 → 词汇对
//! 3. 保存：用户确认名称后写入存储

use tracing::{info, warn};

use crate::error::{AppResult, ValidationError};
use crate::models::{Page, VocabularyPair};
use crate::parser::parse_pairs;
use crate::services::{ExtractionBackend, ExtractionService, ImagePayload};
use crate::store::LibraryStore;
use crate::workflow::request_guard::{RequestGuard, RequestTicket};

/// 一次提取的结果，等待用户决定是否保存
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub ticket: RequestTicket,
    pub raw_text: String,
    pub pairs: Vec<VocabularyPair>,
    /// 预览图（data URL）
    pub preview_image: Option<String>,
}

/// 提取结果
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    Completed(Extraction),
    /// 期间用户又发起了新请求，此结果已作废
    Superseded,
}

/// 扫描流程
///
/// - 编排 提取 → 解析 → 保存
/// - 不持有存储，保存时由调用方传入
pub struct ScanFlow<B> {
    extraction: ExtractionService<B>,
    guard: RequestGuard,
}

impl<B: ExtractionBackend> ScanFlow<B> {
    pub fn new(extraction: ExtractionService<B>) -> Self {
        Self {
            extraction,
            guard: RequestGuard::new(),
        }
    }

    pub fn extraction_service(&self) -> &ExtractionService<B> {
        &self.extraction
    }

    /// 提取并解析
    ///
    /// 没有图片时返回校验错误，不发请求
    pub async fn extract(&self, image: Option<&ImagePayload>) -> AppResult<ExtractionOutcome> {
        let image = image.ok_or(ValidationError::MissingImage)?;
        let ticket = self.guard.begin();

        let result = self.extraction.extract(image).await;
        if !self.guard.is_current(ticket) {
            warn!("⚠️ 丢弃过期的提取结果");
            return Ok(ExtractionOutcome::Superseded);
        }

        let raw_text = result?;
        let pairs = parse_pairs(&raw_text);
        info!("✓ 解析出 {} 个词汇对", pairs.len());

        Ok(ExtractionOutcome::Completed(Extraction {
            ticket,
            raw_text,
            pairs,
            preview_image: Some(image.to_data_url()),
        }))
    }

    /// 保存提取结果
    ///
    /// 名称为空、原始文本为空或没有有效词汇对时返回校验错误，不写入任何数据
    pub fn save(
        &self,
        store: &mut dyn LibraryStore,
        name: &str,
        extraction: &Extraction,
    ) -> AppResult<Page> {
        if name.trim().is_empty() {
            return Err(ValidationError::BlankListName.into());
        }
        if extraction.raw_text.trim().is_empty() {
            return Err(ValidationError::EmptyRawText.into());
        }
        if extraction.pairs.is_empty() {
            return Err(ValidationError::NoPairs.into());
        }

        let page = store.create_page(
            name,
            extraction.pairs.clone(),
            &extraction.raw_text,
            extraction.preview_image.clone(),
        )?;
        info!(
            "💾 词汇表 \"{}\" 已保存 ({} 个词汇对)",
            page.name,
            page.pairs.len()
        );
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::services::CredentialStore;
    use crate::store::MemoryStore;
    use std::sync::Arc;
    use std::time::Duration;

    /// 按图片第一个字节决定延迟，返回固定文本
    struct DelayedBackend;

    impl ExtractionBackend for DelayedBackend {
        async fn extract(&self, _api_key: &str, _prompt: &str, image: &ImagePayload) -> AppResult<String> {
            let delay = u64::from(image.bytes()[0]);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(format!("Bild{},image{}", delay, delay))
        }
    }

    fn flow() -> ScanFlow<DelayedBackend> {
        let credentials = Arc::new(CredentialStore::in_memory());
        credentials.set("key").unwrap();
        ScanFlow::new(ExtractionService::new(DelayedBackend, credentials))
    }

    fn image(delay_ms: u8) -> ImagePayload {
        ImagePayload::new(vec![delay_ms], "image/jpeg", 1024).unwrap()
    }

    fn completed(outcome: ExtractionOutcome) -> Extraction {
        match outcome {
            ExtractionOutcome::Completed(extraction) => extraction,
            ExtractionOutcome::Superseded => panic!("unexpected superseded result"),
        }
    }

    #[tokio::test]
    async fn test_missing_image() {
        let err = flow().extract(None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::MissingImage)));
    }

    #[tokio::test]
    async fn test_stale_result_is_discarded() {
        let flow = flow();
        let slow = image(80);
        let fast = image(1);

        let (first, second) = tokio::join!(flow.extract(Some(&slow)), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            flow.extract(Some(&fast)).await
        });

        assert_eq!(first.unwrap(), ExtractionOutcome::Superseded);
        let extraction = completed(second.unwrap());
        assert_eq!(extraction.raw_text, "Bild1,image1");
    }

    #[tokio::test]
    async fn test_extract_and_save() {
        let flow = flow();
        let mut store = MemoryStore::new();
        let extraction = completed(flow.extract(Some(&image(0))).await.unwrap());
        assert_eq!(extraction.pairs.len(), 1);
        assert!(extraction.preview_image.as_deref().unwrap().starts_with("data:image/jpeg;base64,"));

        let page = flow.save(&mut store, " Unit 1 ", &extraction).unwrap();
        assert_eq!(page.name, "Unit 1");
        assert_eq!(page.raw_text, "Bild0,image0");
        assert_eq!(store.list_pages().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_save_validation_leaves_store_untouched() {
        let flow = flow();
        let mut store = MemoryStore::new();
        let extraction = completed(flow.extract(Some(&image(0))).await.unwrap());

        let err = flow.save(&mut store, "  ", &extraction).unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::BlankListName)));

        let empty = Extraction {
            raw_text: "   ".to_string(),
            pairs: Vec::new(),
            ..extraction.clone()
        };
        let err = flow.save(&mut store, "Unit", &empty).unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::EmptyRawText)));

        let unparsable = Extraction {
            raw_text: "Hier ist keine Liste".to_string(),
            pairs: parse_pairs("Hier ist keine Liste"),
            ..extraction
        };
        let err = flow.save(&mut store, "Unit", &unparsable).unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::NoPairs)));

        assert!(store.list_pages().unwrap().is_empty());
    }
}
