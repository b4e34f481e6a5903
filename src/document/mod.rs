//! 试卷文档生成
//!
//! - `grading` - 评分表计算
//! - `layout` - 分页排版
//! - `render` - 写成 PDF
//! - `viewer` - 生成结果的持有与释放

pub mod grading;
pub mod layout;
pub mod render;
pub mod viewer;

pub use grading::{GradeBand, GradeRange, GradingScale};
pub use layout::{SheetGeometry, SheetLabels, SheetLayout, SheetLayoutEngine};
pub use viewer::{DocumentViewer, ViewerState};

use chrono::NaiveDate;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::Page;

/// 生成好的试卷
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedDocument {
    /// 词汇表名 + 固定后缀
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub row_count: usize,
}

/// 试卷生成器
#[derive(Debug, Clone, Default)]
pub struct DocumentGenerator {
    engine: SheetLayoutEngine,
}

impl DocumentGenerator {
    pub fn new(engine: SheetLayoutEngine) -> Self {
        Self { engine }
    }

    /// 排版并渲染一个页面的词汇
    pub fn generate(&self, page: &Page, date: NaiveDate) -> AppResult<GeneratedDocument> {
        let layout = self.engine.layout(&page.name, &page.pairs, date)?;
        let bytes = render::render_pdf(&layout)?;

        let document = GeneratedDocument {
            file_name: file_name_for(&page.name, &self.engine.labels().file_suffix),
            bytes,
            page_count: layout.page_count(),
            row_count: layout.row_count(),
        };
        info!(
            "📄 生成试卷 {}: {} 页, {} 行",
            document.file_name, document.page_count, document.row_count
        );
        Ok(document)
    }

    /// 在阻塞线程池中生成，不占用调用方线程
    ///
    /// 任务 panic 也转换为 `GenerationFailed`
    pub async fn generate_in_background(
        &self,
        page: Page,
        date: NaiveDate,
    ) -> AppResult<GeneratedDocument> {
        let generator = self.clone();
        tokio::task::spawn_blocking(move || generator.generate(&page, date))
            .await
            .map_err(|e| AppError::generation_failed(e.to_string()))?
    }
}

/// 从词汇表名派生文件名，路径分隔符和控制字符替换为 `_`
pub fn file_name_for(list_name: &str, suffix: &str) -> String {
    let stem: String = list_name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("{}{}", stem, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VocabularyPair;
    use chrono::Utc;

    fn page(n: usize) -> Page {
        Page {
            id: "p1".to_string(),
            name: "Unit 1".to_string(),
            pairs: (0..n)
                .map(|i| VocabularyPair::new(format!("Wort{}", i), "word").unwrap())
                .collect(),
            raw_text: String::new(),
            created_at: Utc::now(),
            preview_image: None,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 2).unwrap()
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name_for("Unit 1", "_Vokabeltest.pdf"), "Unit 1_Vokabeltest.pdf");
        assert_eq!(file_name_for("a/b\\c", ".pdf"), "a_b_c.pdf");
    }

    #[test]
    fn test_generate_counts() {
        let document = DocumentGenerator::default().generate(&page(2), date()).unwrap();
        assert_eq!(document.file_name, "Unit 1_Vokabeltest.pdf");
        assert_eq!(document.page_count, 1);
        assert_eq!(document.row_count, 2);
    }

    #[test]
    fn test_regeneration_is_byte_identical() {
        let generator = DocumentGenerator::default();
        let a = generator.generate(&page(40), date()).unwrap();
        let b = generator.generate(&page(40), date()).unwrap();
        assert_eq!(a.bytes, b.bytes);
    }

    #[tokio::test]
    async fn test_generate_in_background() {
        let document = DocumentGenerator::default()
            .generate_in_background(page(25), date())
            .await
            .unwrap();
        assert_eq!(document.row_count, 25);
        assert_eq!(document.page_count, 2);
    }

    #[tokio::test]
    async fn test_background_failure_is_reported() {
        let result = DocumentGenerator::default()
            .generate_in_background(page(0), date())
            .await;
        assert!(result.is_err());
    }
}
