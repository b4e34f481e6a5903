use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 一对词汇（源语言词 → 目标语言词）
///
/// 创建后不可变；两个字段都保证非空（已去除首尾空白）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VocabularyPair {
    source: String,
    target: String,
}

impl VocabularyPair {
    /// 创建词汇对，任一字段去空白后为空则返回 `None`
    pub fn new(source: impl AsRef<str>, target: impl AsRef<str>) -> Option<Self> {
        let source = source.as_ref().trim();
        let target = target.as_ref().trim();
        if source.is_empty() || target.is_empty() {
            return None;
        }
        Some(Self {
            source: source.to_string(),
            target: target.to_string(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

/// 一次已保存的提取结果（一张图片的词汇表）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    pub name: String,
    pub pairs: Vec<VocabularyPair>,
    pub raw_text: String,
    pub created_at: DateTime<Utc>,
    /// 预览图（base64 data URL）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_image: Option<String>,
}

/// 词汇书，只持有页面的关联关系，不内嵌页面内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 书 ↔ 页面 的归属关系；一个 page_id 最多出现在一条关联中
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Association {
    pub book_id: String,
    pub page_id: String,
}

impl Association {
    pub fn new(book_id: impl Into<String>, page_id: impl Into<String>) -> Self {
        Self {
            book_id: book_id.into(),
            page_id: page_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_pair_trims_and_rejects_blank() {
        let pair = VocabularyPair::new("  Haus ", "house\t").unwrap();
        assert_eq!(pair.source(), "Haus");
        assert_eq!(pair.target(), "house");

        assert!(VocabularyPair::new("", "house").is_none());
        assert!(VocabularyPair::new("Haus", "   ").is_none());
    }

    #[test]
    fn test_page_wire_format_uses_camel_case() {
        let page = Page {
            id: "p1".to_string(),
            name: "Unit 1".to_string(),
            pairs: vec![VocabularyPair::new("Haus", "house").unwrap()],
            raw_text: "Haus,house".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
            preview_image: None,
        };

        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["rawText"], "Haus,house");
        assert_eq!(json["pairs"][0]["source"], "Haus");
        assert_eq!(json["pairs"][0]["target"], "house");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("previewImage").is_none());

        let back: Page = serde_json::from_value(json).unwrap();
        assert_eq!(back, page);
    }

    #[test]
    fn test_association_wire_format() {
        let json = serde_json::to_string(&Association::new("b1", "p1")).unwrap();
        assert_eq!(json, r#"{"bookId":"b1","pageId":"p1"}"#);
    }
}
