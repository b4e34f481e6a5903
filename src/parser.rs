//! CSV 词汇对解析
//!
//! 把提取服务返回的原始文本转换为词汇对序列。
//!
//! 规则：
//! - 按行拆分，去空白后为空的行跳过
//! - 每行按逗号拆分，只取前两个字段，第三个及之后的字段忽略
//! - 不足两个字段的行静默丢弃（不是错误）
//! - 两个字段去空白后任一为空，同样丢弃
//!
//! 不处理引号和转义：词内的逗号会把这一对切错，且不会报错。
//! 短行被静默丢弃也意味着可能丢数据，调用方应把空结果视为"不能保存"。

use tracing::debug;

use crate::models::VocabularyPair;

/// 解析原始 CSV 文本
pub fn parse_pairs(raw_text: &str) -> Vec<VocabularyPair> {
    let pairs: Vec<VocabularyPair> = raw_text.lines().filter_map(parse_line).collect();

    debug!("解析完成: {} 行 → {} 个词汇对", raw_text.lines().count(), pairs.len());

    pairs
}

fn parse_line(line: &str) -> Option<VocabularyPair> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let mut fields = line.splitn(3, ',');
    let source = fields.next()?;
    let target = fields.next()?;

    VocabularyPair::new(source, target)
}
