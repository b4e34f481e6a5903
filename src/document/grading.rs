//! 评分表计算
//!
//! 把总分换算成固定百分比区间的分数表。每个区间单独计算：
//! - `min_points` = min% × 总分，四舍五入（.5 进位）
//! - `max_points` = max% × 总分，向下取整
//!
//! 相邻区间之间可能出现空档或重叠，这是取整的结果，不做修正。
//! 全部使用整数运算，避免浮点误差。

use crate::error::{AppResult, DocumentError};

/// 一个分数区间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradeBand {
    pub grade: u8,
    pub label: &'static str,
    pub min_percent: u32,
    pub max_percent: u32,
}

/// 计算后的区间
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeRange {
    pub grade: u8,
    pub label: &'static str,
    pub min_points: u32,
    pub max_points: u32,
}

impl GradeRange {
    /// 上下限相同显示单值，否则显示 `min-max`
    pub fn points_text(&self) -> String {
        if self.min_points == self.max_points {
            self.min_points.to_string()
        } else {
            format!("{}-{}", self.min_points, self.max_points)
        }
    }

    /// 例如 `1 (sehr gut)`
    pub fn grade_text(&self) -> String {
        format!("{} ({})", self.grade, self.label)
    }
}

/// 评分政策，自上而下排列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradingScale {
    bands: Vec<GradeBand>,
}

/// 德国学校常用的六级分数表
pub const GERMAN_SCHOOL_BANDS: [GradeBand; 6] = [
    GradeBand { grade: 1, label: "sehr gut", min_percent: 87, max_percent: 100 },
    GradeBand { grade: 2, label: "gut", min_percent: 73, max_percent: 86 },
    GradeBand { grade: 3, label: "befriedigend", min_percent: 59, max_percent: 72 },
    GradeBand { grade: 4, label: "ausreichend", min_percent: 45, max_percent: 58 },
    GradeBand { grade: 5, label: "mangelhaft", min_percent: 18, max_percent: 44 },
    GradeBand { grade: 6, label: "ungenügend", min_percent: 0, max_percent: 17 },
];

impl Default for GradingScale {
    fn default() -> Self {
        Self::new(GERMAN_SCHOOL_BANDS.to_vec())
    }
}

impl GradingScale {
    pub fn new(bands: Vec<GradeBand>) -> Self {
        Self { bands }
    }

    pub fn bands(&self) -> &[GradeBand] {
        &self.bands
    }

    /// 计算分数表
    ///
    /// # 参数
    /// - `total_points`: 总分（测试中的词汇对数量），必须大于 0
    pub fn calculate(&self, total_points: u32) -> AppResult<Vec<GradeRange>> {
        if total_points == 0 {
            return Err(DocumentError::NonPositiveTotal.into());
        }

        let total = u64::from(total_points);
        Ok(self
            .bands
            .iter()
            .map(|band| GradeRange {
                grade: band.grade,
                label: band.label,
                min_points: ((u64::from(band.min_percent) * total + 50) / 100) as u32,
                max_points: (u64::from(band.max_percent) * total / 100) as u32,
            })
            .collect())
    }
}
