//! 试卷排版
//!
//! 把词汇对按固定页面几何排成两栏的可打印试卷：
//! 1. 每页最多 `max_rows_per_page` 行
//! 2. 每个有词汇行的页面都有页眉（标题、列表名、日期、两栏标题、分隔线）
//! 3. 第 i 行（从 0 开始）在 `i > 0 && i % max_rows_per_page == 0` 时换页
//! 4. 最后一行之后追加评分表区块
//! 5. 当前页剩余空间放不下评分表时，评分表单独起一页（不重复页眉）
//!
//! 坐标单位为毫米，原点在左上角，y 向下增长；文字的 y 是基线。
//! 排版结果只依赖输入（包括传入的日期），同样的输入得到同样的结果。

use chrono::NaiveDate;

use super::grading::GradingScale;
use crate::error::{AppError, AppResult, DocumentError};
use crate::models::VocabularyPair;

/// 页面几何（毫米）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetGeometry {
    pub page_width: f32,
    pub page_height: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub margin_top: f32,
    pub bottom_margin: f32,
    /// 第一行词汇的顶部位置（页眉占用其上方的空间）
    pub content_start_y: f32,
    pub row_height: f32,
    /// 两栏之间竖线的 x 坐标
    pub column_split: f32,
    /// 最后一行和评分表之间的间距
    pub grading_spacing: f32,
    /// 评分表区块的估计高度
    pub grading_block_height: f32,
}

impl Default for SheetGeometry {
    /// A4 竖版
    fn default() -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            margin_left: 20.0,
            margin_right: 20.0,
            margin_top: 20.0,
            bottom_margin: 20.0,
            content_start_y: 50.0,
            row_height: 10.0,
            column_split: 105.0,
            grading_spacing: 10.0,
            grading_block_height: 100.0,
        }
    }
}

impl SheetGeometry {
    /// 每页能放下的词汇行数
    pub fn max_rows_per_page(&self) -> usize {
        let available = self.page_height - self.content_start_y - self.bottom_margin;
        if available <= 0.0 || self.row_height <= 0.0 {
            return 0;
        }
        (available / self.row_height).floor() as usize
    }

    fn content_bottom(&self) -> f32 {
        self.page_height - self.bottom_margin
    }

    fn content_right(&self) -> f32 {
        self.page_width - self.margin_right
    }
}

/// 试卷上的固定文字（德语）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLabels {
    pub title: String,
    pub date_prefix: String,
    /// chrono 格式串
    pub date_format: String,
    pub source_caption: String,
    pub target_caption: String,
    pub grading_title: String,
    pub total_points: String,
    pub grade_header: String,
    pub points_header: String,
    pub grade_field: String,
    pub error_field: String,
    pub achieved_field: String,
    pub file_suffix: String,
}

impl Default for SheetLabels {
    fn default() -> Self {
        Self {
            title: "Vokabeltest".to_string(),
            date_prefix: "Datum:".to_string(),
            date_format: "%d.%m.%Y".to_string(),
            source_caption: "Deutsch".to_string(),
            target_caption: "Englisch (bitte eintragen)".to_string(),
            grading_title: "Notenschlüssel".to_string(),
            total_points: "Gesamtpunktzahl:".to_string(),
            grade_header: "Note".to_string(),
            points_header: "Punkte".to_string(),
            grade_field: "Note:".to_string(),
            error_field: "Fehleranzahl:".to_string(),
            achieved_field: "Erreichte Punkte:".to_string(),
            file_suffix: "_Vokabeltest.pdf".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
}

/// 绘制指令
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        size: f32,
        style: FontStyle,
        text: String,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        width: f32,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        line_width: f32,
    },
}

/// 排好的一页
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetPage {
    pub ops: Vec<DrawOp>,
    pub has_header: bool,
    pub has_grading: bool,
    /// 本页词汇行对应的下标（0-based）
    pub rows: Vec<usize>,
}

/// 排版结果
#[derive(Debug, Clone, PartialEq)]
pub struct SheetLayout {
    pub geometry: SheetGeometry,
    pub max_rows_per_page: usize,
    pub total_points: u32,
    pub pages: Vec<SheetPage>,
}

impl SheetLayout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn row_count(&self) -> usize {
        self.pages.iter().map(|p| p.rows.len()).sum()
    }

    pub fn pages_with_rows(&self) -> usize {
        self.pages.iter().filter(|p| !p.rows.is_empty()).count()
    }

    pub fn header_count(&self) -> usize {
        self.pages.iter().filter(|p| p.has_header).count()
    }
}

const TITLE_SIZE: f32 = 18.0;
const NAME_SIZE: f32 = 12.0;
const SMALL_SIZE: f32 = 10.0;
const CAPTION_SIZE: f32 = 11.0;
const ROW_SIZE: f32 = 11.0;
const GRADING_TITLE_SIZE: f32 = 14.0;
const TABLE_ROW_HEIGHT: f32 = 7.0;
const TABLE_GRADE_WIDTH: f32 = 50.0;
const TABLE_POINTS_WIDTH: f32 = 40.0;
const RESULT_BOX_HEIGHT: f32 = 24.0;
const THIN: f32 = 0.2;
const RULE: f32 = 0.5;

/// 排版引擎
#[derive(Debug, Clone, Default)]
pub struct SheetLayoutEngine {
    geometry: SheetGeometry,
    labels: SheetLabels,
    grading: GradingScale,
}

impl SheetLayoutEngine {
    pub fn new(geometry: SheetGeometry, labels: SheetLabels, grading: GradingScale) -> Self {
        Self {
            geometry,
            labels,
            grading,
        }
    }

    pub fn geometry(&self) -> &SheetGeometry {
        &self.geometry
    }

    pub fn labels(&self) -> &SheetLabels {
        &self.labels
    }

    /// 排版一份试卷
    ///
    /// # 参数
    /// - `list_name`: 词汇表名称（页眉中显示）
    /// - `pairs`: 按顺序排列的词汇对
    /// - `date`: 页眉中的日期
    pub fn layout(
        &self,
        list_name: &str,
        pairs: &[VocabularyPair],
        date: NaiveDate,
    ) -> AppResult<SheetLayout> {
        if pairs.is_empty() {
            return Err(DocumentError::NoPairs.into());
        }
        let max_rows = self.geometry.max_rows_per_page();
        if max_rows == 0 {
            return Err(AppError::generation_failed(
                "Seitengeometrie lässt keinen Platz für Zeilen",
            ));
        }

        let date_text = date.format(&self.labels.date_format).to_string();
        let mut pages = Vec::new();
        let mut current = self.header_page(list_name, &date_text);
        let mut y = self.geometry.content_start_y;

        for (i, pair) in pairs.iter().enumerate() {
            if i > 0 && i % max_rows == 0 {
                pages.push(std::mem::replace(
                    &mut current,
                    self.header_page(list_name, &date_text),
                ));
                y = self.geometry.content_start_y;
            }
            self.push_row(&mut current, i, pair, y);
            y += self.geometry.row_height;
        }

        let total_points = pairs.len() as u32;
        let mut block_top = y + self.geometry.grading_spacing;
        if block_top + self.geometry.grading_block_height > self.geometry.content_bottom() {
            pages.push(std::mem::take(&mut current));
            block_top = self.geometry.margin_top;
        }
        self.push_grading_block(&mut current, total_points, block_top)?;
        pages.push(current);

        Ok(SheetLayout {
            geometry: self.geometry,
            max_rows_per_page: max_rows,
            total_points,
            pages,
        })
    }

    fn header_page(&self, list_name: &str, date_text: &str) -> SheetPage {
        let g = &self.geometry;
        let caption_y = g.content_start_y - 7.0;
        let rule_y = g.content_start_y - 3.0;

        let ops = vec![
            text(g.margin_left, g.margin_top, TITLE_SIZE, FontStyle::Bold, &self.labels.title),
            text(g.margin_left, g.margin_top + 9.0, NAME_SIZE, FontStyle::Regular, list_name),
            text(
                g.margin_left,
                g.margin_top + 16.0,
                SMALL_SIZE,
                FontStyle::Regular,
                &format!("{} {}", self.labels.date_prefix, date_text),
            ),
            text(g.margin_left, caption_y, CAPTION_SIZE, FontStyle::Bold, &self.labels.source_caption),
            text(g.column_split + 5.0, caption_y, CAPTION_SIZE, FontStyle::Bold, &self.labels.target_caption),
            line(g.margin_left, rule_y, g.content_right(), rule_y, RULE),
        ];

        SheetPage {
            ops,
            has_header: true,
            ..SheetPage::default()
        }
    }

    fn push_row(&self, page: &mut SheetPage, index: usize, pair: &VocabularyPair, top: f32) {
        let g = &self.geometry;
        let baseline = top + g.row_height * 0.7;
        let rule_y = top + g.row_height - 2.0;

        page.ops.push(text(
            g.margin_left,
            baseline,
            ROW_SIZE,
            FontStyle::Regular,
            &format!("{}.", index + 1),
        ));
        page.ops.push(text(g.margin_left + 10.0, baseline, ROW_SIZE, FontStyle::Regular, pair.source()));
        page.ops.push(line(g.column_split + 5.0, rule_y, g.content_right(), rule_y, THIN));
        page.ops.push(line(g.column_split, top, g.column_split, top + g.row_height, THIN));
        page.rows.push(index);
    }

    fn push_grading_block(&self, page: &mut SheetPage, total_points: u32, top: f32) -> AppResult<()> {
        let g = &self.geometry;
        let labels = &self.labels;
        let x = g.margin_left;

        page.ops.push(text(x, top + 6.0, GRADING_TITLE_SIZE, FontStyle::Bold, &labels.grading_title));
        page.ops.push(text(
            x,
            top + 13.0,
            CAPTION_SIZE,
            FontStyle::Regular,
            &format!("{} {}", labels.total_points, total_points),
        ));

        // 分数表：表头 + 每个区间一行
        let table_top = top + 18.0;
        let points_x = x + TABLE_GRADE_WIDTH;
        let mut rows = vec![(labels.grade_header.clone(), labels.points_header.clone(), FontStyle::Bold)];
        rows.extend(
            self.grading
                .calculate(total_points)?
                .into_iter()
                .map(|range| (range.grade_text(), range.points_text(), FontStyle::Regular)),
        );

        for (i, (grade, points, style)) in rows.iter().enumerate() {
            let row_top = table_top + i as f32 * TABLE_ROW_HEIGHT;
            let baseline = row_top + TABLE_ROW_HEIGHT - 2.0;
            page.ops.push(rect(x, row_top, TABLE_GRADE_WIDTH, TABLE_ROW_HEIGHT));
            page.ops.push(rect(points_x, row_top, TABLE_POINTS_WIDTH, TABLE_ROW_HEIGHT));
            page.ops.push(text(x + 2.0, baseline, SMALL_SIZE, *style, grade));
            page.ops.push(text(points_x + 2.0, baseline, SMALL_SIZE, *style, points));
        }

        // 结果框
        let box_top = table_top + rows.len() as f32 * TABLE_ROW_HEIGHT + 6.0;
        let box_width = g.content_right() - x;
        let half = x + box_width / 2.0;
        page.ops.push(rect(x, box_top, box_width, RESULT_BOX_HEIGHT));

        let first_line = box_top + 9.0;
        page.ops.push(text(x + 4.0, first_line, CAPTION_SIZE, FontStyle::Bold, &labels.grade_field));
        page.ops.push(line(x + 20.0, first_line + 1.0, half - 6.0, first_line + 1.0, THIN));
        page.ops.push(text(half, first_line, CAPTION_SIZE, FontStyle::Bold, &labels.error_field));
        page.ops.push(line(half + 28.0, first_line + 1.0, g.content_right() - 4.0, first_line + 1.0, THIN));

        let second_line = box_top + 19.0;
        page.ops.push(text(x + 4.0, second_line, CAPTION_SIZE, FontStyle::Bold, &labels.achieved_field));
        page.ops.push(line(x + 40.0, second_line + 1.0, x + 70.0, second_line + 1.0, THIN));
        page.ops.push(text(
            x + 72.0,
            second_line,
            CAPTION_SIZE,
            FontStyle::Regular,
            &format!("/ {}", total_points),
        ));

        page.has_grading = true;
        Ok(())
    }
}

fn text(x: f32, y: f32, size: f32, style: FontStyle, content: &str) -> DrawOp {
    DrawOp::Text {
        x,
        y,
        size,
        style,
        text: content.to_string(),
    }
}

fn line(x1: f32, y1: f32, x2: f32, y2: f32, width: f32) -> DrawOp {
    DrawOp::Line {
        x1,
        y1,
        x2,
        y2,
        width,
    }
}

fn rect(x: f32, y: f32, width: f32, height: f32) -> DrawOp {
    DrawOp::Rect {
        x,
        y,
        width,
        height,
        line_width: THIN,
    }
}
