//! PDF 渲染
//!
//! 把 `SheetLayout` 写成 PDF。只使用 PDF 内置的 Helvetica 字体，
//! 文字按 WinAnsi (Windows-1252) 编码，德语变音字母可以正常显示；
//! 无法映射的字符输出为 `?`。
//!
//! 不写入创建时间等元数据，同一排版结果总是得到完全相同的字节。

use encoding_rs::WINDOWS_1252;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, StringFormat, Stream};
use tracing::debug;

use super::layout::{DrawOp, FontStyle, SheetLayout};
use crate::error::{AppError, AppResult};

/// 毫米 → PDF 点
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * 72.0 / 25.4
}

/// 渲染为 PDF 字节
pub fn render_pdf(layout: &SheetLayout) -> AppResult<Vec<u8>> {
    let page_height = layout.geometry.page_height;
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(font_dictionary("Helvetica"));
    let bold_id = doc.add_object(font_dictionary("Helvetica-Bold"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(layout.pages.len());
    for page in &layout.pages {
        let operations: Vec<Operation> = page
            .ops
            .iter()
            .flat_map(|op| operations_for(op, page_height))
            .collect();
        let content = Content { operations }
            .encode()
            .map_err(|e| AppError::generation_failed(e.to_string()))?;

        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => vec![
            0.into(),
            0.into(),
            mm_to_pt(layout.geometry.page_width).into(),
            mm_to_pt(page_height).into(),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| AppError::generation_failed(e.to_string()))?;

    debug!("PDF 渲染完成: {} 页, {} 字节", page_count, bytes.len());
    Ok(bytes)
}

fn font_dictionary(base_font: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    }
}

/// 布局坐标（左上原点，毫米）→ PDF 坐标（左下原点，点）
fn operations_for(op: &DrawOp, page_height: f32) -> Vec<Operation> {
    let flip = |y: f32| mm_to_pt(page_height - y);

    match op {
        DrawOp::Text {
            x,
            y,
            size,
            style,
            text,
        } => {
            let font = match style {
                FontStyle::Regular => "F1",
                FontStyle::Bold => "F2",
            };
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![font.into(), (*size).into()]),
                Operation::new("Td", vec![mm_to_pt(*x).into(), flip(*y).into()]),
                Operation::new("Tj", vec![Object::String(encode_win_ansi(text), StringFormat::Literal)]),
                Operation::new("ET", vec![]),
            ]
        }
        DrawOp::Line {
            x1,
            y1,
            x2,
            y2,
            width,
        } => vec![
            Operation::new("w", vec![mm_to_pt(*width).into()]),
            Operation::new("m", vec![mm_to_pt(*x1).into(), flip(*y1).into()]),
            Operation::new("l", vec![mm_to_pt(*x2).into(), flip(*y2).into()]),
            Operation::new("S", vec![]),
        ],
        DrawOp::Rect {
            x,
            y,
            width,
            height,
            line_width,
        } => vec![
            Operation::new("w", vec![mm_to_pt(*line_width).into()]),
            Operation::new(
                "re",
                vec![
                    mm_to_pt(*x).into(),
                    flip(*y + *height).into(),
                    mm_to_pt(*width).into(),
                    mm_to_pt(*height).into(),
                ],
            ),
            Operation::new("S", vec![]),
        ],
    }
}

/// 按字符编码为 Windows-1252，无法映射的字符替换为 `?`
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for c in text.chars() {
        let (bytes, _, had_errors) = WINDOWS_1252.encode(c.encode_utf8(&mut buf));
        if had_errors {
            out.push(b'?');
        } else {
            out.extend_from_slice(&bytes);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::layout::SheetLayoutEngine;
    use crate::models::VocabularyPair;
    use chrono::NaiveDate;

    fn layout(n: usize) -> SheetLayout {
        let pairs: Vec<VocabularyPair> = (0..n)
            .map(|i| VocabularyPair::new(format!("Bäume {}", i), "trees").unwrap())
            .collect();
        SheetLayoutEngine::default()
            .layout("Unit (1)", &pairs, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
            .unwrap()
    }

    #[test]
    fn test_win_ansi_encoding() {
        assert_eq!(encode_win_ansi("Bär"), vec![b'B', 0xE4, b'r']);
        assert_eq!(encode_win_ansi("Straße"), vec![b'S', b't', b'r', b'a', 0xDF, b'e']);
        assert_eq!(encode_win_ansi("猫a"), vec![b'?', b'a']);
    }

    #[test]
    fn test_pdf_has_one_page_per_layout_page() {
        let layout = layout(30);
        let bytes = render_pdf(&layout).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let parsed = Document::load_mem(&bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), layout.page_count());
    }

    #[test]
    fn test_rendering_is_byte_identical() {
        let layout = layout(5);
        assert_eq!(render_pdf(&layout).unwrap(), render_pdf(&layout).unwrap());
    }

    #[test]
    fn test_mm_to_pt() {
        assert!((mm_to_pt(25.4) - 72.0).abs() < 1e-4);
    }
}
