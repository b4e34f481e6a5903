//! 上传图片
//!
//! 只做类型和大小检查；图片内容的理解完全交给提取服务

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

use crate::error::{AppResult, PersistenceError, ValidationError};

/// 图片数据 + MIME 类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    bytes: Vec<u8>,
    mime_type: String,
}

impl ImagePayload {
    /// 从内存数据创建
    ///
    /// MIME 类型必须以 `image/` 开头，大小不能超过 `max_bytes`
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>, max_bytes: usize) -> AppResult<Self> {
        let mime_type = mime_type.into();
        if !mime_type.starts_with("image/") {
            return Err(ValidationError::InvalidImage { path: mime_type }.into());
        }
        if bytes.is_empty() {
            return Err(ValidationError::MissingImage.into());
        }
        if bytes.len() > max_bytes {
            return Err(ValidationError::ImageTooLarge {
                size: bytes.len(),
                max: max_bytes,
            }
            .into());
        }
        Ok(Self { bytes, mime_type })
    }

    /// 读取图片文件，类型由扩展名决定
    pub fn from_path(path: &Path, max_bytes: usize) -> AppResult<Self> {
        let mime_type = mime_type_for(path).ok_or_else(|| ValidationError::InvalidImage {
            path: path.display().to_string(),
        })?;
        let bytes = std::fs::read(path).map_err(|source| PersistenceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        debug!("读取图片 {} ({} 字节, {})", path.display(), bytes.len(), mime_type);
        Self::new(bytes, mime_type, max_bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// `data:<mime>;base64,<data>`，用于内联发送和预览图
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }
}

/// 扩展名 → MIME 类型
pub fn mime_type_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}
