use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::GeneratedDocument;
use crate::error::{AppResult, PersistenceError};

/// 查看器状态
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerState {
    /// 没有选中任何词汇表
    Idle,
    Ready(GeneratedDocument),
    /// 生成失败；重新选择词汇表即可重试
    Failed { message: String },
}

/// 持有当前展示的试卷
///
/// 同一时间只持有一份文档，新结果到来或关闭时释放旧的
#[derive(Debug)]
pub struct DocumentViewer {
    state: ViewerState,
    released: usize,
}

impl DocumentViewer {
    pub fn new() -> Self {
        Self {
            state: ViewerState::Idle,
            released: 0,
        }
    }

    /// 接收一次生成结果（成功或失败）
    pub fn show(&mut self, result: AppResult<GeneratedDocument>) {
        let next = match result {
            Ok(document) => {
                debug!("展示试卷 {}", document.file_name);
                ViewerState::Ready(document)
            }
            Err(e) => {
                warn!("⚠️ 试卷生成失败: {}", e);
                ViewerState::Failed {
                    message: e.to_string(),
                }
            }
        };
        self.replace(next);
    }

    /// 关闭查看器并释放文档
    pub fn close(&mut self) {
        self.replace(ViewerState::Idle);
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn current(&self) -> Option<&GeneratedDocument> {
        match &self.state {
            ViewerState::Ready(document) => Some(document),
            _ => None,
        }
    }

    /// 已释放的文档数量
    pub fn released_count(&self) -> usize {
        self.released
    }

    /// 把当前文档保存到目录，返回完整路径；没有文档时返回 `None`
    pub fn save_to(&self, dir: &Path) -> AppResult<Option<PathBuf>> {
        let Some(document) = self.current() else {
            return Ok(None);
        };

        std::fs::create_dir_all(dir).map_err(|source| PersistenceError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let path = dir.join(&document.file_name);
        std::fs::write(&path, &document.bytes).map_err(|source| PersistenceError::Io {
            path: path.display().to_string(),
            source,
        })?;

        info!("💾 试卷已保存: {}", path.display());
        Ok(Some(path))
    }

    fn replace(&mut self, next: ViewerState) {
        let previous = std::mem::replace(&mut self.state, next);
        if let ViewerState::Ready(document) = previous {
            self.released += 1;
            debug!("释放试卷 {} ({} 字节)", document.file_name, document.bytes.len());
        }
    }
}

impl Default for DocumentViewer {
    fn default() -> Self {
        Self::new()
    }
}
