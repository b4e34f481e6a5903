use std::collections::HashMap;

use tracing::{debug, info};

use super::{build_book, build_page, Clock, LibraryStore, SystemClock};
use crate::error::{AppError, AppResult};
use crate::models::{Association, Book, Page, VocabularyPair};

/// 纯内存存储
///
/// `page_to_book` 是按 page_id 的唯一索引，`book_pages` 保存每本书内的关联顺序，
/// 两者在每次修改时一起更新
pub struct MemoryStore {
    clock: Box<dyn Clock>,
    /// 按插入顺序
    pages: Vec<Page>,
    /// 按插入顺序
    books: Vec<Book>,
    page_to_book: HashMap<String, String>,
    book_pages: HashMap<String, Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            clock,
            pages: Vec::new(),
            books: Vec::new(),
            page_to_book: HashMap::new(),
            book_pages: HashMap::new(),
        }
    }

    fn ensure_page(&self, page_id: &str) -> AppResult<()> {
        if self.pages.iter().any(|p| p.id == page_id) {
            Ok(())
        } else {
            Err(AppError::page_not_found(page_id))
        }
    }

    fn ensure_book(&self, book_id: &str) -> AppResult<()> {
        if self.books.iter().any(|b| b.id == book_id) {
            Ok(())
        } else {
            Err(AppError::book_not_found(book_id))
        }
    }

    /// 移除页面的现有关联（不存在则什么都不做）
    fn detach(&mut self, page_id: &str) {
        if let Some(book_id) = self.page_to_book.remove(page_id) {
            if let Some(members) = self.book_pages.get_mut(&book_id) {
                members.retain(|id| id != page_id);
            }
        }
    }

    /// 创建时间倒序，同一时间后插入的在前
    fn store_order<'a>(&self, pages: impl DoubleEndedIterator<Item = &'a Page>) -> Vec<Page> {
        let mut ordered: Vec<Page> = pages.rev().cloned().collect();
        ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        ordered
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LibraryStore for MemoryStore {
    fn create_page(
        &mut self,
        name: &str,
        pairs: Vec<VocabularyPair>,
        raw_text: &str,
        preview_image: Option<String>,
    ) -> AppResult<Page> {
        let page = build_page(self.clock.as_ref(), name, pairs, raw_text, preview_image)?;
        self.pages.push(page.clone());
        Ok(page)
    }

    fn create_book(&mut self, name: &str, cover_image: Option<String>) -> AppResult<Book> {
        let book = build_book(self.clock.as_ref(), name, cover_image)?;
        self.book_pages.insert(book.id.clone(), Vec::new());
        self.books.push(book.clone());
        info!("📚 新建书: {}", book.name);
        Ok(book)
    }

    fn assign(&mut self, page_id: &str, book_id: &str) -> AppResult<()> {
        self.ensure_page(page_id)?;
        self.ensure_book(book_id)?;

        if self.page_to_book.get(page_id).map(String::as_str) == Some(book_id) {
            debug!("页面 {} 已在书 {} 中，跳过", page_id, book_id);
            return Ok(());
        }

        self.detach(page_id);
        self.page_to_book
            .insert(page_id.to_string(), book_id.to_string());
        self.book_pages
            .entry(book_id.to_string())
            .or_default()
            .push(page_id.to_string());

        debug!("页面 {} → 书 {}", page_id, book_id);
        Ok(())
    }

    fn unassign(&mut self, page_id: &str, book_id: &str) -> AppResult<()> {
        if self.page_to_book.get(page_id).map(String::as_str) == Some(book_id) {
            self.detach(page_id);
        }
        Ok(())
    }

    fn delete_book(&mut self, book_id: &str) -> AppResult<()> {
        self.ensure_book(book_id)?;

        if let Some(members) = self.book_pages.remove(book_id) {
            for page_id in members {
                self.page_to_book.remove(&page_id);
            }
        }
        self.books.retain(|b| b.id != book_id);

        info!("🗑️ 删除书 {}（页面保留）", book_id);
        Ok(())
    }

    fn delete_page(&mut self, page_id: &str) -> AppResult<()> {
        self.ensure_page(page_id)?;

        self.detach(page_id);
        self.pages.retain(|p| p.id != page_id);

        info!("🗑️ 删除页面 {}", page_id);
        Ok(())
    }

    fn list_unassigned_pages(&self) -> AppResult<Vec<Page>> {
        Ok(self.store_order(
            self.pages
                .iter()
                .filter(|p| !self.page_to_book.contains_key(&p.id)),
        ))
    }

    fn pages_for_book(&self, book_id: &str) -> AppResult<Vec<Page>> {
        let members = self
            .book_pages
            .get(book_id)
            .ok_or_else(|| AppError::book_not_found(book_id))?;

        Ok(members
            .iter()
            .filter_map(|id| self.pages.iter().find(|p| &p.id == id))
            .cloned()
            .collect())
    }

    fn list_pages(&self) -> AppResult<Vec<Page>> {
        Ok(self.store_order(self.pages.iter()))
    }

    fn list_books(&self) -> AppResult<Vec<Book>> {
        Ok(self.books.clone())
    }

    fn get_page(&self, page_id: &str) -> AppResult<Option<Page>> {
        Ok(self.pages.iter().find(|p| p.id == page_id).cloned())
    }

    fn get_book(&self, book_id: &str) -> AppResult<Option<Book>> {
        Ok(self.books.iter().find(|b| b.id == book_id).cloned())
    }

    fn book_for_page(&self, page_id: &str) -> AppResult<Option<String>> {
        Ok(self.page_to_book.get(page_id).cloned())
    }

    fn associations(&self) -> AppResult<Vec<Association>> {
        Ok(self
            .books
            .iter()
            .flat_map(|book| {
                self.book_pages
                    .get(&book.id)
                    .into_iter()
                    .flatten()
                    .map(move |page_id| Association::new(book.id.clone(), page_id.clone()))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{contract, ManualClock};
    use chrono::TimeZone;
    use std::sync::Arc;

    fn manual_store() -> (MemoryStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            chrono::Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        ));
        (MemoryStore::with_clock(Box::new(Arc::clone(&clock))), clock)
    }

    #[test]
    fn test_create_validation() {
        contract::create_validation(&mut MemoryStore::new());
    }

    #[test]
    fn test_move_between_books() {
        contract::move_between_books(&mut MemoryStore::new());
    }

    #[test]
    fn test_assign_is_idempotent() {
        contract::assign_is_idempotent(&mut MemoryStore::new());
    }

    #[test]
    fn test_unassign_and_delete_page() {
        contract::unassign_and_delete_page(&mut MemoryStore::new());
    }

    #[test]
    fn test_unknown_ids() {
        contract::unknown_ids(&mut MemoryStore::new());
    }

    #[test]
    fn test_ordering() {
        let (mut store, clock) = manual_store();
        contract::ordering(&mut store, &clock);
    }

    #[test]
    fn test_membership_stays_unique() {
        contract::membership_stays_unique(&mut MemoryStore::new());
    }
}
