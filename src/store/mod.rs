//! 词汇库存储 - 关联存储层
//!
//! 管理页面（Page）、书（Book）以及二者之间的归属关系。
//!
//! 不变量：
//! - 一个页面最多属于一本书（按 page_id 唯一索引）
//! - 删除书只删除它的关联，页面保留
//! - 删除页面同时删除引用它的关联
//!
//! 后端：
//! - `MemoryStore` - 纯内存
//! - `SqliteStore` - 本地 SQLite 文件，`assign` 在单个事务内完成

pub mod clock;
pub mod memory;
pub mod sqlite;

pub use clock::{Clock, ManualClock, SystemClock};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use tracing::debug;
use uuid::Uuid;

use crate::error::{AppResult, ValidationError};
use crate::models::{Association, Book, Page, VocabularyPair};

/// 存储契约，所有后端行为一致
///
/// 调用方保证操作串行执行（单用户、单会话）
pub trait LibraryStore {
    /// 保存一次提取结果；名称为空或没有词汇对时返回校验错误
    fn create_page(
        &mut self,
        name: &str,
        pairs: Vec<VocabularyPair>,
        raw_text: &str,
        preview_image: Option<String>,
    ) -> AppResult<Page>;

    /// 创建书；名称为空时返回校验错误
    fn create_book(&mut self, name: &str, cover_image: Option<String>) -> AppResult<Book>;

    /// 把页面分配给书
    ///
    /// 已在该书中则不做任何事；否则移除旧关联并插入新关联，对调用方是一次原子操作
    fn assign(&mut self, page_id: &str, book_id: &str) -> AppResult<()>;

    /// 移除关联；关联不存在时不做任何事
    fn unassign(&mut self, page_id: &str, book_id: &str) -> AppResult<()>;

    /// 删除书及其所有关联，页面保留
    fn delete_book(&mut self, book_id: &str) -> AppResult<()>;

    /// 删除页面及引用它的关联
    fn delete_page(&mut self, page_id: &str) -> AppResult<()>;

    /// 未分配的页面，按创建时间倒序（同一时间后插入的在前）
    fn list_unassigned_pages(&self) -> AppResult<Vec<Page>>;

    /// 书中的页面，按关联的插入顺序
    fn pages_for_book(&self, book_id: &str) -> AppResult<Vec<Page>>;

    /// 所有页面，顺序同 `list_unassigned_pages`
    fn list_pages(&self) -> AppResult<Vec<Page>>;

    /// 所有书，按创建顺序
    fn list_books(&self) -> AppResult<Vec<Book>>;

    fn get_page(&self, page_id: &str) -> AppResult<Option<Page>>;

    fn get_book(&self, book_id: &str) -> AppResult<Option<Book>>;

    /// 页面当前所属的书
    fn book_for_page(&self, page_id: &str) -> AppResult<Option<String>>;

    /// 所有关联（书的创建顺序，书内按关联顺序）
    fn associations(&self) -> AppResult<Vec<Association>>;

    fn page_count(&self, book_id: &str) -> AppResult<usize> {
        Ok(self.pages_for_book(book_id)?.len())
    }
}

/// 校验并构建新页面
pub(crate) fn build_page(
    clock: &dyn Clock,
    name: &str,
    pairs: Vec<VocabularyPair>,
    raw_text: &str,
    preview_image: Option<String>,
) -> AppResult<Page> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::BlankListName.into());
    }
    if pairs.is_empty() {
        return Err(ValidationError::NoPairs.into());
    }

    let page = Page {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        pairs,
        raw_text: raw_text.to_string(),
        created_at: clock.now(),
        preview_image,
    };
    debug!("新建页面 {} ({} 个词汇对)", page.id, page.pairs.len());
    Ok(page)
}

/// 校验并构建新书
pub(crate) fn build_book(
    clock: &dyn Clock,
    name: &str,
    cover_image: Option<String>,
) -> AppResult<Book> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::BlankBookName.into());
    }

    Ok(Book {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        cover_image,
        created_at: clock.now(),
    })
}

/// 两个后端共用的契约测试
#[cfg(test)]
pub(crate) mod contract {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashSet;

    pub fn pairs(n: usize) -> Vec<VocabularyPair> {
        (0..n)
            .map(|i| VocabularyPair::new(format!("Wort{}", i), format!("word{}", i)).unwrap())
            .collect()
    }

    fn ids(pages: &[Page]) -> Vec<String> {
        pages.iter().map(|p| p.id.clone()).collect()
    }

    fn assert_unique_membership(store: &dyn LibraryStore) {
        let associations = store.associations().unwrap();
        let mut seen = HashSet::new();
        for association in &associations {
            assert!(
                seen.insert(association.page_id.clone()),
                "page {} belongs to more than one book",
                association.page_id
            );
        }
    }

    pub fn create_validation(store: &mut dyn LibraryStore) {
        let err = store.create_page("   ", pairs(1), "a,b", None).unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::BlankListName)));

        let err = store.create_page("Unit 1", Vec::new(), "", None).unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::NoPairs)));

        let err = store.create_book("", None).unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::BlankBookName)));

        assert!(store.list_pages().unwrap().is_empty());
        assert!(store.list_books().unwrap().is_empty());

        let page = store.create_page("  Unit 1 ", pairs(2), "x", None).unwrap();
        assert_eq!(page.name, "Unit 1");
    }

    pub fn move_between_books(store: &mut dyn LibraryStore) {
        let page = store.create_page("Unit 1", pairs(2), "raw", None).unwrap();
        let book_a = store.create_book("Buch A", None).unwrap();
        let book_b = store.create_book("Buch B", None).unwrap();

        store.assign(&page.id, &book_a.id).unwrap();
        assert_eq!(ids(&store.pages_for_book(&book_a.id).unwrap()), vec![page.id.clone()]);
        assert!(store.list_unassigned_pages().unwrap().is_empty());

        store.assign(&page.id, &book_b.id).unwrap();
        assert!(store.pages_for_book(&book_a.id).unwrap().is_empty());
        assert_eq!(ids(&store.pages_for_book(&book_b.id).unwrap()), vec![page.id.clone()]);
        assert_eq!(store.book_for_page(&page.id).unwrap(), Some(book_b.id.clone()));
        assert_unique_membership(store);

        store.delete_book(&book_b.id).unwrap();
        assert!(store.get_book(&book_b.id).unwrap().is_none());
        assert!(store.get_page(&page.id).unwrap().is_some());
        assert_eq!(ids(&store.list_unassigned_pages().unwrap()), vec![page.id.clone()]);
        assert_eq!(store.book_for_page(&page.id).unwrap(), None);
    }

    pub fn assign_is_idempotent(store: &mut dyn LibraryStore) {
        let first = store.create_page("Eins", pairs(1), "raw", None).unwrap();
        let second = store.create_page("Zwei", pairs(1), "raw", None).unwrap();
        let book = store.create_book("Buch", None).unwrap();

        store.assign(&first.id, &book.id).unwrap();
        store.assign(&second.id, &book.id).unwrap();
        store.assign(&first.id, &book.id).unwrap();

        // 重复分配不改变顺序
        assert_eq!(
            ids(&store.pages_for_book(&book.id).unwrap()),
            vec![first.id.clone(), second.id.clone()]
        );
        assert_eq!(store.page_count(&book.id).unwrap(), 2);
        assert_eq!(store.associations().unwrap().len(), 2);
    }

    pub fn unassign_and_delete_page(store: &mut dyn LibraryStore) {
        let page = store.create_page("Unit", pairs(1), "raw", None).unwrap();
        let other = store.create_page("Andere", pairs(1), "raw", None).unwrap();
        let book = store.create_book("Buch", None).unwrap();
        let other_book = store.create_book("Anderes Buch", None).unwrap();

        // 关联不存在时什么都不做
        store.unassign(&page.id, &book.id).unwrap();

        store.assign(&page.id, &book.id).unwrap();
        store.unassign(&page.id, &other_book.id).unwrap();
        assert_eq!(store.book_for_page(&page.id).unwrap(), Some(book.id.clone()));

        store.unassign(&page.id, &book.id).unwrap();
        assert_eq!(store.book_for_page(&page.id).unwrap(), None);

        store.assign(&page.id, &book.id).unwrap();
        store.assign(&other.id, &book.id).unwrap();
        store.delete_page(&page.id).unwrap();
        assert!(store.get_page(&page.id).unwrap().is_none());
        assert_eq!(ids(&store.pages_for_book(&book.id).unwrap()), vec![other.id.clone()]);
        assert!(store.associations().unwrap().iter().all(|a| a.page_id != page.id));
    }

    pub fn unknown_ids(store: &mut dyn LibraryStore) {
        let page = store.create_page("Unit", pairs(1), "raw", None).unwrap();
        let book = store.create_book("Buch", None).unwrap();
        store.assign(&page.id, &book.id).unwrap();

        let err = store.assign(&page.id, "missing-book").unwrap_err();
        assert!(matches!(
            err,
            AppError::Persistence(crate::error::PersistenceError::BookNotFound { .. })
        ));
        // 失败的分配不能让页面脱离原来的书
        assert_eq!(store.book_for_page(&page.id).unwrap(), Some(book.id.clone()));

        assert!(store.assign("missing-page", &book.id).is_err());
        assert!(store.delete_book("missing-book").is_err());
        assert!(store.delete_page("missing-page").is_err());
        assert!(store.pages_for_book("missing-book").is_err());
    }

    pub fn ordering(store: &mut dyn LibraryStore, clock: &ManualClock) {
        let older = store.create_page("Alt", pairs(1), "raw", None).unwrap();
        clock.advance(chrono::Duration::seconds(10));
        let tie_a = store.create_page("Gleich A", pairs(1), "raw", None).unwrap();
        let tie_b = store.create_page("Gleich B", pairs(1), "raw", None).unwrap();

        assert_eq!(
            ids(&store.list_unassigned_pages().unwrap()),
            vec![tie_b.id.clone(), tie_a.id.clone(), older.id.clone()]
        );
        assert_eq!(ids(&store.list_pages().unwrap()), ids(&store.list_unassigned_pages().unwrap()));

        let book = store.create_book("Buch", None).unwrap();
        store.assign(&older.id, &book.id).unwrap();
        store.assign(&tie_b.id, &book.id).unwrap();
        store.assign(&tie_a.id, &book.id).unwrap();
        assert_eq!(
            ids(&store.pages_for_book(&book.id).unwrap()),
            vec![older.id.clone(), tie_b.id.clone(), tie_a.id.clone()]
        );
    }

    /// 随机顺序的 assign/unassign 序列后，每一步都只有一处归属
    pub fn membership_stays_unique(store: &mut dyn LibraryStore) {
        let pages: Vec<Page> = (0..4)
            .map(|i| store.create_page(&format!("Seite {}", i), pairs(1), "raw", None).unwrap())
            .collect();
        let books: Vec<Book> = (0..3)
            .map(|i| store.create_book(&format!("Buch {}", i), None).unwrap())
            .collect();

        // 固定种子的线性同余序列，保证可复现
        let mut state: u64 = 0x5eed;
        for _ in 0..200 {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let page = &pages[(state >> 33) as usize % pages.len()];
            let book = &books[(state >> 17) as usize % books.len()];
            if (state >> 7) % 3 == 0 {
                store.unassign(&page.id, &book.id).unwrap();
            } else {
                store.assign(&page.id, &book.id).unwrap();
            }
            assert_unique_membership(store);

            let assigned: usize = books
                .iter()
                .map(|b| store.page_count(&b.id).unwrap())
                .sum();
            let unassigned = store.list_unassigned_pages().unwrap().len();
            assert_eq!(assigned + unassigned, pages.len());
        }
    }
}
