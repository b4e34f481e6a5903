use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use super::{build_book, build_page, Clock, LibraryStore, SystemClock};
use crate::error::{AppError, AppResult, PersistenceError};
use crate::models::{Association, Book, Page, VocabularyPair};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS pages (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        pairs TEXT NOT NULL,
        raw_text TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        preview_image TEXT
    );
    CREATE TABLE IF NOT EXISTS books (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        cover_image TEXT,
        created_at INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS book_pages (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        book_id TEXT NOT NULL REFERENCES books(id) ON DELETE CASCADE,
        page_id TEXT NOT NULL UNIQUE REFERENCES pages(id) ON DELETE CASCADE
    );
";

const PAGE_COLUMNS: &str = "p.id, p.name, p.pairs, p.raw_text, p.created_at, p.preview_image";

/// SQLite 存储
///
/// `book_pages.page_id` 上的 UNIQUE 约束保证一个页面最多属于一本书；
/// 外键级联删除保证不会留下悬空关联
pub struct SqliteStore {
    conn: Connection,
    clock: Box<dyn Clock>,
}

/// 数据库中的一行页面，尚未反序列化
struct PageRow {
    id: String,
    name: String,
    pairs: String,
    raw_text: String,
    created_at: i64,
    preview_image: Option<String>,
}

impl PageRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            pairs: row.get(2)?,
            raw_text: row.get(3)?,
            created_at: row.get(4)?,
            preview_image: row.get(5)?,
        })
    }

    fn into_page(self) -> AppResult<Page> {
        let pairs: Vec<VocabularyPair> = serde_json::from_str(&self.pairs)?;
        Ok(Page {
            id: self.id,
            name: self.name,
            pairs,
            raw_text: self.raw_text,
            created_at: from_micros(self.created_at)?,
            preview_image: self.preview_image,
        })
    }
}

fn from_micros(micros: i64) -> AppResult<DateTime<Utc>> {
    Utc.timestamp_micros(micros).single().ok_or_else(|| {
        AppError::Persistence(PersistenceError::Serialization(format!(
            "ungültiger Zeitstempel: {}",
            micros
        )))
    })
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<(String, String, Option<String>, i64)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn into_book((id, name, cover_image, created_at): (String, String, Option<String>, i64)) -> AppResult<Book> {
    Ok(Book {
        id,
        name,
        cover_image,
        created_at: from_micros(created_at)?,
    })
}

impl SqliteStore {
    /// 打开（或创建）数据库文件
    pub fn open<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| PersistenceError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        info!("🗄️ 打开数据库: {}", path.display());
        Self::init(Connection::open(path)?, Box::new(SystemClock))
    }

    /// 内存数据库
    pub fn open_in_memory() -> AppResult<Self> {
        Self::init(Connection::open_in_memory()?, Box::new(SystemClock))
    }

    /// 替换时钟
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn init(conn: Connection, clock: Box<dyn Clock>) -> AppResult<Self> {
        conn.execute_batch("PRAGMA encoding = 'UTF-8'; PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn, clock })
    }

    fn page_exists(&self, page_id: &str) -> AppResult<bool> {
        Ok(self
            .conn
            .query_row("SELECT 1 FROM pages WHERE id = ?1", params![page_id], |_| Ok(()))
            .optional()?
            .is_some())
    }

    fn book_exists(&self, book_id: &str) -> AppResult<bool> {
        Ok(self
            .conn
            .query_row("SELECT 1 FROM books WHERE id = ?1", params![book_id], |_| Ok(()))
            .optional()?
            .is_some())
    }

    fn query_pages(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> AppResult<Vec<Page>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(args, PageRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(PageRow::into_page).collect()
    }
}

impl LibraryStore for SqliteStore {
    fn create_page(
        &mut self,
        name: &str,
        pairs: Vec<VocabularyPair>,
        raw_text: &str,
        preview_image: Option<String>,
    ) -> AppResult<Page> {
        let page = build_page(self.clock.as_ref(), name, pairs, raw_text, preview_image)?;
        let pairs_json = serde_json::to_string(&page.pairs)?;

        self.conn.execute(
            "INSERT INTO pages (id, name, pairs, raw_text, created_at, preview_image)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                page.id,
                page.name,
                pairs_json,
                page.raw_text,
                page.created_at.timestamp_micros(),
                page.preview_image
            ],
        )?;
        Ok(page)
    }

    fn create_book(&mut self, name: &str, cover_image: Option<String>) -> AppResult<Book> {
        let book = build_book(self.clock.as_ref(), name, cover_image)?;

        self.conn.execute(
            "INSERT INTO books (id, name, cover_image, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                book.id,
                book.name,
                book.cover_image,
                book.created_at.timestamp_micros()
            ],
        )?;
        info!("📚 新建书: {}", book.name);
        Ok(book)
    }

    fn assign(&mut self, page_id: &str, book_id: &str) -> AppResult<()> {
        if !self.page_exists(page_id)? {
            return Err(AppError::page_not_found(page_id));
        }
        if !self.book_exists(book_id)? {
            return Err(AppError::book_not_found(book_id));
        }

        // 删除旧关联和插入新关联在同一事务里，失败时回滚到原归属
        let tx = self.conn.transaction()?;
        let current: Option<String> = tx
            .query_row(
                "SELECT book_id FROM book_pages WHERE page_id = ?1",
                params![page_id],
                |row| row.get(0),
            )
            .optional()?;

        if current.as_deref() == Some(book_id) {
            debug!("页面 {} 已在书 {} 中，跳过", page_id, book_id);
            return Ok(());
        }

        tx.execute("DELETE FROM book_pages WHERE page_id = ?1", params![page_id])?;
        tx.execute(
            "INSERT INTO book_pages (book_id, page_id) VALUES (?1, ?2)",
            params![book_id, page_id],
        )?;
        tx.commit()?;

        debug!("页面 {} → 书 {}", page_id, book_id);
        Ok(())
    }

    fn unassign(&mut self, page_id: &str, book_id: &str) -> AppResult<()> {
        self.conn.execute(
            "DELETE FROM book_pages WHERE page_id = ?1 AND book_id = ?2",
            params![page_id, book_id],
        )?;
        Ok(())
    }

    fn delete_book(&mut self, book_id: &str) -> AppResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM book_pages WHERE book_id = ?1", params![book_id])?;
        let deleted = tx.execute("DELETE FROM books WHERE id = ?1", params![book_id])?;
        if deleted == 0 {
            return Err(AppError::book_not_found(book_id));
        }
        tx.commit()?;

        info!("🗑️ 删除书 {}（页面保留）", book_id);
        Ok(())
    }

    fn delete_page(&mut self, page_id: &str) -> AppResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM book_pages WHERE page_id = ?1", params![page_id])?;
        let deleted = tx.execute("DELETE FROM pages WHERE id = ?1", params![page_id])?;
        if deleted == 0 {
            return Err(AppError::page_not_found(page_id));
        }
        tx.commit()?;

        info!("🗑️ 删除页面 {}", page_id);
        Ok(())
    }

    fn list_unassigned_pages(&self) -> AppResult<Vec<Page>> {
        let sql = format!(
            "SELECT {} FROM pages p
             WHERE p.id NOT IN (SELECT page_id FROM book_pages)
             ORDER BY p.created_at DESC, p.seq DESC",
            PAGE_COLUMNS
        );
        self.query_pages(&sql, &[])
    }

    fn pages_for_book(&self, book_id: &str) -> AppResult<Vec<Page>> {
        if !self.book_exists(book_id)? {
            return Err(AppError::book_not_found(book_id));
        }
        let sql = format!(
            "SELECT {} FROM book_pages bp
             JOIN pages p ON p.id = bp.page_id
             WHERE bp.book_id = ?1
             ORDER BY bp.seq",
            PAGE_COLUMNS
        );
        self.query_pages(&sql, &[&book_id])
    }

    fn list_pages(&self) -> AppResult<Vec<Page>> {
        let sql = format!(
            "SELECT {} FROM pages p ORDER BY p.created_at DESC, p.seq DESC",
            PAGE_COLUMNS
        );
        self.query_pages(&sql, &[])
    }

    fn list_books(&self) -> AppResult<Vec<Book>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, cover_image, created_at FROM books ORDER BY seq")?;
        let rows = stmt
            .query_map([], book_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(into_book).collect()
    }

    fn get_page(&self, page_id: &str) -> AppResult<Option<Page>> {
        let sql = format!("SELECT {} FROM pages p WHERE p.id = ?1", PAGE_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, params![page_id], PageRow::from_row)
            .optional()?;
        row.map(PageRow::into_page).transpose()
    }

    fn get_book(&self, book_id: &str) -> AppResult<Option<Book>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, cover_image, created_at FROM books WHERE id = ?1",
                params![book_id],
                book_from_row,
            )
            .optional()?;
        row.map(into_book).transpose()
    }

    fn book_for_page(&self, page_id: &str) -> AppResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT book_id FROM book_pages WHERE page_id = ?1",
                params![page_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn associations(&self) -> AppResult<Vec<Association>> {
        let mut stmt = self.conn.prepare(
            "SELECT bp.book_id, bp.page_id FROM book_pages bp
             JOIN books b ON b.id = bp.book_id
             ORDER BY b.seq, bp.seq",
        )?;
        let associations = stmt
            .query_map([], |row| Ok(Association::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(associations)
    }

    fn page_count(&self, book_id: &str) -> AppResult<usize> {
        if !self.book_exists(book_id)? {
            return Err(AppError::book_not_found(book_id));
        }
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM book_pages WHERE book_id = ?1",
            params![book_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
