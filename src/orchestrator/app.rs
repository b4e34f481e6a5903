//! 应用编排 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：加载设置、打开数据库、创建提取流程
//! 2. **命令分发**：每条命令只执行一次用户操作
//! 3. **资源管理**：持有存储和文档查看器，生成的文档用完即释放
//!
//! 本层不含业务判断，只做调度和输出格式化

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use tracing::info;

use crate::cli::{BookAction, Command, KeyAction, PageAction};
use crate::config::Config;
use crate::document::{DocumentGenerator, DocumentViewer, ViewerState};
use crate::error::{AppError, AppResult};
use crate::logger;
use crate::models::Page;
use crate::services::{CredentialStore, ExtractionBackend, ExtractionService, ImagePayload, OpenAiVisionBackend};
use crate::store::{LibraryStore, SqliteStore};
use crate::workflow::{ExtractionOutcome, ScanFlow};

/// 应用主结构
pub struct App<B> {
    config: Config,
    store: Box<dyn LibraryStore>,
    flow: ScanFlow<B>,
    credentials: Arc<CredentialStore>,
    generator: DocumentGenerator,
    viewer: DocumentViewer,
}

impl App<OpenAiVisionBackend> {
    /// 用默认组件初始化：SQLite 存储 + Gemini 后端
    pub fn initialize(config: Config) -> AppResult<Self> {
        logger::log_startup(&config.database_path.display().to_string(), &config.llm_model_name);

        let credentials = Arc::new(CredentialStore::load(&config.settings_path)?);
        let store = SqliteStore::open(&config.database_path)?;
        let backend = OpenAiVisionBackend::new(&config);

        Ok(Self::with_parts(config, Box::new(store), backend, credentials))
    }
}

impl<B: ExtractionBackend> App<B> {
    /// 用指定组件组装
    pub fn with_parts(
        config: Config,
        store: Box<dyn LibraryStore>,
        backend: B,
        credentials: Arc<CredentialStore>,
    ) -> Self {
        let flow = ScanFlow::new(ExtractionService::new(backend, Arc::clone(&credentials)));
        Self {
            config,
            store,
            flow,
            credentials,
            generator: DocumentGenerator::default(),
            viewer: DocumentViewer::new(),
        }
    }

    pub fn store(&self) -> &dyn LibraryStore {
        self.store.as_ref()
    }

    /// 执行一条命令，返回给用户看的文本
    pub async fn execute(&mut self, command: Command) -> AppResult<String> {
        match command {
            Command::Scan { image, name } => self.scan(&image, name.as_deref()).await,
            Command::Pages { unassigned } => self.list_pages(unassigned),
            Command::Page { action } => match action {
                PageAction::Show { id } => self.show_page(&id),
                PageAction::Delete { id } => {
                    self.store.delete_page(&id)?;
                    Ok(format!("Vokabelseite {} gelöscht.", id))
                }
            },
            Command::Book { action } => self.book(action),
            Command::Assign { page, book } => {
                self.store.assign(&page, &book)?;
                Ok(format!("Vokabelseite {} → Buch {}", page, book))
            }
            Command::Unassign { page, book } => {
                self.store.unassign(&page, &book)?;
                Ok(format!("Vokabelseite {} aus Buch {} entfernt.", page, book))
            }
            Command::Print { page, out } => {
                let dir = out.unwrap_or_else(|| self.config.output_dir.clone());
                self.print(&page, &dir).await
            }
            Command::Key { action } => self.key(action),
        }
    }

    async fn scan(&mut self, image_path: &Path, name: Option<&str>) -> AppResult<String> {
        let image = ImagePayload::from_path(image_path, self.config.max_image_bytes)?;

        let extraction = match self.flow.extract(Some(&image)).await? {
            ExtractionOutcome::Completed(extraction) => extraction,
            ExtractionOutcome::Superseded => {
                return Ok("Die Anfrage wurde durch eine neuere ersetzt.".to_string())
            }
        };

        let mut output = String::new();
        let _ = writeln!(output, "{}", extraction.raw_text.trim());
        let _ = writeln!(output, "\n{} Vokabelpaare erkannt.", extraction.pairs.len());

        if let Some(name) = name {
            let page = self.flow.save(self.store.as_mut(), name, &extraction)?;
            let _ = writeln!(
                output,
                "Vokabelliste \"{}\" erfolgreich gespeichert! ({} Vokabelpaare) [{}]",
                page.name,
                page.pairs.len(),
                page.id
            );
        }
        Ok(output)
    }

    fn list_pages(&self, unassigned_only: bool) -> AppResult<String> {
        let pages = if unassigned_only {
            self.store.list_unassigned_pages()?
        } else {
            self.store.list_pages()?
        };
        if pages.is_empty() {
            return Ok("Keine Vokabelseiten vorhanden.".to_string());
        }

        let mut output = String::new();
        for page in &pages {
            let book = match self.store.book_for_page(&page.id)? {
                Some(book_id) => self
                    .store
                    .get_book(&book_id)?
                    .map(|b| b.name)
                    .unwrap_or(book_id),
                None => "-".to_string(),
            };
            let _ = writeln!(
                output,
                "{}  {}  ({} Vokabelpaare, {})  Buch: {}",
                page.id,
                page.name,
                page.pairs.len(),
                format_date(&page.created_at),
                book
            );
        }
        Ok(output)
    }

    fn show_page(&self, page_id: &str) -> AppResult<String> {
        let page = self.require_page(page_id)?;

        let mut output = format!("{} ({})\n", page.name, format_date(&page.created_at));
        for (i, pair) in page.pairs.iter().enumerate() {
            let _ = writeln!(output, "{:>3}. {} → {}", i + 1, pair.source(), pair.target());
        }
        Ok(output)
    }

    fn book(&mut self, action: BookAction) -> AppResult<String> {
        match action {
            BookAction::Create { name, cover } => {
                let cover_image = cover
                    .map(|path| ImagePayload::from_path(&path, self.config.max_image_bytes))
                    .transpose()?
                    .map(|image| image.to_data_url());
                let book = self.store.create_book(&name, cover_image)?;
                Ok(format!("Buch \"{}\" erstellt [{}]", book.name, book.id))
            }
            BookAction::List => {
                let books = self.store.list_books()?;
                if books.is_empty() {
                    return Ok("Keine Bücher vorhanden.".to_string());
                }
                let mut output = String::new();
                for book in &books {
                    let _ = writeln!(
                        output,
                        "{}  {}  ({} Seiten)",
                        book.id,
                        book.name,
                        self.store.page_count(&book.id)?
                    );
                }
                Ok(output)
            }
            BookAction::Show { id } => {
                let book = self
                    .store
                    .get_book(&id)?
                    .ok_or_else(|| AppError::book_not_found(&id))?;
                let pages = self.store.pages_for_book(&id)?;

                let mut output = format!("{} ({} Vokabelseiten)\n", book.name, pages.len());
                if pages.is_empty() {
                    output.push_str("Noch keine Vokabelseiten zugeordnet.\n");
                }
                for page in &pages {
                    let _ = writeln!(output, "  {}  {}  ({} Vokabelpaare)", page.id, page.name, page.pairs.len());
                }
                Ok(output)
            }
            BookAction::Delete { id } => {
                self.store.delete_book(&id)?;
                Ok(format!("Buch {} gelöscht. Die Vokabelseiten bleiben erhalten.", id))
            }
        }
    }

    async fn print(&mut self, page_id: &str, dir: &Path) -> AppResult<String> {
        let page = self.require_page(page_id)?;
        let today = Local::now().date_naive();

        let result = self.generator.generate_in_background(page, today).await;
        self.viewer.show(result);

        let output = match self.viewer.state() {
            ViewerState::Failed { message } => Err(AppError::generation_failed(message.clone())),
            _ => match (self.viewer.save_to(dir)?, self.viewer.current()) {
                (Some(path), Some(document)) => Ok(format!(
                    "{} gespeichert ({} Seiten, {} Vokabeln).",
                    path.display(),
                    document.page_count,
                    document.row_count
                )),
                _ => Err(AppError::generation_failed("kein Dokument")),
            },
        };

        self.viewer.close();
        output
    }

    fn key(&self, action: KeyAction) -> AppResult<String> {
        match action {
            KeyAction::Set { key } => {
                self.credentials.set(&key)?;
                Ok("API-Schlüssel erfolgreich gespeichert!".to_string())
            }
            KeyAction::Show => Ok(self
                .credentials
                .masked()
                .unwrap_or_else(|| "Kein API-Schlüssel konfiguriert.".to_string())),
            KeyAction::Clear => {
                self.credentials.clear()?;
                info!("API 密钥已清除");
                Ok("API-Schlüssel wurde gelöscht.".to_string())
            }
        }
    }

    fn require_page(&self, page_id: &str) -> AppResult<Page> {
        self.store
            .get_page(page_id)?
            .ok_or_else(|| AppError::page_not_found(page_id))
    }
}

fn format_date(timestamp: &DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%d.%m.%Y").to_string()
}
