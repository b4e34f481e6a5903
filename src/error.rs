use thiserror::Error;

/// 应用程序错误类型
///
/// 所有错误都只作用于触发它的那一次用户操作，不会导致进程退出
#[derive(Debug, Error)]
pub enum AppError {
    /// 输入校验失败（不修改任何数据）
    #[error("{0}")]
    Validation(#[from] ValidationError),
    /// 提取服务（LLM）错误
    #[error("{0}")]
    Upstream(#[from] UpstreamError),
    /// 存储层错误
    #[error("{0}")]
    Persistence(#[from] PersistenceError),
    /// 文档生成错误
    #[error("{0}")]
    Document(#[from] DocumentError),
    /// 配置错误
    #[error("{0}")]
    Config(#[from] ConfigError),
}

/// 输入校验错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Bitte geben Sie einen Namen für die Vokabelliste ein.")]
    BlankListName,
    #[error("Bitte geben Sie einen Buchnamen ein.")]
    BlankBookName,
    #[error("Keine Vokabeln zum Speichern vorhanden.")]
    EmptyRawText,
    #[error("Keine gültigen Vokabelpaare gefunden.")]
    NoPairs,
    #[error("Bitte geben Sie einen API-Schlüssel ein.")]
    BlankCredential,
    #[error("Bitte laden Sie ein Bild hoch.")]
    MissingImage,
    #[error("Bitte wählen Sie eine gültige Bilddatei aus. ({path})")]
    InvalidImage { path: String },
    #[error("Das Bild ist zu groß ({size} Bytes, maximal {max} Bytes).")]
    ImageTooLarge { size: usize, max: usize },
}

/// 提取服务错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    /// 尚未配置 API 密钥
    #[error("Bitte konfigurieren Sie zuerst Ihren API-Schlüssel in den Einstellungen.")]
    MissingCredential,
    /// 服务拒绝了 API 密钥
    #[error("Ungültiger API-Schlüssel. Bitte überprüfen Sie Ihren API-Schlüssel in den Einstellungen.")]
    InvalidCredential,
    /// 其他任何失败，原样透出消息
    #[error("Fehler bei der Verarbeitung: {message}")]
    Failure { message: String },
}

/// 存储层错误
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Vokabelseite nicht gefunden: {page_id}")]
    PageNotFound { page_id: String },
    #[error("Buch nicht gefunden: {book_id}")]
    BookNotFound { book_id: String },
    #[error("Datenbankfehler: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Dateifehler ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Daten konnten nicht gelesen werden: {0}")]
    Serialization(String),
}

/// 文档生成错误
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Die Vokabelliste enthält keine Vokabelpaare.")]
    NoPairs,
    #[error("Die Punktzahl muss größer als 0 sein.")]
    NonPositiveTotal,
    #[error("PDF konnte nicht erstellt werden: {message}")]
    GenerationFailed { message: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Einstellungsdatei {path} konnte nicht gelesen werden: {message}")]
    SettingsUnreadable { path: String, message: String },
    #[error("Einstellungsdatei {path} konnte nicht geschrieben werden: {message}")]
    SettingsUnwritable { path: String, message: String },
}

// ========== 从常见错误类型转换 ==========

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Persistence(PersistenceError::Database(err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Persistence(PersistenceError::Serialization(err.to_string()))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建上游失败错误
    pub fn upstream_failure(message: impl Into<String>) -> Self {
        AppError::Upstream(UpstreamError::Failure {
            message: message.into(),
        })
    }

    /// 创建文档生成失败错误
    pub fn generation_failed(message: impl Into<String>) -> Self {
        AppError::Document(DocumentError::GenerationFailed {
            message: message.into(),
        })
    }

    pub fn page_not_found(page_id: impl Into<String>) -> Self {
        AppError::Persistence(PersistenceError::PageNotFound {
            page_id: page_id.into(),
        })
    }

    pub fn book_not_found(book_id: impl Into<String>) -> Self {
        AppError::Persistence(PersistenceError::BookNotFound {
            book_id: book_id.into(),
        })
    }

    /// 是否需要把用户引导到设置页
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            AppError::Upstream(UpstreamError::MissingCredential | UpstreamError::InvalidCredential)
        )
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
