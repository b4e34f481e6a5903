use std::path::PathBuf;

/// 程序配置
///
/// API 密钥不在这里，它由 `CredentialStore` 单独管理
#[derive(Clone, Debug)]
pub struct Config {
    /// 数据目录
    pub data_dir: PathBuf,
    /// SQLite 数据库文件
    pub database_path: PathBuf,
    /// 设置文件（保存 API 密钥）
    pub settings_path: PathBuf,
    /// 试卷 PDF 输出目录
    pub output_dir: PathBuf,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 上传图片的最大字节数
    pub max_image_bytes: usize,
    // --- LLM 配置 ---
    pub llm_api_base_url: String,
    pub llm_model_name: String,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = PathBuf::from("data");
        Self {
            database_path: data_dir.join("library.sqlite3"),
            settings_path: data_dir.join("settings.toml"),
            data_dir,
            output_dir: PathBuf::from("output_pdf"),
            verbose_logging: false,
            max_image_bytes: 10 * 1024 * 1024,
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-2.0-flash".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        // 数据目录改了的话，库文件和设置文件默认跟着走
        let data_dir = std::env::var("VOKABEL_DATA_DIR").map(PathBuf::from).unwrap_or(default.data_dir);
        Self {
            database_path: std::env::var("VOKABEL_DATABASE").map(PathBuf::from).unwrap_or_else(|_| data_dir.join("library.sqlite3")),
            settings_path: std::env::var("VOKABEL_SETTINGS_FILE").map(PathBuf::from).unwrap_or_else(|_| data_dir.join("settings.toml")),
            data_dir,
            output_dir: std::env::var("VOKABEL_OUTPUT_DIR").map(PathBuf::from).unwrap_or(default.output_dir),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            max_image_bytes: std::env::var("MAX_IMAGE_BYTES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_image_bytes),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths_live_in_data_dir() {
        let config = Config::default();
        assert!(config.database_path.starts_with(&config.data_dir));
        assert!(config.settings_path.starts_with(&config.data_dir));
        assert_eq!(config.llm_model_name, "gemini-2.0-flash");
        assert_eq!(config.max_image_bytes, 10 * 1024 * 1024);
    }
}
