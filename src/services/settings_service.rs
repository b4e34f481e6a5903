//! 设置服务 - 业务能力层
//!
//! 只保存一个值：提取服务的 API 密钥。后写覆盖先写，没有版本。
//! 以对象形式注入给提取流程，不读全局状态。

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AppResult, ConfigError, ValidationError};

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
}

/// API 密钥存储
///
/// 指定了文件路径时，每次修改都会写回 TOML 文件
#[derive(Debug)]
pub struct CredentialStore {
    key: RwLock<Option<String>>,
    path: Option<PathBuf>,
}

impl CredentialStore {
    /// 仅内存
    pub fn in_memory() -> Self {
        Self {
            key: RwLock::new(None),
            path: None,
        }
    }

    /// 从 TOML 文件加载；文件不存在视为没有密钥
    pub fn load(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let key = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| unreadable(&path, e))?;
            let file: SettingsFile = toml::from_str(&content).map_err(|e| unreadable(&path, e))?;
            file.api_key.filter(|k| !k.trim().is_empty())
        } else {
            None
        };
        debug!("加载设置 {}: 密钥{}", path.display(), if key.is_some() { "已配置" } else { "未配置" });

        Ok(Self {
            key: RwLock::new(key),
            path: Some(path),
        })
    }

    pub fn get(&self) -> Option<String> {
        match self.key.read() {
            Ok(key) => key.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// 保存密钥（去除首尾空白）；空白输入被拒绝
    pub fn set(&self, api_key: &str) -> AppResult<()> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ValidationError::BlankCredential.into());
        }
        self.persist(Some(api_key))?;
        self.write(Some(api_key.to_string()));
        info!("🔑 API 密钥已保存");
        Ok(())
    }

    pub fn clear(&self) -> AppResult<()> {
        self.persist(None)?;
        self.write(None);
        info!("🔑 API 密钥已删除");
        Ok(())
    }

    /// 用于展示的掩码形式，例如 `AIza…9xQk`
    pub fn masked(&self) -> Option<String> {
        self.get().map(|key| mask(&key))
    }

    fn write(&self, value: Option<String>) {
        match self.key.write() {
            Ok(mut key) => *key = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }

    fn persist(&self, api_key: Option<&str>) -> AppResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let file = SettingsFile {
            api_key: api_key.map(str::to_string),
        };
        let content = toml::to_string(&file).map_err(|e| unwritable(path, e))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| unwritable(path, e))?;
        }
        std::fs::write(path, content).map_err(|e| unwritable(path, e))?;
        Ok(())
    }
}

fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "•".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}

fn unreadable(path: &Path, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::SettingsUnreadable {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

fn unwritable(path: &Path, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::SettingsUnwritable {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_get_set_clear() {
        let store = CredentialStore::in_memory();
        assert_eq!(store.get(), None);

        store.set("  first-key ").unwrap();
        assert_eq!(store.get().as_deref(), Some("first-key"));

        store.set("second-key").unwrap();
        assert_eq!(store.get().as_deref(), Some("second-key"));

        store.clear().unwrap();
        assert_eq!(store.get(), None);
    }

    #[test]
    fn test_blank_key_rejected_and_previous_kept() {
        let store = CredentialStore::in_memory();
        store.set("kept").unwrap();

        let err = store.set("   ").unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::BlankCredential)));
        assert_eq!(store.get().as_deref(), Some("kept"));
    }

    #[test]
    fn test_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("settings.toml");

        let store = CredentialStore::load(&path).unwrap();
        assert_eq!(store.get(), None);
        store.set("AIzaSyExampleKey1234").unwrap();

        let reloaded = CredentialStore::load(&path).unwrap();
        assert_eq!(reloaded.get().as_deref(), Some("AIzaSyExampleKey1234"));

        reloaded.clear().unwrap();
        assert_eq!(CredentialStore::load(&path).unwrap().get(), None);
    }

    #[test]
    fn test_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "api_key = [").unwrap();
        assert!(matches!(
            CredentialStore::load(&path).unwrap_err(),
            AppError::Config(ConfigError::SettingsUnreadable { .. })
        ));
    }

    #[test]
    fn test_masked() {
        let store = CredentialStore::in_memory();
        assert_eq!(store.masked(), None);
        store.set("AIzaSyExampleKey1234").unwrap();
        assert_eq!(store.masked().as_deref(), Some("AIza…1234"));
        store.set("short").unwrap();
        assert_eq!(store.masked().as_deref(), Some("•••••"));
    }
}
