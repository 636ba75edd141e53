use std::path::{Path, PathBuf};

use serde::Serialize;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
const APP_DIR_NAME: &str = "fileshelf";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub data_dir: PathBuf,
    pub download_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SettingsSnapshot {
    pub api_base_url: String,
    pub data_dir: String,
    pub download_dir: String,
}

impl Settings {
    pub fn snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot {
            api_base_url: self.api_base_url.clone(),
            data_dir: self.data_dir.display().to_string(),
            download_dir: self.download_dir.display().to_string(),
        }
    }
}

pub fn read_settings() -> Settings {
    let home = dirs::home_dir().unwrap_or_else(std::env::temp_dir);
    let api_base_url = std::env::var("FILESHELF_API_URL")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
    let data_dir = std::env::var("FILESHELF_DATA_DIR")
        .ok()
        .map(|value| expand_with_home(&value, &home))
        .unwrap_or_else(default_data_dir);
    let download_dir = std::env::var("FILESHELF_DOWNLOAD_DIR")
        .ok()
        .map(|value| expand_with_home(&value, &home))
        .or_else(dirs::download_dir)
        .unwrap_or_else(|| data_dir.join("downloads"));

    Settings {
        api_base_url,
        data_dir,
        download_dir,
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}

fn expand_with_home(value: &str, home: &Path) -> PathBuf {
    if value == "~" {
        return home.to_path_buf();
    }
    if let Some(rest) = value.strip_prefix("~/") {
        return home.join(rest);
    }
    PathBuf::from(value)
}
