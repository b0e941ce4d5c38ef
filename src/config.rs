//! Persisted configuration record: application title, the two-tier
//! passwords, the chat-service credential pair, and the upload hint.
//!
//! Loaded once per process. A missing file is created with the defaults;
//! fields missing from an existing file are filled with their defaults so
//! old config files keep working after upgrades.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_title")]
    pub app_title: String,
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
    #[serde(default = "default_user_password")]
    pub user_password: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_upload_hint")]
    pub upload_hint: String,
}

fn default_app_title() -> String {
    "AI课堂教学数据分析工具".to_string()
}

fn default_admin_password() -> String {
    "199266".to_string()
}

fn default_user_password() -> String {
    "123456".to_string()
}

fn default_upload_hint() -> String {
    "⬆️ BI平台下载 - 班级数据（分学科）原文件导入即可".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            app_title: default_app_title(),
            admin_password: default_admin_password(),
            user_password: default_user_password(),
            api_key: String::new(),
            secret_key: String::new(),
            upload_hint: default_upload_hint(),
        }
    }
}

/// Load the config, creating the file with defaults when absent.
pub fn load<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    if !path.exists() {
        let cfg = AppConfig::default();
        save(path, &cfg)?;
        return Ok(cfg);
    }
    let raw = fs::read_to_string(path).with_context(|| format!("读取配置 {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("解析配置 {}", path.display()))
}

/// Write the whole record back.
pub fn save<P: AsRef<Path>>(path: P, cfg: &AppConfig) -> Result<()> {
    let path = path.as_ref();
    let raw = serde_json::to_string_pretty(cfg)?;
    fs::write(path, raw).with_context(|| format!("写入配置 {}", path.display()))?;
    Ok(())
}
