//! 应用配置模块
//!
//! 所有配置保存在配置目录下的 `config.json`，每个模块占一个顶层字段。

use crate::core::copier::{MirrorOptions, DEFAULT_MANIFEST_NAME};
use crate::core::filter::PatternFilter;
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.json";

/// 读取 `config.json` 中的某个字段，缺失或损坏时返回 None
pub fn load_section<T: DeserializeOwned>(config_dir: &Path, section: &str) -> Option<T> {
    let content = fs::read_to_string(config_dir.join(CONFIG_FILE)).ok()?;
    let config = serde_json::from_str::<serde_json::Value>(&content).ok()?;
    serde_json::from_value(config.get(section)?.clone()).ok()
}

/// 更新 `config.json` 中的某个字段，保留其它字段
pub fn save_section<T: Serialize>(config_dir: &Path, section: &str, value: &T) -> io::Result<()> {
    let config_file = config_dir.join(CONFIG_FILE);

    // 读取现有配置
    let mut config: serde_json::Value = if config_file.exists() {
        let content = fs::read_to_string(&config_file)?;
        serde_json::from_str(&content).unwrap_or_else(|_| serde_json::json!({}))
    } else {
        serde_json::json!({})
    };
    if !config.is_object() {
        config = serde_json::json!({});
    }

    config[section] = serde_json::to_value(value)?;

    fs::create_dir_all(config_dir)?;
    fs::write(&config_file, serde_json::to_string_pretty(&config)?)
}

/// 默认配置目录
pub fn default_config_dir() -> PathBuf {
    crate::dirs::config_dir()
        .map(|p| p.join("mirrortools"))
        .unwrap_or_else(|| PathBuf::from(".mirrortools"))
}

/// 实际使用的配置目录：默认目录中的 `data_path` 指向已存在的目录时使用它
pub fn resolve_config_dir() -> PathBuf {
    let default_dir = default_config_dir();
    load_section::<String>(&default_dir, "data_path")
        .map(PathBuf::from)
        .filter(|p| p.is_dir())
        .inspect(|p| tracing::debug!("使用自定义数据路径: {:?}", p))
        .unwrap_or(default_dir)
}

/// 镜像配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorConfig {
    /// 清单文件名
    #[serde(default = "default_manifest_name")]
    pub manifest_name: String,
    /// 额外的排除规则（glob，匹配相对于所在目录的路径）
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    /// 是否包含隐藏文件和目录
    #[serde(default)]
    pub include_hidden: bool,
    /// 大文件阈值（字节）
    #[serde(default = "default_large_file_threshold")]
    pub large_file_threshold: u64,
    /// 是否检测符号链接循环
    #[serde(default = "default_detect_cycles")]
    pub detect_cycles: bool,
}

fn default_manifest_name() -> String {
    DEFAULT_MANIFEST_NAME.to_string()
}

fn default_large_file_threshold() -> u64 {
    MirrorOptions::default().large_file_threshold
}

fn default_detect_cycles() -> bool {
    true
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            manifest_name: default_manifest_name(),
            exclude_patterns: Vec::new(),
            include_hidden: false,
            large_file_threshold: default_large_file_threshold(),
            detect_cycles: default_detect_cycles(),
        }
    }
}

impl MirrorConfig {
    /// 从配置文件加载镜像配置
    pub fn load(config_dir: &Path) -> Self {
        load_section(config_dir, "mirror").unwrap_or_default()
    }

    /// 保存镜像配置
    pub fn save(&self, config_dir: &Path) -> io::Result<()> {
        save_section(config_dir, "mirror", self)
    }

    pub fn options(&self) -> MirrorOptions {
        MirrorOptions {
            manifest_name: self.manifest_name.clone(),
            large_file_threshold: self.large_file_threshold,
            detect_cycles: self.detect_cycles,
        }
    }

    /// 根据排除规则和隐藏文件设置构建过滤器
    pub fn filter(&self) -> Result<PatternFilter> {
        PatternFilter::new(&self.exclude_patterns, !self.include_hidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filter::Filter;

    #[test]
    fn test_load_missing_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = MirrorConfig::load(tmp.path());
        assert_eq!(config.manifest_name, DEFAULT_MANIFEST_NAME);
        assert!(config.detect_cycles);
        assert!(!config.include_hidden);
    }

    #[test]
    fn test_save_keeps_other_sections() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"{"log": {"level": "debug"}, "mirror": {"manifestName": "old"}}"#,
        )
        .unwrap();

        let mut config = MirrorConfig::load(tmp.path());
        assert_eq!(config.manifest_name, "old");
        config.exclude_patterns = vec!["*.tmp".to_string()];
        config.save(tmp.path()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(tmp.path().join(CONFIG_FILE)).unwrap())
                .unwrap();
        assert_eq!(raw["log"]["level"], "debug");
        assert_eq!(raw["mirror"]["excludePatterns"][0], "*.tmp");
    }

    #[test]
    fn test_corrupt_config_falls_back() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "{not json").unwrap();
        assert_eq!(MirrorConfig::load(tmp.path()).manifest_name, DEFAULT_MANIFEST_NAME);
    }

    #[test]
    fn test_filter_from_config() {
        let config = MirrorConfig {
            exclude_patterns: vec!["*.bak".to_string()],
            include_hidden: true,
            ..Default::default()
        };
        let filter = config.filter().unwrap();
        assert!(filter.include(".env"));
        assert!(!filter.include("old.bak"));
    }
}
