//! 查看清单、目录摘要和内容搜索

use crate::core::digest::tree_digest;
use crate::core::grep::grep;
use crate::core::manifest::Manifest;
use anyhow::{Context, Result};
use regex::bytes::Regex;
use std::path::{Path, PathBuf};

/// 读取清单记录
pub fn show_manifest(path: &Path) -> Result<Vec<PathBuf>> {
    Manifest::read_entries(path).with_context(|| format!("无法读取清单: {:?}", path))
}

/// 计算目录摘要
pub fn digest(dir: &Path, manifest_name: &str) -> Result<String> {
    tree_digest(dir, manifest_name).with_context(|| format!("无法计算摘要: {:?}", dir))
}

/// 在 glob 匹配的文件中搜索正则
pub fn search(pattern: &str, glob: &str) -> Result<bool> {
    let regex = Regex::new(pattern).with_context(|| format!("无效的正则: {}", pattern))?;
    Ok(grep(&regex, glob)?)
}
