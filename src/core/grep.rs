//! 按 glob 查找文件内容

use crate::error::{IoResultExt, MirrorError, Result};
use crate::paths::to_slash;
use globset::GlobBuilder;
use regex::bytes::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

fn is_glob_meta(part: &str) -> bool {
    part.contains(['*', '?', '[', '{'])
}

/// 拆出 glob 开头不含通配符的目录部分
fn literal_base(glob: &str) -> Option<PathBuf> {
    let parts: Vec<&str> = glob.split('/').collect();
    let literal = parts.iter().take_while(|p| !is_glob_meta(p)).count();
    if literal == 0 {
        return None;
    }
    let base = parts[..literal].join("/");
    Some(PathBuf::from(if base.is_empty() { "/".to_string() } else { base }))
}

/// 如果 glob 匹配到的任一文件内容包含 `regex`，返回 true
///
/// `**` 匹配零或多级目录，`*` 不跨越 `/`。目录会被跳过。
pub fn grep(regex: &Regex, glob: &str) -> Result<bool> {
    let matcher = GlobBuilder::new(glob)
        .literal_separator(true)
        .build()
        .map_err(|e| MirrorError::Pattern {
            pattern: glob.to_string(),
            reason: e.to_string(),
        })?
        .compile_matcher();

    let base = literal_base(glob);
    let root = base.clone().unwrap_or_else(|| PathBuf::from("."));
    if fs::symlink_metadata(&root).is_err() {
        debug!("glob 根目录不存在: {:?}", root);
        return Ok(false);
    }

    for entry in WalkDir::new(&root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(&root).to_path_buf();
            MirrorError::io(path, io::Error::from(e))
        })?;
        let path = entry.path();

        let candidate = if base.is_some() {
            to_slash(path)
        } else {
            to_slash(path.strip_prefix(".").unwrap_or(path))
        };
        if !matcher.is_match(&candidate) || is_dir(path) {
            continue;
        }

        let bytes = fs::read(path).at_path(path)?;
        if regex.is_match(&bytes) {
            debug!("匹配: {:?}", path);
            return Ok(true);
        }
    }

    Ok(false)
}

fn is_dir(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}
