//! 目录树摘要 - 用于比较两次镜像结果是否一致

use crate::error::{IoResultExt, MirrorError, Result};
use crate::paths::to_slash;
use std::fs::{self, Metadata};
use std::io;
use std::path::Path;
use walkdir::WalkDir;

#[cfg(unix)]
fn mode_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_bits(metadata: &Metadata) -> u32 {
    u32::from(metadata.permissions().readonly())
}

/// 计算目录树的 BLAKE3 摘要
///
/// 覆盖相对路径、条目类型、权限位和文件内容，名为 `manifest_name` 的清单文件不参与计算。
pub fn tree_digest(root: &Path, manifest_name: &str) -> Result<String> {
    let mut hasher = blake3::Hasher::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            MirrorError::io(path, io::Error::from(e))
        })?;
        if entry.file_name() == manifest_name {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let metadata = entry.metadata().map_err(|e| MirrorError::io(path, io::Error::from(e)))?;

        hasher.update(to_slash(relative).as_bytes());
        hasher.update(&[0]);
        hasher.update(&mode_bits(&metadata).to_le_bytes());

        if metadata.is_dir() {
            hasher.update(b"d");
        } else {
            hasher.update(b"f");
            let data = fs::read(path).at_path(path)?;
            hasher.update(&(data.len() as u64).to_le_bytes());
            hasher.update(&data);
        }
    }

    Ok(hasher.finalize().to_hex().to_string())
}
