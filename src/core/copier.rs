//! 目录镜像引擎
//!
//! 递归地把源目录经过过滤后的内容复制到目标目录。每一层目标目录都有自己的
//! [`Manifest`]：进入目录时先删除上次记录的文件，再记录本次写入的文件。
//!
//! 注意：如果源目录中某个子目录整个消失，对应的目标子目录不会再被访问，
//! 因此其中上次写入的文件会保留下来。

use crate::core::filter::{Filter, HiddenFilter};
use crate::core::manifest::Manifest;
use crate::error::{MirrorError, Result};
use crate::paths;
use crate::storage::{LocalStorage, Storage};
use scopeguard::ScopeGuard;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// 默认清单文件名
pub const DEFAULT_MANIFEST_NAME: &str = ".mirror-manifest";

/// 镜像选项
#[derive(Debug, Clone)]
pub struct MirrorOptions {
    /// 每层目标目录中清单文件的名称
    pub manifest_name: String,
    /// 大文件阈值（字节），超过此大小的文件流式复制
    pub large_file_threshold: u64,
    /// 是否检测符号链接造成的目录环
    pub detect_cycles: bool,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            large_file_threshold: 10 * 1024 * 1024, // 10MB
            detect_cycles: true,
        }
    }
}

/// 镜像报告
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorReport {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub start_time: i64,
    pub end_time: i64,
    pub dirs_visited: u32,
    pub files_copied: u32,
    pub files_skipped: u32,
    pub stale_removed: u32,
    pub bytes_copied: u64,
    pub duration_ms: u64,
}

/// 目录树复制器
pub struct TreeCopier {
    storage: Arc<dyn Storage>,
    options: MirrorOptions,
}

impl TreeCopier {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            options: MirrorOptions::default(),
        }
    }

    pub fn with_options(storage: Arc<dyn Storage>, options: MirrorOptions) -> Self {
        Self { storage, options }
    }

    pub fn options(&self) -> &MirrorOptions {
        &self.options
    }

    /// 把 `source` 镜像到 `destination`
    ///
    /// 目标目录不存在时自动创建。第一个文件系统错误会终止整个操作，
    /// 已写入的部分不会回滚。
    pub fn run(
        &self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
        filter: &dyn Filter,
    ) -> Result<MirrorReport> {
        let started = Instant::now();
        let source = paths::absolute(source.as_ref())?;
        let destination = paths::absolute(destination.as_ref())?;

        info!(
            "开始镜像: {:?} -> {:?} (存储: {}, 清单: {})",
            source,
            destination,
            self.storage.name(),
            self.options.manifest_name
        );

        let mut report = MirrorReport {
            source: source.clone(),
            destination: destination.clone(),
            start_time: chrono::Utc::now().timestamp(),
            ..Default::default()
        };

        if self.storage.is_dir(&source) {
            let perms = self.storage.permissions(&source)?;
            self.storage.create_dir_all(&destination, perms)?;
        } else {
            warn!("源目录不存在，按空目录处理: {:?}", source);
            self.storage.ensure_dir(&destination)?;
        }

        let mut ancestors = Vec::new();
        self.mirror_dir(&source, &destination, filter, &mut ancestors, &mut report)?;

        report.end_time = chrono::Utc::now().timestamp();
        report.duration_ms = started.elapsed().as_millis() as u64;

        info!(
            "镜像完成: {} 个目录, {} 个文件 ({} 字节), 跳过 {} 项, 清理 {} 项",
            report.dirs_visited,
            report.files_copied,
            report.bytes_copied,
            report.files_skipped,
            report.stale_removed
        );

        Ok(report)
    }

    /// 处理一层目录，清单的生命周期与这一层的调用帧一致
    fn mirror_dir(
        &self,
        source: &Path,
        destination: &Path,
        filter: &dyn Filter,
        ancestors: &mut Vec<PathBuf>,
        report: &mut MirrorReport,
    ) -> Result<()> {
        let source_exists = self.storage.is_dir(source);
        if self.options.detect_cycles && source_exists {
            let identity = self.storage.canonicalize(source)?;
            if ancestors.contains(&identity) {
                return Err(MirrorError::SymlinkCycle {
                    path: source.to_path_buf(),
                });
            }
            ancestors.push(identity);
        }

        let mut manifest = Manifest::new(destination.join(&self.options.manifest_name));
        let removed = manifest.clean(self.storage.as_ref())?;
        if removed > 0 {
            debug!("清理了 {} 个上次写入的文件: {:?}", removed, destination);
        }
        report.stale_removed += removed as u32;
        manifest.create()?;

        // 出错返回时也要关闭清单
        let mut manifest = scopeguard::guard(manifest, |m| {
            let path = m.path().to_path_buf();
            if let Err(e) = m.close() {
                warn!("关闭清单失败 {:?}: {}", path, e);
            }
        });

        let children = if source_exists {
            self.storage.list_children(source)?
        } else {
            Vec::new()
        };

        for child in children {
            let Some(name) = child.file_name() else {
                continue;
            };
            // 源目录中的清单（例如上一级镜像的输出）不能当作普通内容复制
            if name == self.options.manifest_name.as_str() {
                debug!("跳过清单文件: {:?}", child);
                continue;
            }

            let relative = paths::path_relative_to(&child, source)?;
            if !filter.include(&relative) {
                debug!("过滤: {:?}", child);
                report.files_skipped += 1;
                continue;
            }

            // 目标名直接取原始文件名，不经过字符串转换
            let dest = destination.join(name);

            if self.storage.is_dir(&child) {
                let perms = self.storage.permissions(&child)?;
                self.storage.create_dir_all(&dest, perms)?;
                self.mirror_dir(&child, &dest, filter, ancestors, report)?;
            } else {
                if let Some(parent) = dest.parent() {
                    self.storage.ensure_dir(parent)?;
                }
                report.bytes_copied += self.copy_file(&child, &dest)?;
                manifest.add_file(&dest)?;
                report.files_copied += 1;
            }
        }

        ScopeGuard::into_inner(manifest).close()?;

        if self.options.detect_cycles && source_exists {
            ancestors.pop();
        }
        report.dirs_visited += 1;
        Ok(())
    }

    /// 复制单个文件并沿用源文件的权限位，返回字节数
    fn copy_file(&self, source: &Path, destination: &Path) -> Result<u64> {
        let perms = self.storage.permissions(source)?;
        let size = self.storage.file_size(source)?;

        if size > self.options.large_file_threshold {
            debug!("流式复制大文件: {:?} ({} 字节)", source, size);
            return self.storage.copy_streamed(source, destination, perms);
        }

        let data = self.storage.read(source)?;
        self.storage.write(destination, &data, perms)?;
        debug!("已复制: {:?} -> {:?}", source, destination);
        Ok(data.len() as u64)
    }
}

/// 镜像目录内容，跳过隐藏文件和目录
pub fn copy_folder_contents(
    source: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    manifest_name: &str,
) -> Result<()> {
    copy_folder_contents_with_filter(source, destination, manifest_name, &HiddenFilter)
}

/// 镜像目录内容，只复制 `filter` 返回 true 的条目
pub fn copy_folder_contents_with_filter(
    source: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    manifest_name: &str,
    filter: &dyn Filter,
) -> Result<()> {
    let options = MirrorOptions {
        manifest_name: manifest_name.to_string(),
        ..Default::default()
    };
    TreeCopier::with_options(Arc::new(LocalStorage::new()), options)
        .run(source, destination, filter)
        .map(|_| ())
}

/// 在 tokio 的阻塞线程池上运行镜像
pub async fn mirror_async(
    storage: Arc<dyn Storage>,
    options: MirrorOptions,
    source: PathBuf,
    destination: PathBuf,
    filter: Arc<dyn Filter + Send + Sync>,
) -> Result<MirrorReport> {
    tokio::task::spawn_blocking(move || {
        TreeCopier::with_options(storage, options).run(&source, &destination, &*filter)
    })
    .await?
}
