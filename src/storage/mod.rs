pub mod local;

use crate::error::Result;
use std::fs::Permissions;
use std::path::{Path, PathBuf};

pub use local::LocalStorage;

/// 流式复制时的缓冲区大小
pub const COPY_BUFFER_SIZE: usize = 256 * 1024;

/// 存储抽象接口
///
/// 镜像引擎只通过这个接口访问文件系统。目录/文件的判断会跟随符号链接。
pub trait Storage: Send + Sync {
    /// 是否为目录（跟随符号链接，出错视为 false）
    fn is_dir(&self, path: &Path) -> bool;

    /// 获取权限位（跟随符号链接）
    fn permissions(&self, path: &Path) -> Result<Permissions>;

    /// 列出目录的直接子项，按名称排序
    fn list_children(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// 文件大小（跟随符号链接）
    fn file_size(&self, path: &Path) -> Result<u64>;

    /// 读取整个文件
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// 写入整个文件，并设置权限位
    fn write(&self, path: &Path, data: &[u8], perms: Permissions) -> Result<()>;

    /// 以固定大小缓冲区流式复制文件，返回字节数
    fn copy_streamed(&self, from: &Path, to: &Path, perms: Permissions) -> Result<u64>;

    /// 递归创建目录，新建的目录使用给定权限位
    fn create_dir_all(&self, path: &Path, perms: Permissions) -> Result<()>;

    /// 目录不存在时以仅属主可访问的权限创建
    fn ensure_dir(&self, path: &Path) -> Result<()>;

    /// 递归删除，不存在时什么也不做
    fn remove_all(&self, path: &Path) -> Result<()>;

    /// 解析为绝对、无符号链接的路径
    fn canonicalize(&self, path: &Path) -> Result<PathBuf>;

    /// 获取存储名称（用于日志）
    fn name(&self) -> &str;
}
