//! 错误类型

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 镜像引擎错误
#[derive(Debug, Error)]
pub enum MirrorError {
    /// 文件系统操作失败（stat、列目录、读、写、创建、删除）
    #[error("文件操作失败 {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// 清单记录损坏或被截断
    #[error("清单解析失败 {path:?}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// 符号链接形成了目录环
    #[error("检测到符号链接循环: {path:?}")]
    SymlinkCycle { path: PathBuf },

    /// 无效的 glob 或正则
    #[error("无效的模式 {pattern:?}: {reason}")]
    Pattern { pattern: String, reason: String },

    /// 后台阻塞任务异常退出
    #[error("后台任务失败: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl MirrorError {
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        MirrorError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn serialization(path: impl AsRef<Path>, source: serde_json::Error) -> Self {
        MirrorError::Serialization {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// 出错的路径（如果有）
    pub fn path(&self) -> Option<&Path> {
        match self {
            MirrorError::Io { path, .. }
            | MirrorError::Serialization { path, .. }
            | MirrorError::SymlinkCycle { path } => Some(path),
            MirrorError::Pattern { .. } | MirrorError::Task(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, MirrorError>;

/// 给 `io::Result` 附加出错路径
pub trait IoResultExt<T> {
    fn at_path(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn at_path(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|e| MirrorError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_keeps_path() {
        let err: Result<()> =
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")).at_path("/tmp/x");
        let err = err.unwrap_err();
        assert_eq!(err.path(), Some(Path::new("/tmp/x")));
        assert!(matches!(err, MirrorError::Io { .. }));
    }
}
