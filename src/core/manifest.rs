//! 目录清单
//!
//! 每个目标目录一个清单文件，逐条记录本次运行直接写入该目录的文件路径。
//! 下次运行进入同一目录时先按清单删除上次写入的文件，再重新记录。
//!
//! 记录格式是换行分隔的 JSON 值，可以逐条流式解码；
//! 中途中断的运行留下的前缀依然是合法记录。UTF-8 路径记为字符串，
//! 其他路径（unix 上的任意字节文件名）记为字节数组。

use crate::error::{IoResultExt, MirrorError, Result};
use crate::storage::Storage;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// 清单中的一条记录
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Record {
    Text(String),
    Bytes(Vec<u8>),
}

impl Record {
    fn from_path(path: &Path) -> Option<Self> {
        match path.to_str() {
            Some(s) => Some(Record::Text(s.to_string())),
            None => path_bytes(path).map(Record::Bytes),
        }
    }

    fn into_path(self) -> Option<PathBuf> {
        match self {
            Record::Text(s) => Some(PathBuf::from(s)),
            Record::Bytes(b) => path_from_bytes(b),
        }
    }
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Option<Vec<u8>> {
    use std::os::unix::ffi::OsStrExt;
    Some(path.as_os_str().as_bytes().to_vec())
}

#[cfg(not(unix))]
fn path_bytes(_path: &Path) -> Option<Vec<u8>> {
    None
}

#[cfg(unix)]
fn path_from_bytes(bytes: Vec<u8>) -> Option<PathBuf> {
    use std::os::unix::ffi::OsStringExt;
    Some(PathBuf::from(std::ffi::OsString::from_vec(bytes)))
}

#[cfg(not(unix))]
fn path_from_bytes(_bytes: Vec<u8>) -> Option<PathBuf> {
    None
}

/// 单个目录的文件清单
#[derive(Debug)]
pub struct Manifest {
    path: PathBuf,
    entries: Vec<PathBuf>,
    file: Option<File>,
}

impl Manifest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
            file: None,
        }
    }

    /// 清单文件自身的路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 本次运行已记录的文件数
    pub fn recorded(&self) -> usize {
        self.entries.len()
    }

    /// 本次运行已记录的路径，按写入顺序
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// 删除上次运行记录的所有文件，然后删除清单本身
    ///
    /// 清单不存在时什么也不做。返回处理的记录条数。
    pub fn clean(&self, storage: &dyn Storage) -> Result<usize> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(MirrorError::io(&self.path, e)),
        };

        let mut removed = 0;
        for entry in decode_stream(&self.path, file) {
            let stale = entry?;
            debug!("删除上次写入的文件: {:?}", stale);
            storage.remove_all(&stale)?;
            removed += 1;
        }

        storage.remove_all(&self.path)?;
        Ok(removed)
    }

    /// 新建（或截断）清单文件，准备追加记录
    pub fn create(&mut self) -> Result<()> {
        let file = File::create(&self.path).at_path(&self.path)?;
        self.file = Some(file);
        self.entries.clear();
        Ok(())
    }

    /// 追加一条记录
    ///
    /// 每条记录单独写入，进程中断时已写入的记录不会丢失。
    pub fn add_file(&mut self, path: &Path) -> Result<()> {
        let file = self.file.as_mut().ok_or_else(|| {
            MirrorError::io(
                &self.path,
                io::Error::new(io::ErrorKind::Other, "清单尚未创建"),
            )
        })?;

        let record = Record::from_path(path).ok_or_else(|| {
            MirrorError::serialization(
                &self.path,
                serde::ser::Error::custom(format!("无法编码的路径: {:?}", path)),
            )
        })?;
        let mut record = serde_json::to_vec(&record)
            .map_err(|e| MirrorError::serialization(&self.path, e))?;
        record.push(b'\n');
        file.write_all(&record).at_path(&self.path)?;

        self.entries.push(path.to_path_buf());
        Ok(())
    }

    /// 刷新并释放写句柄
    pub fn close(mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().at_path(&self.path)?;
        }
        Ok(())
    }

    /// 解码清单文件中的全部记录
    pub fn read_entries(path: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let path = path.as_ref();
        let file = File::open(path).at_path(path)?;
        decode_stream(path, file).collect()
    }
}

/// 逐条解码换行分隔的记录
fn decode_stream(path: &Path, file: File) -> impl Iterator<Item = Result<PathBuf>> {
    let path = path.to_path_buf();
    serde_json::Deserializer::from_reader(BufReader::new(file))
        .into_iter::<Record>()
        .map(move |item| {
            let record = item.map_err(|e| {
                if e.is_io() {
                    MirrorError::io(&path, e.into())
                } else {
                    MirrorError::serialization(&path, e)
                }
            })?;
            record.into_path().ok_or_else(|| {
                MirrorError::serialization(
                    &path,
                    serde::de::Error::custom("此平台不支持字节形式的路径记录"),
                )
            })
        })
}
