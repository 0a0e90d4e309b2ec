//! 日志模块 - 提供文件日志和大小管理功能

use crate::config::{load_section, resolve_config_dir, save_section};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

const LOG_FILE: &str = "mirrortools.log";

/// 合法的日志级别
pub const VALID_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfig {
    /// 是否启用日志记录
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 最大日志文件大小（MB）
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u32,
    /// 日志级别: "error", "warn", "info", "debug", "trace"
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_enabled() -> bool {
    true
}

fn default_max_size_mb() -> u32 {
    5 // 默认 5MB
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_size_mb: default_max_size_mb(),
            level: default_level(),
        }
    }
}

impl LogConfig {
    /// 从配置文件加载日志配置
    pub fn load(config_dir: &Path) -> Self {
        load_section(config_dir, "log").unwrap_or_default()
    }

    /// 保存日志配置
    pub fn save(&self, config_dir: &Path) -> io::Result<()> {
        save_section(config_dir, "log", self)
    }

    /// 将配置的日志级别转换为 tracing Level
    pub fn tracing_level(&self) -> tracing::Level {
        match self.level.to_lowercase().as_str() {
            "error" => tracing::Level::ERROR,
            "warn" => tracing::Level::WARN,
            "debug" => tracing::Level::DEBUG,
            "trace" => tracing::Level::TRACE,
            _ => tracing::Level::INFO,
        }
    }
}

/// 当前打开的日志文件及其已写入的大小
struct LogFile {
    writer: BufWriter<File>,
    size: u64,
}

/// 带大小限制的日志写入器
///
/// 写入后累计大小超过上限时，把当前文件改名为 `.log.old` 并重新打开。
/// 克隆出的写入器共享同一个文件。
#[derive(Clone)]
pub struct SizeRotatingWriter {
    path: PathBuf,
    max_size: u64,
    current: Arc<Mutex<Option<LogFile>>>,
}

impl SizeRotatingWriter {
    pub fn new(log_dir: &Path, max_size_mb: u32) -> io::Result<Self> {
        fs::create_dir_all(log_dir)?;
        let path = log_dir.join(LOG_FILE);
        let max_size = u64::from(max_size_mb) * 1024 * 1024;
        let file = open_log(&path, max_size)?;

        Ok(Self {
            path,
            max_size,
            current: Arc::new(Mutex::new(Some(file))),
        })
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, Option<LogFile>>> {
        self.current
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "日志写入器锁已损坏"))
    }
}

/// 打开日志文件用于追加，已超过上限的旧文件先轮转
fn open_log(path: &Path, max_size: u64) -> io::Result<LogFile> {
    let existing = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let size = if existing > max_size {
        rotate(path)?;
        0
    } else {
        existing
    };

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(LogFile {
        writer: BufWriter::new(file),
        size,
    })
}

fn rotate(path: &Path) -> io::Result<()> {
    let backup = path.with_extension("log.old");
    match fs::remove_file(&backup) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    fs::rename(path, backup)
}

impl Write for SizeRotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.lock()?;
        let log = guard
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "日志写入器不可用"))?;

        let n = log.writer.write(buf)?;
        log.writer.flush()?;
        log.size += n as u64;

        if log.size > self.max_size {
            // 先释放旧句柄再改名
            drop(guard.take());
            *guard = Some(open_log(&self.path, self.max_size)?);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.lock()?.as_mut() {
            Some(log) => log.writer.flush(),
            None => Ok(()),
        }
    }
}

/// 获取日志目录路径（跟随数据存储位置）
pub fn get_log_dir() -> PathBuf {
    resolve_config_dir()
}
