use std::path::PathBuf;

pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod paths;
pub mod storage;

pub use crate::core::{
    copy_folder_contents, copy_folder_contents_with_filter, mirror_async, Filter, HiddenFilter,
    Manifest, MirrorOptions, MirrorReport, PatternFilter, TreeCopier,
};
pub use error::{MirrorError, Result};

/// 命令层共享的应用状态
#[derive(Debug, Clone)]
pub struct AppState {
    pub config_dir: PathBuf,
}

impl AppState {
    pub fn new() -> anyhow::Result<Self> {
        let config_dir = config::resolve_config_dir();
        std::fs::create_dir_all(&config_dir)?;
        Ok(Self { config_dir })
    }

    pub fn with_config_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }
}

pub mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        if cfg!(target_os = "windows") {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        } else if cfg!(target_os = "macos") {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library").join("Application Support"))
        } else {
            // Linux：优先 XDG_CONFIG_HOME
            std::env::var("XDG_CONFIG_HOME")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".config"))
                })
        }
    }
}
