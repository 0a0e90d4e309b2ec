//! 日志相关命令

use crate::logging::{LogConfig, VALID_LEVELS};
use crate::AppState;
use anyhow::{bail, Context, Result};

/// 获取日志配置
pub fn get_log_config(state: &AppState) -> LogConfig {
    LogConfig::load(&state.config_dir)
}

/// 设置日志配置
pub fn set_log_config(
    state: &AppState,
    enabled: Option<bool>,
    max_size_mb: Option<u32>,
    level: Option<String>,
) -> Result<LogConfig> {
    let mut config = LogConfig::load(&state.config_dir);

    if let Some(e) = enabled {
        config.enabled = e;
    }
    if let Some(size) = max_size_mb {
        // 限制范围 1-100 MB
        config.max_size_mb = size.clamp(1, 100);
    }
    if let Some(l) = level {
        let l = l.to_lowercase();
        if !VALID_LEVELS.contains(&l.as_str()) {
            bail!("无效的日志级别: {}", l);
        }
        config.level = l;
    }

    config
        .save(&state.config_dir)
        .with_context(|| format!("保存日志配置失败: {:?}", state.config_dir))?;

    Ok(config)
}
