//! 镜像相关命令

use crate::config::MirrorConfig;
use crate::core::copier::{mirror_async, MirrorReport};
use crate::storage::LocalStorage;
use crate::AppState;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// 单次运行对配置的覆盖
#[derive(Debug, Clone, Default)]
pub struct MirrorOverrides {
    pub manifest_name: Option<String>,
    pub exclude_patterns: Vec<String>,
    pub include_hidden: Option<bool>,
    pub large_file_threshold: Option<u64>,
}

impl MirrorOverrides {
    fn apply(self, config: &mut MirrorConfig) {
        if let Some(name) = self.manifest_name {
            config.manifest_name = name;
        }
        config.exclude_patterns.extend(self.exclude_patterns);
        if let Some(hidden) = self.include_hidden {
            config.include_hidden = hidden;
        }
        if let Some(threshold) = self.large_file_threshold {
            config.large_file_threshold = threshold;
        }
    }
}

/// 执行一次镜像
pub async fn run_mirror(
    state: &AppState,
    source: PathBuf,
    destination: PathBuf,
    overrides: MirrorOverrides,
) -> Result<MirrorReport> {
    let mut config = MirrorConfig::load(&state.config_dir);
    overrides.apply(&mut config);

    let filter = config.filter().context("无效的排除规则")?;
    info!("排除规则: {:?}", filter.patterns());

    let report = mirror_async(
        Arc::new(LocalStorage::new()),
        config.options(),
        source.clone(),
        destination.clone(),
        Arc::new(filter),
    )
    .await
    .with_context(|| format!("镜像失败: {:?} -> {:?}", source, destination))?;

    Ok(report)
}

/// 获取镜像配置
pub fn get_mirror_config(state: &AppState) -> MirrorConfig {
    MirrorConfig::load(&state.config_dir)
}

/// 保存镜像配置（排除规则整体替换）
pub fn set_mirror_config(state: &AppState, overrides: MirrorOverrides) -> Result<MirrorConfig> {
    let mut config = MirrorConfig::load(&state.config_dir);
    if !overrides.exclude_patterns.is_empty() {
        config.exclude_patterns.clear();
    }
    overrides.apply(&mut config);

    // 保存前校验规则
    config.filter().context("无效的排除规则")?;
    config
        .save(&state.config_dir)
        .with_context(|| format!("保存镜像配置失败: {:?}", state.config_dir))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_run_mirror_uses_saved_excludes() {
        let tmp = tempfile::tempdir().unwrap();
        let state = AppState::with_config_dir(tmp.path().join("config"));
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("keep.rs"), "k").unwrap();
        fs::write(src.join("skip.tmp"), "s").unwrap();

        set_mirror_config(
            &state,
            MirrorOverrides {
                exclude_patterns: vec!["*.tmp".to_string()],
                ..Default::default()
            },
        )
        .unwrap();

        let report = run_mirror(&state, src, dst.clone(), MirrorOverrides::default())
            .await
            .unwrap();

        assert_eq!(report.files_copied, 1);
        assert!(dst.join("keep.rs").exists());
        assert!(!dst.join("skip.tmp").exists());
    }

    #[test]
    fn test_set_mirror_config_rejects_bad_pattern() {
        let tmp = tempfile::tempdir().unwrap();
        let state = AppState::with_config_dir(tmp.path().to_path_buf());
        let result = set_mirror_config(
            &state,
            MirrorOverrides {
                exclude_patterns: vec!["[oops".to_string()],
                ..Default::default()
            },
        );
        assert!(result.is_err());
        assert!(get_mirror_config(&state).exclude_patterns.is_empty());
    }
}
