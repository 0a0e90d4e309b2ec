//! 镜像过滤规则
//!
//! 过滤器收到的是条目相对于*所在目录*的路径（即当前层级被列出的目录），
//! 而不是相对于顶层源目录的路径。

use crate::error::{MirrorError, Result};
use crate::paths::contains_hidden_component;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::debug;

/// 决定某个条目是否被镜像
pub trait Filter {
    fn include(&self, relative_path: &str) -> bool;
}

impl<F> Filter for F
where
    F: Fn(&str) -> bool,
{
    fn include(&self, relative_path: &str) -> bool {
        self(relative_path)
    }
}

/// 默认过滤器：跳过隐藏文件和目录
#[derive(Debug, Clone, Copy, Default)]
pub struct HiddenFilter;

impl Filter for HiddenFilter {
    fn include(&self, relative_path: &str) -> bool {
        !contains_hidden_component(relative_path)
    }
}

/// 基于 glob 排除规则的过滤器
#[derive(Debug, Clone)]
pub struct PatternFilter {
    skip_hidden: bool,
    patterns: Vec<String>,
    excludes: GlobSet,
}

impl PatternFilter {
    /// `skip_hidden` 为 true 时先应用隐藏文件规则
    pub fn new<I, S>(patterns: I, skip_hidden: bool) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        let mut kept = Vec::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| MirrorError::Pattern {
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                })?;
            builder.add(glob);
            kept.push(pattern.to_string());
        }
        let excludes = builder.build().map_err(|e| MirrorError::Pattern {
            pattern: kept.join(","),
            reason: e.to_string(),
        })?;

        Ok(Self {
            skip_hidden,
            patterns: kept,
            excludes,
        })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl Filter for PatternFilter {
    fn include(&self, relative_path: &str) -> bool {
        if self.skip_hidden && contains_hidden_component(relative_path) {
            return false;
        }
        if self.excludes.is_match(relative_path) {
            debug!("排除: {}", relative_path);
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_filter() {
        assert!(HiddenFilter.include("a.txt"));
        assert!(!HiddenFilter.include(".hidden"));
        assert!(!HiddenFilter.include("sub/.git"));
    }

    #[test]
    fn test_closure_is_filter() {
        let only_txt = |p: &str| p.ends_with(".txt");
        assert!(only_txt.include("a.txt"));
        assert!(!only_txt.include("a.md"));
    }

    #[test]
    fn test_pattern_filter() {
        let filter = PatternFilter::new(["*.tmp", "node_modules", "~*"], true).unwrap();
        assert!(filter.include("main.rs"));
        assert!(!filter.include("build.tmp"));
        assert!(!filter.include("node_modules"));
        assert!(!filter.include("~lock"));
        assert!(!filter.include(".env"));
    }

    #[test]
    fn test_pattern_filter_keeps_hidden_when_asked() {
        let filter = PatternFilter::new(Vec::<String>::new(), false).unwrap();
        assert!(filter.include(".env"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = PatternFilter::new(["a[b"], true).unwrap_err();
        assert!(matches!(err, MirrorError::Pattern { .. }));
    }
}
