//! 路径工具
//!
//! 所有返回的路径字符串统一使用 `/` 作为分隔符，便于跨平台按字符串比较。

use crate::error::{IoResultExt, Result};
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

/// 规范化路径分隔符（统一使用 /）
pub fn to_slash(path: impl AsRef<Path>) -> String {
    let s = path.as_ref().to_string_lossy().into_owned();
    if MAIN_SEPARATOR == '/' {
        s
    } else {
        s.replace(MAIN_SEPARATOR, "/")
    }
}

/// 词法清理路径：去掉 `.`，折叠 `..`，不访问文件系统
pub fn clean(path: impl AsRef<Path>) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.as_ref().components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// 清理路径并统一分隔符
pub fn clean_path(path: impl AsRef<Path>) -> String {
    to_slash(clean(path))
}

/// 拼接路径，返回使用 / 分隔的清理后路径
pub fn join_path<I, P>(elems: I) -> String
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut joined = PathBuf::new();
    for elem in elems {
        joined.push(elem);
    }
    clean_path(joined)
}

/// 绝对化路径（不解析符号链接）
pub fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(clean(path))
    } else {
        let cwd = std::env::current_dir().at_path(path)?;
        Ok(clean(cwd.join(path)))
    }
}

/// 返回规范路径：相对路径视为相对于 `base_path`，结果为绝对路径且已折叠 `..`
pub fn canonical_path(path: impl AsRef<Path>, base_path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_path.as_ref().join(path)
    };
    Ok(to_slash(absolute(&joined)?))
}

/// 批量规范化路径，遇到第一个错误即返回
pub fn canonical_paths<I, P>(paths: I, base_path: impl AsRef<Path>) -> Result<Vec<String>>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let base_path = base_path.as_ref();
    paths
        .into_iter()
        .map(|p| canonical_path(p, base_path))
        .collect()
}

/// 从 `base_path` 到 `path` 的相对路径（使用 / 分隔）
///
/// 空字符串按 `.` 处理。两者都先绝对化，因此可以混用相对和绝对路径。
pub fn path_relative_to(path: impl AsRef<Path>, base_path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let base_path = base_path.as_ref();
    let path = if path.as_os_str().is_empty() { Path::new(".") } else { path };
    let base_path = if base_path.as_os_str().is_empty() {
        Path::new(".")
    } else {
        base_path
    };

    let target = absolute(path)?;
    let base = absolute(base_path)?;

    let target_parts: Vec<Component> = target.components().collect();
    let base_parts: Vec<Component> = base.components().collect();
    let common = target_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base_parts.len() {
        rel.push("..");
    }
    for part in &target_parts[common..] {
        rel.push(part.as_os_str());
    }
    if rel.as_os_str().is_empty() {
        return Ok(".".to_string());
    }
    Ok(to_slash(rel))
}

/// 路径中是否存在以 `.` 开头的组件（`.` 与 `..` 本身除外）
pub fn contains_hidden_component(path: &str) -> bool {
    path.split(|c: char| c == '/' || c == MAIN_SEPARATOR)
        .any(|part| part.starts_with('.') && part != "." && part != "..")
}

/// 用双斜杠拼接模块目录与其内部路径，例如 `modules//vpc`
pub fn join_module_path(modules_dir: &str, path: &str) -> String {
    let dir = modules_dir.trim_end_matches(['/', '\\']);
    let path = path.trim_start_matches(['/', '\\']);
    format!("{}//{}", dir, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_hidden_component() {
        assert!(contains_hidden_component(".git"));
        assert!(contains_hidden_component("a/.hidden/b.txt"));
        assert!(!contains_hidden_component("a/b.txt"));
        assert!(!contains_hidden_component("./a"));
        assert!(!contains_hidden_component("../a/b"));
        assert!(!contains_hidden_component("."));
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("/a/b/../c/./d"), "/a/c/d");
        assert_eq!(clean_path("a/../../b"), "../b");
        assert_eq!(clean_path(""), ".");
        assert_eq!(clean_path("/.."), "/");
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path(["/a", "b", "../c"]), "/a/c");
        assert_eq!(join_path(["a", "b"]), "a/b");
    }

    #[test]
    fn test_canonical_path() {
        assert_eq!(canonical_path("../c", "/a/b").unwrap(), "/a/c");
        assert_eq!(canonical_path("/x/./y", "/a/b").unwrap(), "/x/y");
        assert_eq!(
            canonical_paths(["c", "/d"], "/a").unwrap(),
            vec!["/a/c".to_string(), "/d".to_string()]
        );
    }

    #[test]
    fn test_path_relative_to() {
        assert_eq!(path_relative_to("/a/b/c.txt", "/a").unwrap(), "b/c.txt");
        assert_eq!(path_relative_to("/a", "/a/b").unwrap(), "..");
        assert_eq!(path_relative_to("/a/x", "/a/b").unwrap(), "../x");
        assert_eq!(path_relative_to("/a", "/a").unwrap(), ".");
        assert_eq!(path_relative_to("", "").unwrap(), ".");
    }

    #[test]
    fn test_join_module_path() {
        assert_eq!(join_module_path("modules/", "/vpc"), "modules//vpc");
        assert_eq!(join_module_path("modules", "vpc/main"), "modules//vpc/main");
    }
}
