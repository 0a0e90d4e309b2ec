use super::{Storage, COPY_BUFFER_SIZE};
use crate::error::{IoResultExt, Result};
use std::fs::{self, File, Permissions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// 本地文件系统
pub struct LocalStorage {
    name: String,
}

impl LocalStorage {
    pub fn new() -> Self {
        Self {
            name: "local".to_string(),
        }
    }
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
fn build_dirs(path: &Path, perms: &Permissions) -> io::Result<()> {
    use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
    fs::DirBuilder::new()
        .recursive(true)
        .mode(perms.mode() & 0o7777)
        .create(path)
}

#[cfg(not(unix))]
fn build_dirs(path: &Path, _perms: &Permissions) -> io::Result<()> {
    fs::DirBuilder::new().recursive(true).create(path)
}

#[cfg(unix)]
fn build_private_dirs(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(path)
}

#[cfg(not(unix))]
fn build_private_dirs(path: &Path) -> io::Result<()> {
    fs::DirBuilder::new().recursive(true).create(path)
}

impl Storage for LocalStorage {
    fn is_dir(&self, path: &Path) -> bool {
        fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
    }

    fn permissions(&self, path: &Path) -> Result<Permissions> {
        fs::metadata(path).map(|m| m.permissions()).at_path(path)
    }

    fn list_children(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut children = Vec::new();
        for entry in fs::read_dir(path).at_path(path)? {
            let entry = entry.at_path(path)?;
            children.push(entry.path());
        }
        children.sort();
        Ok(children)
    }

    fn file_size(&self, path: &Path) -> Result<u64> {
        fs::metadata(path).map(|m| m.len()).at_path(path)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).at_path(path)
    }

    fn write(&self, path: &Path, data: &[u8], perms: Permissions) -> Result<()> {
        fs::write(path, data).at_path(path)?;
        fs::set_permissions(path, perms).at_path(path)
    }

    fn copy_streamed(&self, from: &Path, to: &Path, perms: Permissions) -> Result<u64> {
        let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, File::open(from).at_path(from)?);
        let mut writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, File::create(to).at_path(to)?);

        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
        let mut total = 0u64;
        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).at_path(from),
            };
            writer.write_all(&buffer[..n]).at_path(to)?;
            total += n as u64;
        }
        writer.flush().at_path(to)?;
        drop(writer);

        fs::set_permissions(to, perms).at_path(to)?;
        Ok(total)
    }

    fn create_dir_all(&self, path: &Path, perms: Permissions) -> Result<()> {
        if self.is_dir(path) {
            return Ok(());
        }
        build_dirs(path, &perms).at_path(path)?;
        // DirBuilder 的模式受 umask 影响，新建后再显式设置一次
        fs::set_permissions(path, perms).at_path(path)
    }

    fn ensure_dir(&self, path: &Path) -> Result<()> {
        if self.is_dir(path) {
            return Ok(());
        }
        build_private_dirs(path).at_path(path)
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        let metadata = match fs::symlink_metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e).at_path(path),
        };

        let result = if metadata.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).at_path(path),
        }
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        fs::canonicalize(path).at_path(path)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_all_missing_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new();
        storage.remove_all(&tmp.path().join("nope")).unwrap();
    }

    #[test]
    fn test_remove_all_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("d");
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("nested/f"), b"x").unwrap();

        let storage = LocalStorage::new();
        storage.remove_all(&dir).unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn test_list_children_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["c", "a", "b"] {
            fs::write(tmp.path().join(name), b"").unwrap();
        }
        let storage = LocalStorage::new();
        let names: Vec<_> = storage
            .list_children(tmp.path())
            .unwrap()
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_copy_streamed_matches_source() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src.bin");
        let dst = tmp.path().join("dst.bin");
        let data: Vec<u8> = (0..(COPY_BUFFER_SIZE * 2 + 17)).map(|i| (i % 251) as u8).collect();
        fs::write(&src, &data).unwrap();

        let storage = LocalStorage::new();
        let perms = storage.permissions(&src).unwrap();
        let n = storage.copy_streamed(&src, &dst, perms).unwrap();

        assert_eq!(n, data.len() as u64);
        assert_eq!(fs::read(&dst).unwrap(), data);
    }

    #[test]
    fn test_ensure_dir_and_queries() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new();
        let dir = tmp.path().join("a/b");
        storage.ensure_dir(&dir).unwrap();
        storage.ensure_dir(&dir).unwrap();

        let file = dir.join("f.txt");
        fs::write(&file, "hello").unwrap();
        assert!(!storage.is_dir(&file));
        assert_eq!(storage.read(&file).unwrap(), b"hello");
        assert_eq!(storage.file_size(&file).unwrap(), 5);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_classification_follows_target() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new();
        let target = tmp.path().join("target");
        fs::create_dir(&target).unwrap();
        let link = tmp.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        assert!(storage.is_dir(&link));
        assert_eq!(
            storage.canonicalize(&link).unwrap(),
            storage.canonicalize(&target).unwrap()
        );

        // 删除链接本身，不影响目标
        storage.remove_all(&link).unwrap();
        assert!(target.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_create_dir_all_ignores_umask_for_new_dir() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new();
        let dir = tmp.path().join("shared");
        storage
            .create_dir_all(&dir, fs::Permissions::from_mode(0o775))
            .unwrap();
        assert_eq!(fs::metadata(&dir).unwrap().permissions().mode() & 0o777, 0o775);

        // 已存在的目录保持原样
        storage
            .create_dir_all(&dir, fs::Permissions::from_mode(0o700))
            .unwrap();
        assert_eq!(fs::metadata(&dir).unwrap().permissions().mode() & 0o777, 0o775);
    }

    #[test]
    fn test_read_missing_reports_path() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing");
        let err = LocalStorage::new().read(&missing).unwrap_err();
        assert_eq!(err.path(), Some(missing.as_path()));
    }
}
