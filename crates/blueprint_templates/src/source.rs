//! Read-only file trees templates are loaded from.
//!
//! [`DirSource`] reads a directory on disk, [`MemorySource`] holds an
//! in-memory bundle (for example one assembled from `include_bytes!`).
//! Paths passed to a source are relative to its root.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

/// Kind of a source entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// A read-only template file tree.
pub trait TemplateSource: Send + Sync + fmt::Debug {
    /// Read a file's bytes.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Kind of the entry at `path`.
    fn kind(&self, path: &Path) -> io::Result<EntryKind>;

    /// Names of a directory's entries, sorted.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<String>>;

    /// Paths of every file named `file_name`, in sorted walk order.
    fn find_files<'a>(&'a self, file_name: &'a str) -> Box<dyn Iterator<Item = PathBuf> + 'a>;

    fn exists(&self, path: &Path) -> bool {
        self.kind(path).is_ok()
    }
}

/// Strip `.` components so `./a/b` and `a/b` address the same entry.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Resolve `path` lexically against a source root. Absolute paths and `..`
/// climbing above the root are rejected.
pub(crate) fn confine(path: &Path) -> io::Result<PathBuf> {
    let mut resolved = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => resolved.push(part),
            Component::ParentDir if resolved.pop() => {}
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} escapes the template source root", path.display()),
                ))
            }
        }
    }
    Ok(resolved)
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} does not exist", path.display()),
    )
}

/// A directory on disk.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &Path) -> io::Result<PathBuf> {
        Ok(self.root.join(confine(path)?))
    }
}

impl TemplateSource for DirSource {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(self.full_path(path)?)
    }

    fn kind(&self, path: &Path) -> io::Result<EntryKind> {
        let meta = fs::metadata(self.full_path(path)?)?;
        Ok(if meta.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        })
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut names = fs::read_dir(self.full_path(path)?)?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<io::Result<Vec<_>>>()?;
        names.sort();
        Ok(names)
    }

    fn find_files<'a>(&'a self, file_name: &'a str) -> Box<dyn Iterator<Item = PathBuf> + 'a> {
        Box::new(
            WalkDir::new(&self.root)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(move |e| e.file_type().is_file() && e.file_name() == file_name)
                .filter_map(move |e| {
                    e.path()
                        .strip_prefix(&self.root)
                        .ok()
                        .map(Path::to_path_buf)
                }),
        )
    }
}

/// An in-memory file tree. Directories are implied by file paths.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: BTreeMap<PathBuf, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, builder style.
    pub fn with_file(mut self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        self.files.insert(normalize(path.as_ref()), content.into());
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.as_os_str().is_empty() || self.files.keys().any(|p| p != path && p.starts_with(path))
    }
}

impl TemplateSource for MemorySource {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let path = confine(path)?;
        self.files.get(&path).cloned().ok_or_else(|| {
            if self.is_dir(&path) {
                io::Error::new(
                    io::ErrorKind::Other,
                    format!("{} is a directory", path.display()),
                )
            } else {
                not_found(&path)
            }
        })
    }

    fn kind(&self, path: &Path) -> io::Result<EntryKind> {
        let path = confine(path)?;
        if self.files.contains_key(&path) {
            Ok(EntryKind::File)
        } else if self.is_dir(&path) {
            Ok(EntryKind::Dir)
        } else {
            Err(not_found(&path))
        }
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let dir = confine(path)?;
        if self.files.contains_key(&dir) || !self.is_dir(&dir) {
            return Err(not_found(&dir));
        }
        let names: BTreeSet<String> = self
            .files
            .keys()
            .filter_map(|p| p.strip_prefix(&dir).ok())
            .filter_map(|rest| rest.components().next())
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Ok(names.into_iter().collect())
    }

    fn find_files<'a>(&'a self, file_name: &'a str) -> Box<dyn Iterator<Item = PathBuf> + 'a> {
        Box::new(
            self.files
                .keys()
                .filter(move |p| p.file_name().is_some_and(|n| n == file_name))
                .cloned(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn bundle() -> MemorySource {
        MemorySource::new()
            .with_file("projects/api/template.yaml", "name: api")
            .with_file("projects/api/files/main.go.tmpl", "package main")
            .with_file("features/log/template.yaml", "name: log")
    }

    #[test]
    fn test_memory_kinds() {
        let src = bundle();
        assert_eq!(src.kind(Path::new("projects")).unwrap(), EntryKind::Dir);
        assert_eq!(
            src.kind(Path::new("./projects/api/template.yaml")).unwrap(),
            EntryKind::File
        );
        assert!(!src.exists(Path::new("projects/web")));
        assert_eq!(
            src.read(Path::new("projects/api/template.yaml")).unwrap(),
            b"name: api"
        );
    }

    #[test]
    fn test_memory_read_dir_lists_immediate_children() {
        let src = bundle();
        assert_eq!(
            src.read_dir(Path::new("projects/api")).unwrap(),
            vec!["files".to_string(), "template.yaml".to_string()]
        );
        assert_eq!(
            src.read_dir(Path::new("")).unwrap(),
            vec!["features".to_string(), "projects".to_string()]
        );
    }

    #[test]
    fn test_memory_find_files_sorted() {
        let found: Vec<_> = bundle().find_files("template.yaml").collect();
        assert_eq!(
            found,
            vec![
                PathBuf::from("features/log/template.yaml"),
                PathBuf::from("projects/api/template.yaml"),
            ]
        );
    }

    #[test]
    fn test_paths_cannot_leave_the_root() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("templates/features/evil")).unwrap();
        fs::write(temp.path().join("secret.txt"), "TOP SECRET").unwrap();
        fs::write(temp.path().join("templates/features/evil/a.txt"), "a").unwrap();

        let src = DirSource::new(temp.path().join("templates"));
        let err = src
            .read(Path::new("features/evil/../../../secret.txt"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(src.read(&temp.path().join("secret.txt")).is_err());
        assert!(!src.exists(Path::new("..")));
        assert_eq!(
            src.read(Path::new("features/evil/../evil/a.txt")).unwrap(),
            b"a"
        );

        let mem = bundle();
        assert_eq!(
            mem.read(Path::new("../projects/api/template.yaml"))
                .unwrap_err()
                .kind(),
            io::ErrorKind::InvalidInput
        );
    }

    #[test]
    fn test_dir_source() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("projects/api/files")).unwrap();
        fs::write(root.join("projects/api/template.yaml"), "name: api").unwrap();
        fs::write(root.join("projects/api/files/b.txt"), "b").unwrap();
        fs::write(root.join("projects/api/files/a.txt"), "a").unwrap();

        let src = DirSource::new(root);
        assert_eq!(src.kind(Path::new("projects/api")).unwrap(), EntryKind::Dir);
        assert_eq!(
            src.read_dir(Path::new("projects/api/files")).unwrap(),
            vec!["a.txt".to_string(), "b.txt".to_string()]
        );
        assert_eq!(src.read(Path::new("projects/api/files/a.txt")).unwrap(), b"a");
        let found: Vec<_> = src.find_files("template.yaml").collect();
        assert_eq!(found, vec![PathBuf::from("projects/api/template.yaml")]);
        assert_eq!(
            src.read(Path::new("missing.txt")).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }
}
