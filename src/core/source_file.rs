//! Discovered source files and their derived outputs.

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

/// File suffixes treated as compilable sources.
pub const SOURCE_SUFFIXES: &[&str] = &[".cc", ".c", ".cpp", ".cxx", ".c++"];

/// A source file together with the object file and dependency record the
/// compiler produces for it.
///
/// All paths are fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceFile {
    source: PathBuf,
    object: PathBuf,
    dependency: PathBuf,
    stem: String,
}

impl SourceFile {
    /// Create a record for `source` whose outputs go to `obj_dir`.
    pub fn new(source: impl Into<PathBuf>, obj_dir: &Path) -> Self {
        let source = source.into();
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        SourceFile {
            object: obj_dir.join(format!("{stem}.o")),
            dependency: obj_dir.join(format!("{stem}.d")),
            source,
            stem,
        }
    }

    /// Whether a path carries one of the recognised source suffixes.
    pub fn is_source(path: &Path) -> bool {
        path.file_name()
            .and_then(OsStr::to_str)
            .is_some_and(|name| SOURCE_SUFFIXES.iter().any(|s| name.ends_with(s)))
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Directory containing the source file.
    pub fn source_dir(&self) -> &Path {
        self.source.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Bare file name of the source, as passed to the compiler.
    pub fn file_name(&self) -> &OsStr {
        self.source.file_name().unwrap_or_else(|| self.source.as_os_str())
    }

    pub fn object(&self) -> &Path {
        &self.object
    }

    pub fn dependency(&self) -> &Path {
        &self.dependency
    }

    /// File name before the last `.`.
    pub fn stem(&self) -> &str {
        &self.stem
    }
}

impl fmt::Display for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_paths() {
        let file = SourceFile::new("/proj/src/main/cpp/net/socket.cpp", Path::new("/proj/target/obj/linux_64"));
        assert_eq!(file.stem(), "socket");
        assert_eq!(file.object(), Path::new("/proj/target/obj/linux_64/socket.o"));
        assert_eq!(file.dependency(), Path::new("/proj/target/obj/linux_64/socket.d"));
        assert_eq!(file.source_dir(), Path::new("/proj/src/main/cpp/net"));
        assert_eq!(file.file_name(), "socket.cpp");
    }

    #[test]
    fn test_stem_uses_last_dot() {
        let file = SourceFile::new("/src/a.test.cpp", Path::new("/obj"));
        assert_eq!(file.stem(), "a.test");
        assert_eq!(file.object(), Path::new("/obj/a.test.o"));
    }

    #[test]
    fn test_is_source() {
        assert!(SourceFile::is_source(Path::new("a.cpp")));
        assert!(SourceFile::is_source(Path::new("a.c++")));
        assert!(SourceFile::is_source(Path::new("dir/a.cc")));
        assert!(!SourceFile::is_source(Path::new("a.h")));
        assert!(!SourceFile::is_source(Path::new("a.o")));
    }

    #[test]
    fn test_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SourceFile>();
    }
}
