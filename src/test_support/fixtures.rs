//! Filesystem fixtures with controlled modification times.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Set the modification time of a file or directory.
pub fn set_mtime(path: &Path, time: SystemTime) {
    let file = if path.is_dir() {
        File::open(path)
    } else {
        File::options().write(true).open(path)
    };
    file.unwrap().set_modified(time).unwrap();
}

/// Write `contents` to `path` and date it `secs_ago` seconds in the past.
pub fn write_with_age(path: &Path, contents: &str, secs_ago: u64) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
    set_mtime(path, SystemTime::now() - Duration::from_secs(secs_ago));
}

/// Bump a file's modification time to now, creating it if needed.
pub fn touch(path: &Path) {
    let mut file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    file.write_all(b"").unwrap();
    file.set_modified(SystemTime::now()).unwrap();
}

/// Age every file below `dir` by `secs` seconds.
pub fn age_tree(dir: &Path, secs: u64) {
    for entry in walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let modified = entry.metadata().unwrap().modified().unwrap();
        set_mtime(entry.path(), modified - Duration::from_secs(secs));
    }
}

/// Build a zip bundle at `path` from `(entry name, contents)` pairs.
/// Names ending in `/` become directory entries.
pub fn write_bundle(path: &Path, entries: &[(&str, &str)]) {
    let file = File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::<()>::default();
    for (name, contents) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, options).unwrap();
        } else {
            zip.start_file(*name, options).unwrap();
            zip.write_all(contents.as_bytes()).unwrap();
        }
    }
    zip.finish().unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_with_age() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a/b.h");
        write_with_age(&path, "x", 60);

        let modified = fs::metadata(&path).unwrap().modified().unwrap();
        assert!(modified < SystemTime::now() - Duration::from_secs(30));

        touch(&path);
        let touched = fs::metadata(&path).unwrap().modified().unwrap();
        assert!(touched > modified);
    }
}
