//! Directory enumeration.
//!
//! Lists the eligible images directly inside one directory. There is no
//! recursion: subdirectories are ignored, along with any file whose extension
//! is not accepted by [`classify`](crate::classify). Dotfiles with an accepted
//! extension are listed like any other image.
//!
//! ```text
//! images/pages/
//! ├── 001-cover.png        ✓ listed
//! ├── 001-cover.webp       ✗ output, not an input
//! ├── 002-spread.JPG       ✓ listed
//! ├── .DS_Store            ✗ not an image
//! ├── .draft.png           ✓ listed
//! ├── notes.txt            ✗ not an image
//! └── thumbs/              ✗ subdirectory
//!     └── 003.png          ✗ not visited
//! ```
//!
//! A directory that does not exist is reported as [`DirectoryListing::Missing`]
//! rather than an error: it is a configuration problem, not a per-file one.
//! A directory that exists but cannot be read is an error.

use crate::classify;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("cannot access {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("cannot list {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Result of listing one configured directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryListing {
    Missing,
    /// Eligible files, sorted by file name.
    Found(Vec<PathBuf>),
}

impl DirectoryListing {
    pub fn files(&self) -> &[PathBuf] {
        match self {
            DirectoryListing::Missing => &[],
            DirectoryListing::Found(files) => files,
        }
    }
}

/// List eligible images directly inside `dir`.
pub fn list_images(dir: &Path) -> Result<DirectoryListing, ScanError> {
    let meta = match std::fs::metadata(dir) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(DirectoryListing::Missing),
        Err(source) => {
            return Err(ScanError::Stat {
                path: dir.to_path_buf(),
                source,
            });
        }
    };
    if !meta.is_dir() {
        return Err(ScanError::NotADirectory(dir.to_path_buf()));
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| ScanError::Read {
            path: dir.to_path_buf(),
            source,
        })?;
        if is_candidate(&entry) {
            images.push(entry.into_path());
        }
    }
    Ok(DirectoryListing::Found(images))
}

fn is_candidate(entry: &DirEntry) -> bool {
    let is_file = entry.file_type().is_file()
        || (entry.path_is_symlink() && entry.path().is_file());
    is_file && classify::source_format(entry.path()).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn names(listing: &DirectoryListing) -> Vec<String> {
        listing
            .files()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn lists_only_accepted_extensions() {
        let tmp = TempDir::new().unwrap();
        for name in ["b.jpg", "a.png", "c.jpeg", "d.webp", "e.gif", "notes.txt"] {
            fs::write(tmp.path().join(name), b"x").unwrap();
        }

        let listing = list_images(tmp.path()).unwrap();
        assert_eq!(names(&listing), vec!["a.png", "b.jpg", "c.jpeg"]);
    }

    #[test]
    fn extension_match_ignores_case() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("UPPER.PNG"), b"x").unwrap();
        fs::write(tmp.path().join("Mixed.JpG"), b"x").unwrap();

        let listing = list_images(tmp.path()).unwrap();
        assert_eq!(listing.files().len(), 2);
    }

    #[test]
    fn does_not_recurse() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("top.png"), b"x").unwrap();
        fs::create_dir(tmp.path().join("nested")).unwrap();
        fs::write(tmp.path().join("nested/deep.png"), b"x").unwrap();

        let listing = list_images(tmp.path()).unwrap();
        assert_eq!(names(&listing), vec!["top.png"]);
    }

    #[test]
    fn skips_directories_named_like_images() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("folder.png")).unwrap();
        fs::write(tmp.path().join("real.png"), b"x").unwrap();

        let listing = list_images(tmp.path()).unwrap();
        assert_eq!(names(&listing), vec!["real.png"]);
    }

    #[test]
    fn dotfile_images_are_listed() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".cover.png"), b"x").unwrap();
        fs::write(tmp.path().join(".DS_Store"), b"x").unwrap();
        fs::write(tmp.path().join("page.jpg"), b"x").unwrap();

        let listing = list_images(tmp.path()).unwrap();
        assert_eq!(names(&listing), vec![".cover.png", "page.jpg"]);
    }

    #[test]
    fn missing_directory_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        let listing = list_images(&tmp.path().join("does-not-exist")).unwrap();
        assert_eq!(listing, DirectoryListing::Missing);
        assert!(listing.files().is_empty());
    }

    #[test]
    fn empty_directory_lists_nothing() {
        let tmp = TempDir::new().unwrap();
        let listing = list_images(tmp.path()).unwrap();
        assert_eq!(listing, DirectoryListing::Found(vec![]));
    }

    #[test]
    fn file_path_is_not_a_directory() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.png");
        fs::write(&file, b"x").unwrap();

        assert!(matches!(
            list_images(&file),
            Err(ScanError::NotADirectory(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_image_is_listed() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("target.png");
        fs::write(&target, b"x").unwrap();
        let dir = tmp.path().join("dir");
        fs::create_dir(&dir).unwrap();
        std::os::unix::fs::symlink(&target, dir.join("link.png")).unwrap();

        let listing = list_images(&dir).unwrap();
        assert_eq!(names(&listing), vec!["link.png"]);
    }
}
