use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

pub trait FsExt: AsRef<Path> {
    /// Resolves the path against the current working directory. Absolute paths are returned as is.
    fn relative_to_cwd(&self) -> Result<PathBuf> {
        let cwd_dir = std::env::current_dir()?;

        Ok(cwd_dir.join(self))
    }

    fn assert_file_exists(&self) -> Result<()> {
        if self.as_ref().is_file() {
            Ok(())
        } else {
            Err(anyhow!("{:?} is not a valid file", self.as_ref()))
        }
    }

    /// Creates the parent directory of the path if it does not exist yet.
    fn ensure_parent_dir(&self) -> Result<()> {
        match self.as_ref().parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                std::fs::create_dir_all(parent)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl FsExt for String {}

impl FsExt for &str {}

impl FsExt for PathBuf {}

impl FsExt for &Path {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_to_cwd_keeps_absolute_paths() {
        let path = PathBuf::from("/tmp/book.gz");
        assert_eq!(path.relative_to_cwd().unwrap(), path);
    }

    #[test]
    fn test_ensure_parent_dir_creates_missing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a").join("b").join("book.gz");

        file.ensure_parent_dir().unwrap();

        assert!(dir.path().join("a").join("b").is_dir());
        assert!(file.assert_file_exists().is_err());
    }
}
