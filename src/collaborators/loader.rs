//! Resource-file loading (scripts embedded into container bodies)

use std::path::{Path, PathBuf};

use crate::error::CollaboratorError;

/// Returns the text of a bundled resource
pub trait ResourceLoader {
    fn load(&self, path: &str) -> Result<String, CollaboratorError>;
}

/// Loads resources from files under a root directory
#[derive(Debug, Clone)]
pub struct FsResourceLoader {
    root: PathBuf,
}

impl FsResourceLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ResourceLoader for FsResourceLoader {
    fn load(&self, path: &str) -> Result<String, CollaboratorError> {
        let full = self.root.join(path);
        let text = std::fs::read_to_string(&full).map_err(|source| CollaboratorError::ResourceLoad {
            path: full.display().to_string(),
            source,
        })?;
        tracing::debug!(path = %full.display(), bytes = text.len(), "resource loaded");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loads_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.sh"), "echo hello\n").unwrap();

        let loader = FsResourceLoader::new(dir.path());
        assert_eq!(loader.load("hello.sh").unwrap(), "echo hello\n");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FsResourceLoader::new(dir.path());

        let err = loader.load("nope.sh").unwrap_err();
        assert!(matches!(err, CollaboratorError::ResourceLoad { .. }));
        assert!(err.to_string().contains("nope.sh"));
    }
}
