use crate::core::Storage;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

/// Filesystem storage. Reads resolve against the working directory,
/// writes against `base_path`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn resolve_output(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let data = tokio::fs::read(Path::new(path)).await?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.resolve_output(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(full_path, data).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_nested_directories() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());

        storage.write_file("reports/chart.svg", b"<svg/>").await.unwrap();

        let written = temp_dir.path().join("reports/chart.svg");
        let back = storage.read_file(written.to_str().unwrap()).await.unwrap();
        assert_eq!(back, b"<svg/>");
    }

    #[tokio::test]
    async fn test_read_missing_file_is_io_error() {
        let storage = LocalStorage::new("./output");
        let err = storage.read_file("/definitely/not/here.txt").await.unwrap_err();
        assert!(matches!(err, crate::utils::error::AnalyzerError::IoError(_)));
    }
}
