//! Writing finished documents to disk

use pdfsuite_core::services::Exporter;
use pdfsuite_core::PdfSuiteError;
use std::fs;
use std::path::{Path, PathBuf};

/// Exports artifacts as files under one directory.
pub struct FileExporter {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl FileExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl Exporter for FileExporter {
    fn export(&mut self, name: &str, bytes: &[u8], mime_type: &str) -> Result<(), PdfSuiteError> {
        // Names come from the tools; keep them inside the target directory
        let file_name = Path::new(name)
            .file_name()
            .ok_or_else(|| PdfSuiteError::OperationError(format!("Invalid file name: {}", name)))?;
        fs::create_dir_all(&self.dir).map_err(io_error)?;
        let path = self.dir.join(file_name);
        fs::write(&path, bytes).map_err(io_error)?;
        tracing::info!(path = %path.display(), mime_type, size = bytes.len(), "Wrote file");
        self.written.push(path);
        Ok(())
    }
}

fn io_error(e: std::io::Error) -> PdfSuiteError {
    PdfSuiteError::OperationError(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let mut exporter = FileExporter::new(tmp.path().join("out"));
        exporter
            .export("page-1.pdf", b"%PDF-1.7", "application/pdf")
            .unwrap();
        let written = exporter.written().to_vec();
        assert_eq!(written, vec![tmp.path().join("out").join("page-1.pdf")]);
        assert_eq!(fs::read(&written[0]).unwrap(), b"%PDF-1.7");
    }

    #[test]
    fn test_export_strips_directories_from_name() {
        let tmp = tempfile::tempdir().unwrap();
        let mut exporter = FileExporter::new(tmp.path());
        exporter
            .export("../../escape.pdf", b"x", "application/pdf")
            .unwrap();
        assert_eq!(exporter.written()[0], tmp.path().join("escape.pdf"));
    }

    #[test]
    fn test_export_rejects_empty_name() {
        let tmp = tempfile::tempdir().unwrap();
        let mut exporter = FileExporter::new(tmp.path());
        assert!(exporter.export("..", b"x", "application/pdf").is_err());
    }
}
