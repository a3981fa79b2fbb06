//! Input discovery and PDF sanity checks.
//!
//! pdfium crashes or returns opaque errors on non-PDF input, so every file is
//! checked for the `%PDF` magic bytes before it is opened.

use crate::error::{DocumentError, RenameError};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// List `*.pdf` files (case-insensitive extension) directly inside `dir`,
/// sorted by file name.
pub fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>, RenameError> {
    if !dir.is_dir() {
        return Err(RenameError::InputDirNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| RenameError::InputDirUnreadable {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut pdfs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| RenameError::InputDirUnreadable {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_file() && has_pdf_extension(&path) {
            pdfs.push(path);
        }
    }
    pdfs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!("Found {} PDFs in {}", pdfs.len(), dir.display());
    Ok(pdfs)
}

pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Verify the file starts with `%PDF`.
pub fn check_pdf(path: &Path) -> Result<(), DocumentError> {
    let mut f = std::fs::File::open(path).map_err(|e| DocumentError::ReadFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    let mut magic = [0u8; 4];
    let n = read_up_to(&mut f, &mut magic).map_err(|e| DocumentError::ReadFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    if n < magic.len() || &magic != PDF_MAGIC {
        return Err(DocumentError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

fn read_up_to(f: &mut std::fs::File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match f.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn extension_is_case_insensitive() {
        assert!(has_pdf_extension(Path::new("a.pdf")));
        assert!(has_pdf_extension(Path::new("a.PDF")));
        assert!(!has_pdf_extension(Path::new("a.pdf.txt")));
        assert!(!has_pdf_extension(Path::new("pdf")));
    }

    #[test]
    fn list_pdfs_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.pdf"), b"%PDF-1.4").unwrap();
        fs::write(dir.path().join("a.PDF"), b"%PDF-1.4").unwrap();
        fs::write(dir.path().join("notes.txt"), b"hi").unwrap();
        fs::create_dir(dir.path().join("sub.pdf")).unwrap();

        let names: Vec<_> = list_pdfs(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["a.PDF", "b.pdf"]);
    }

    #[test]
    fn list_pdfs_missing_dir() {
        let err = list_pdfs(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, RenameError::InputDirNotFound { .. }));
    }

    #[test]
    fn check_pdf_magic() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.pdf");
        let bad = dir.path().join("bad.pdf");
        let tiny = dir.path().join("tiny.pdf");
        fs::write(&good, b"%PDF-1.7\n...").unwrap();
        fs::write(&bad, b"PK\x03\x04zip").unwrap();
        fs::write(&tiny, b"%P").unwrap();

        assert!(check_pdf(&good).is_ok());
        match check_pdf(&bad) {
            Err(DocumentError::NotAPdf { magic, .. }) => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(check_pdf(&tiny), Err(DocumentError::NotAPdf { .. })));
        assert!(matches!(
            check_pdf(&dir.path().join("missing.pdf")),
            Err(DocumentError::ReadFailed { .. })
        ));
    }
}
