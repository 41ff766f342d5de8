use crate::chunking::{split_text, ChunkingConfig};
use crate::error::IngestError;
use crate::extractor::{extract_text, PdfExtractor};
use crate::models::{Chunk, IngestionReport, SourceDocument};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for item in WalkDir::new(folder) {
        let entry = match item {
            Ok(entry) => entry,
            Err(error) => {
                warn!(%error, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

/// Explicit paths first, in the order given, then any PDFs found under `folder`.
pub fn collect_pdf_paths(paths: &[PathBuf], folder: Option<&Path>) -> Result<Vec<PathBuf>, IngestError> {
    let mut collected = paths.to_vec();
    if let Some(folder) = folder {
        if !folder.is_dir() {
            return Err(IngestError::InvalidArgument(format!(
                "not a directory: {}",
                folder.display()
            )));
        }
        collected.extend(discover_pdf_files(folder));
    }

    if collected.is_empty() {
        return Err(IngestError::InvalidArgument(
            "no pdf files to process".to_string(),
        ));
    }
    Ok(collected)
}

pub fn read_documents(paths: &[PathBuf]) -> Result<Vec<SourceDocument>, IngestError> {
    paths
        .iter()
        .map(|path| SourceDocument::from_path(path))
        .collect()
}

/// Extracts and splits every document. Nothing is embedded or persisted here.
pub fn chunk_documents<E: PdfExtractor + ?Sized>(
    extractor: &E,
    documents: &[SourceDocument],
    config: ChunkingConfig,
) -> Result<(Vec<Chunk>, IngestionReport), IngestError> {
    config.validate()?;
    let extracted = extract_text(extractor, documents)?;
    let chunks = split_text(&extracted.text, config)?;

    let report = IngestionReport {
        documents: documents.len(),
        pages: extracted.pages,
        characters: extracted.text.chars().count(),
        chunks: chunks.len(),
    };
    info!(
        documents = report.documents,
        pages = report.pages,
        characters = report.characters,
        chunks = report.chunks,
        "split documents into chunks"
    );

    Ok((chunks, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::LopdfExtractor;
    use crate::test_support::pdf_with_pages;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn discover_pdf_files_is_recursive() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        File::create(base.join("a.pdf")).and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(nested.join("b.PDF"))
            .and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(base.join("notes.txt")).and_then(|mut file| file.write_all(b"skip"))?;

        let files = discover_pdf_files(base);
        assert_eq!(files.len(), 2);
        Ok(())
    }

    #[test]
    fn unreadable_entries_are_skipped() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        assert!(discover_pdf_files(&dir.path().join("missing")).is_empty());

        fs::write(dir.path().join("resume.pdf"), b"%PDF-1.4")?;
        assert_eq!(discover_pdf_files(dir.path()).len(), 1);
        Ok(())
    }

    #[test]
    fn explicit_paths_come_before_folder_matches() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("cover.pdf"), b"%PDF-1.4")?;
        let explicit = PathBuf::from("resume.pdf");

        let paths = collect_pdf_paths(&[explicit.clone()], Some(dir.path()))?;
        assert_eq!(paths[0], explicit);
        assert_eq!(paths.len(), 2);
        Ok(())
    }

    #[test]
    fn nothing_to_collect_is_an_error() {
        assert!(matches!(
            collect_pdf_paths(&[], None),
            Err(IngestError::InvalidArgument(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = read_documents(&[PathBuf::from("/no/such/resume.pdf")]);
        assert!(matches!(result, Err(IngestError::Io(_))));
    }

    #[test]
    fn chunk_documents_reports_counts() -> Result<(), Box<dyn std::error::Error>> {
        let bytes = pdf_with_pages(&["I led ETL pipelines using Python and SQL."])?;
        let documents = vec![SourceDocument::new("resume.pdf", bytes)];

        let (chunks, report) =
            chunk_documents(&LopdfExtractor, &documents, ChunkingConfig::default())?;
        assert_eq!(report.documents, 1);
        assert_eq!(report.pages, 1);
        assert_eq!(report.chunks, chunks.len());
        assert!(chunks[0].text.contains("Python and SQL"));
        Ok(())
    }
}
