use crate::error::IngestError;
use crate::models::SourceDocument;
use lopdf::Document;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

/// Page-ordered text of one or more documents, concatenated without separators.
#[derive(Debug, Clone, Default)]
pub struct ExtractedText {
    pub text: String,
    pub pages: usize,
}

pub trait PdfExtractor {
    fn extract_pages(&self, document: &SourceDocument) -> Result<Vec<PageText>, IngestError>;
}

#[derive(Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, document: &SourceDocument) -> Result<Vec<PageText>, IngestError> {
        let parsed = Document::load_mem(&document.bytes)
            .map_err(|error| IngestError::PdfParse(format!("{}: {error}", document.name)))?;

        let mut pages = Vec::new();
        // get_pages is a BTreeMap keyed by page number, so iteration is in page order
        for (page_no, _page_id) in parsed.get_pages() {
            let text = parsed
                .extract_text(&[page_no])
                .map_err(|error| IngestError::PdfParse(format!("{}: {error}", document.name)))?;

            pages.push(PageText {
                number: page_no,
                text,
            });
        }

        Ok(pages)
    }
}

/// Concatenates the text of every page of every document, documents in the given order.
pub fn extract_text<E: PdfExtractor + ?Sized>(
    extractor: &E,
    documents: &[SourceDocument],
) -> Result<ExtractedText, IngestError> {
    if documents.is_empty() {
        return Err(IngestError::InvalidArgument(
            "no documents to extract".to_string(),
        ));
    }

    let mut extracted = ExtractedText::default();
    for document in documents {
        let pages = extractor.extract_pages(document)?;
        debug!(document = %document.name, pages = pages.len(), "extracted pdf pages");

        if pages.iter().all(|page| page.text.trim().is_empty()) {
            return Err(IngestError::NoText(document.name.clone()));
        }

        extracted.pages += pages.len();
        for page in pages {
            extracted.text.push_str(&page.text);
        }
    }

    Ok(extracted)
}
