pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod generator;
pub mod index;
pub mod ingest;
pub mod models;
pub mod prompt;
pub mod session;
pub mod traits;

#[cfg(test)]
mod test_support;

pub use chunking::{normalize_whitespace, split_text, ChunkingConfig};
pub use config::{GenerationSettings, Settings};
pub use embeddings::{CharacterNgramEmbedder, Embedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{GenerationError, IndexError, IngestError, SessionError};
pub use extractor::{extract_text, ExtractedText, LopdfExtractor, PageText, PdfExtractor};
pub use generator::{ChatCompletionsGenerator, RetryPolicy};
pub use index::{IndexManifest, IndexTrust, VectorIndex, DEFAULT_INDEX_DIR};
pub use ingest::{chunk_documents, collect_pdf_paths, discover_pdf_files, read_documents};
pub use models::{
    Answer, Chunk, ConversationLog, ConversationTurn, IngestionReport, RetrievedChunk, Role,
    SourceDocument,
};
pub use prompt::{join_context, PromptTemplate, DEFAULT_FALLBACK_PHRASE};
pub use session::{ChatSession, StartupState};
pub use traits::AnswerGenerator;
