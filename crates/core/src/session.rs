use crate::config::Settings;
use crate::embeddings::Embedder;
use crate::error::{IndexError, SessionError};
use crate::extractor::LopdfExtractor;
use crate::index::VectorIndex;
use crate::ingest::{chunk_documents, read_documents};
use crate::models::{Answer, ConversationLog, IngestionReport, RetrievedChunk, Role, SourceDocument};
use crate::traits::AnswerGenerator;
use std::path::PathBuf;
use tracing::{info, instrument};

/// What `start` found when the session came up.
#[derive(Debug, Clone)]
pub enum StartupState {
    /// An index is on disk; it is loaded on the first question.
    PersistedIndex,
    /// No index was on disk, so the fixed resume document was processed.
    Ingested(IngestionReport),
    /// Neither an index nor the fixed document exists.
    NotReady,
}

/// Everything one chat session needs: settings, embedder, generator, the index cache
/// and the conversation log. Sessions share nothing but the index directory on disk.
pub struct ChatSession<E, G> {
    settings: Settings,
    embedder: E,
    generator: G,
    extractor: LopdfExtractor,
    index: Option<VectorIndex>,
    history: ConversationLog,
}

impl<E, G> ChatSession<E, G>
where
    E: Embedder + Send + Sync,
    G: AnswerGenerator + Send + Sync,
{
    pub fn new(settings: Settings, embedder: E, generator: G) -> Self {
        Self {
            settings,
            embedder,
            generator,
            extractor: LopdfExtractor,
            index: None,
            history: ConversationLog::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn history(&self) -> &ConversationLog {
        &self.history
    }

    /// Ready when an index is cached in memory or persisted at the configured location.
    pub fn is_ready(&self) -> bool {
        self.index.is_some() || VectorIndex::exists(&self.settings.index_dir)
    }

    /// Auto-load flow: prefer the persisted index, otherwise process the fixed document.
    pub fn start(&mut self) -> Result<StartupState, SessionError> {
        if VectorIndex::exists(&self.settings.index_dir) {
            info!(path = %self.settings.index_dir.display(), "found persisted index");
            return Ok(StartupState::PersistedIndex);
        }

        if self.settings.resume_path.is_file() {
            let report = self.ingest_resume()?;
            return Ok(StartupState::Ingested(report));
        }

        Ok(StartupState::NotReady)
    }

    pub fn ingest_resume(&mut self) -> Result<IngestionReport, SessionError> {
        let path = self.settings.resume_path.clone();
        self.ingest_paths(&[path])
    }

    pub fn ingest_paths(&mut self, paths: &[PathBuf]) -> Result<IngestionReport, SessionError> {
        let documents = read_documents(paths)?;
        self.ingest_documents(&documents)
    }

    /// Extract, split, embed, then persist. The previous index stays in place until
    /// the new one has been written completely.
    #[instrument(skip(self, documents), fields(documents = documents.len()))]
    pub fn ingest_documents(
        &mut self,
        documents: &[SourceDocument],
    ) -> Result<IngestionReport, SessionError> {
        let (chunks, report) =
            chunk_documents(&self.extractor, documents, self.settings.chunking)?;
        let index = VectorIndex::build(chunks, &self.embedder)?;
        index.save(&self.settings.index_dir)?;
        self.index = Some(index);

        info!(chunks = report.chunks, "resume processed, index ready");
        Ok(report)
    }

    fn ensure_index(&mut self) -> Result<(), SessionError> {
        if self.index.is_none() {
            let loaded = VectorIndex::load(
                &self.settings.index_dir,
                &self.embedder,
                self.settings.index_trust,
            )?;
            self.index = Some(loaded);
        }
        Ok(())
    }

    pub fn retrieve(&mut self, question: &str) -> Result<Vec<RetrievedChunk>, SessionError> {
        self.ensure_index()?;
        let index = self
            .index
            .as_ref()
            .ok_or_else(|| IndexError::NotReady("index cache is empty".to_string()))?;
        Ok(index.query(&self.embedder, question, self.settings.top_k)?)
    }

    /// Retrieves context, asks the model, and records both turns in the log.
    #[instrument(skip(self))]
    pub async fn ask(&mut self, question: &str) -> Result<Answer, SessionError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(SessionError::EmptyQuestion);
        }

        let context = self.retrieve(question)?;
        let prompt = self.settings.prompt.render(&context, question);
        let text = self.generator.generate(&prompt).await?;
        let is_fallback = self.settings.prompt.is_fallback(&text);

        self.history.push(Role::User, question);
        self.history.push(Role::Assistant, text.clone());
        info!(
            retrieved = context.len(),
            is_fallback,
            turns = self.history.len(),
            "answered question"
        );

        Ok(Answer {
            question: question.to_string(),
            text,
            context,
            is_fallback,
        })
    }
}
