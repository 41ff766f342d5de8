use crate::chunking::ChunkingConfig;
use crate::embeddings::DEFAULT_EMBEDDING_DIMENSIONS;
use crate::error::{GenerationError, IngestError, SessionError};
use crate::index::{IndexTrust, DEFAULT_INDEX_DIR};
use crate::prompt::PromptTemplate;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_RESUME_PATH: &str = "resume.pdf";
pub const DEFAULT_TOP_K: usize = 4;
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_API_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_API_KEY_ENV: &str = "GROQ_API_KEY";
pub const DEFAULT_MAX_RETRIES: u32 = 2;

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub api_base_url: String,
    /// Resolved secret. `None` makes every generation call fail without a request.
    pub api_key: Option<String>,
    /// Name reported when the secret is missing.
    pub api_key_env: String,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub request_timeout: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: Duration::from_millis(500),
            request_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub index_dir: PathBuf,
    pub resume_path: PathBuf,
    pub chunking: ChunkingConfig,
    pub top_k: usize,
    pub embedding_dimensions: usize,
    pub index_trust: IndexTrust,
    pub generation: GenerationSettings,
    pub prompt: PromptTemplate,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from(DEFAULT_INDEX_DIR),
            resume_path: PathBuf::from(DEFAULT_RESUME_PATH),
            chunking: ChunkingConfig::default(),
            top_k: DEFAULT_TOP_K,
            embedding_dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            index_trust: IndexTrust::Verified,
            generation: GenerationSettings::default(),
            prompt: PromptTemplate::default(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), SessionError> {
        self.chunking.validate()?;
        if self.top_k == 0 {
            return Err(IngestError::InvalidArgument("top_k must be at least 1".to_string()).into());
        }
        if self.embedding_dimensions == 0 {
            return Err(IngestError::InvalidArgument(
                "embedding dimensions must be at least 1".to_string(),
            )
            .into());
        }
        Url::parse(&self.generation.api_base_url).map_err(GenerationError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_pipeline() {
        let settings = Settings::default();
        assert_eq!(settings.index_dir, PathBuf::from("faiss_index"));
        assert_eq!(settings.resume_path, PathBuf::from("resume.pdf"));
        assert_eq!(settings.chunking.max_chars, 1_000);
        assert_eq!(settings.chunking.overlap_chars, 200);
        assert_eq!(settings.generation.model, "llama-3.3-70b-versatile");
        assert_eq!(settings.generation.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(settings.index_trust, IndexTrust::Verified);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let mut settings = Settings::default();
        settings.chunking.overlap_chars = settings.chunking.max_chars;
        assert!(matches!(
            settings.validate(),
            Err(SessionError::Ingest(IngestError::InvalidChunkConfig(_)))
        ));

        let mut settings = Settings::default();
        settings.top_k = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.generation.api_base_url = "not a url".to_string();
        assert!(matches!(
            settings.validate(),
            Err(SessionError::Generation(GenerationError::InvalidEndpoint(_)))
        ));
    }
}
