use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("pdf had no readable page text: {0}")]
    NoText(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("index error: {0}")]
    Index(#[from] IndexError),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index not ready: {0}")]
    NotReady(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("index integrity check failed: {0}")]
    Integrity(String),

    #[error("index was built with embedder {stored}, configured embedder is {configured}")]
    EmbedderMismatch { stored: String, configured: String },

    #[error("embedding dimension {found} does not match {expected}")]
    DimensionMismatch { expected: usize, found: usize },
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("missing credential: set {0}")]
    MissingCredential(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("invalid response from model endpoint ({status}): {details}")]
    BackendResponse { status: u16, details: String },

    #[error("model returned an empty response")]
    EmptyResponse,
}

impl GenerationError {
    /// Server-side and transport failures are worth another attempt; client errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(error) => error.is_timeout() || error.is_connect() || error.is_request(),
            Self::BackendResponse { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("question is empty")]
    EmptyQuestion,
}

impl SessionError {
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::Index(IndexError::NotReady(_)))
    }
}
