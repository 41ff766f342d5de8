use anyhow::bail;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use resume_rag_core::chunking::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use resume_rag_core::config::{
    DEFAULT_API_BASE_URL, DEFAULT_API_KEY_ENV, DEFAULT_MAX_RETRIES, DEFAULT_MODEL,
    DEFAULT_RESUME_PATH, DEFAULT_TOP_K,
};
use resume_rag_core::prompt::DEFAULT_CANDIDATE_NAME;
use resume_rag_core::{
    collect_pdf_paths, Answer, CharacterNgramEmbedder, ChatCompletionsGenerator, ChatSession,
    ChunkingConfig, GenerationSettings, IndexTrust, PromptTemplate, SessionError, Settings,
    StartupState, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_FALLBACK_PHRASE, DEFAULT_INDEX_DIR,
};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

type Session = ChatSession<CharacterNgramEmbedder, ChatCompletionsGenerator>;

const NOT_READY_MESSAGE: &str = "Please upload and process the resume first!";

#[derive(Parser)]
#[command(name = "resume-chat", version, about = "Chat with a resume PDF")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    options: Options,
}

#[derive(Args)]
struct Options {
    /// Directory holding the persisted vector index
    #[arg(long, global = true, env = "RESUME_CHAT_INDEX_DIR", default_value = DEFAULT_INDEX_DIR)]
    index_dir: PathBuf,

    /// Fixed resume processed by `chat` when no index exists yet
    #[arg(long, global = true, env = "RESUME_CHAT_RESUME", default_value = DEFAULT_RESUME_PATH)]
    resume: PathBuf,

    /// Maximum characters per chunk
    #[arg(long, global = true, env = "RESUME_CHAT_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, global = true, env = "RESUME_CHAT_CHUNK_OVERLAP", default_value_t = DEFAULT_CHUNK_OVERLAP)]
    chunk_overlap: usize,

    /// Chunks retrieved per question
    #[arg(long, global = true, env = "RESUME_CHAT_TOP_K", default_value_t = DEFAULT_TOP_K)]
    top_k: usize,

    /// Embedding vector length; must match the one the index was built with
    #[arg(long, global = true, env = "RESUME_CHAT_EMBEDDING_DIMENSIONS", default_value_t = DEFAULT_EMBEDDING_DIMENSIONS)]
    embedding_dimensions: usize,

    /// Hosted model identifier
    #[arg(long, global = true, env = "RESUME_CHAT_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// OpenAI-compatible API base URL
    #[arg(long, global = true, env = "RESUME_CHAT_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    api_base_url: String,

    /// API key for the hosted model
    #[arg(long, global = true, env = DEFAULT_API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    /// Name the model answers as
    #[arg(long, global = true, env = "RESUME_CHAT_CANDIDATE_NAME", default_value = DEFAULT_CANDIDATE_NAME)]
    candidate_name: String,

    /// Reply the model is told to give when the context has no answer
    #[arg(long, global = true, env = "RESUME_CHAT_FALLBACK", default_value = DEFAULT_FALLBACK_PHRASE)]
    fallback_phrase: String,

    /// Retries for failed generation requests
    #[arg(long, global = true, env = "RESUME_CHAT_MAX_RETRIES", default_value_t = DEFAULT_MAX_RETRIES)]
    max_retries: u32,

    /// Per-request timeout in seconds
    #[arg(long, global = true, env = "RESUME_CHAT_TIMEOUT_SECS", default_value_t = 60)]
    request_timeout_secs: u64,

    /// Load an index whose checksum cannot be verified
    #[arg(long, global = true, default_value_t = false)]
    allow_unverified_index: bool,
}

impl Options {
    fn settings(&self) -> Settings {
        Settings {
            index_dir: self.index_dir.clone(),
            resume_path: self.resume.clone(),
            chunking: ChunkingConfig {
                max_chars: self.chunk_size,
                overlap_chars: self.chunk_overlap,
            },
            top_k: self.top_k,
            embedding_dimensions: self.embedding_dimensions,
            index_trust: if self.allow_unverified_index {
                IndexTrust::AllowUnverified
            } else {
                IndexTrust::Verified
            },
            generation: GenerationSettings {
                model: self.model.clone(),
                api_base_url: self.api_base_url.clone(),
                api_key: self
                    .api_key
                    .as_deref()
                    .map(str::trim)
                    .filter(|key| !key.is_empty())
                    .map(str::to_string),
                api_key_env: DEFAULT_API_KEY_ENV.to_string(),
                max_retries: self.max_retries,
                request_timeout: Duration::from_secs(self.request_timeout_secs),
                ..GenerationSettings::default()
            },
            prompt: PromptTemplate {
                candidate_name: self.candidate_name.clone(),
                fallback_phrase: self.fallback_phrase.clone(),
            },
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Extract, chunk and index one or more resume PDFs, replacing any previous index.
    Ingest {
        /// PDF files, processed in the order given.
        #[arg(long = "pdf")]
        pdfs: Vec<PathBuf>,
        /// Folder searched recursively for PDFs.
        #[arg(long)]
        folder: Option<PathBuf>,
    },
    /// Ask a single question against the processed resume.
    Ask {
        /// Question text
        #[arg(long)]
        question: String,
        /// Print the retrieved chunks after the answer.
        #[arg(long, default_value_t = false)]
        show_context: bool,
    },
    /// Interactive chat that loads the index (or the fixed resume) on startup.
    Chat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = cli.options.settings();
    settings.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        index_dir = %settings.index_dir.display(),
        "resume-chat boot"
    );

    let embedder = CharacterNgramEmbedder {
        dimensions: settings.embedding_dimensions,
    };
    let generator = ChatCompletionsGenerator::new(&settings.generation)?;
    let mut session = ChatSession::new(settings, embedder, generator);

    match cli.command {
        Command::Ingest { pdfs, folder } => {
            let paths = collect_pdf_paths(&pdfs, folder.as_deref())?;
            info!(files = paths.len(), "processing resume");
            let report = session.ingest_paths(&paths)?;

            println!(
                "Resume processed! {} chunk(s) from {} page(s) in {} document(s) saved to {}",
                report.chunks,
                report.pages,
                report.documents,
                session.settings().index_dir.display()
            );
        }
        Command::Ask {
            question,
            show_context,
        } => match session.ask(&question).await {
            Ok(answer) => {
                println!("### Answer:");
                println!("{}", answer.text);
                if show_context {
                    print_context(&answer);
                }
            }
            Err(error) if error.is_not_ready() => bail!(NOT_READY_MESSAGE),
            Err(error) => return Err(error.into()),
        },
        Command::Chat => run_chat(&mut session).await?,
    }

    Ok(())
}

async fn run_chat(session: &mut Session) -> anyhow::Result<()> {
    let resume = session.settings().resume_path.clone();
    match session.start() {
        Ok(StartupState::PersistedIndex) => println!("Loaded the processed resume. Ask away."),
        Ok(StartupState::Ingested(report)) => println!(
            "Processed {} ({} chunk(s)). Ask away.",
            resume.display(),
            report.chunks
        ),
        Ok(StartupState::NotReady) => println!(
            "No processed resume yet. Put it at {} and type /ingest.",
            resume.display()
        ),
        Err(error) => {
            warn!(%error, "startup ingestion failed");
            println!("Could not process {}: {error}", resume.display());
        }
    }
    println!("Commands: /ingest, /history, /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/history" => print_history(session),
            "/ingest" => match session.ingest_resume() {
                Ok(report) => println!(
                    "Resume processed! {} chunk(s) from {} page(s).",
                    report.chunks, report.pages
                ),
                Err(error) => println!("error: {error}"),
            },
            question => match session.ask(question).await {
                Ok(answer) => println!("assistant> {}", answer.text),
                Err(error) => println!("{}", describe(&error)),
            },
        }
    }

    Ok(())
}

fn describe(error: &SessionError) -> String {
    if error.is_not_ready() {
        NOT_READY_MESSAGE.to_string()
    } else {
        format!("error: {error}")
    }
}

fn print_history(session: &Session) {
    let history = session.history();
    if history.is_empty() {
        println!("(no messages yet)");
        return;
    }
    for turn in history.turns() {
        println!(
            "[{}] {}: {}",
            turn.at.format("%H:%M:%S"),
            turn.role.as_str(),
            turn.content
        );
    }
}

fn print_context(answer: &Answer) {
    println!();
    println!("### Context:");
    for hit in &answer.context {
        println!(
            "[chunk {} score={:.4}]\n{}",
            hit.chunk.index, hit.score, hit.chunk.text
        );
    }
}
