use crate::embeddings::{cosine_similarity, Embedder};
use crate::error::IndexError;
use crate::models::{Chunk, RetrievedChunk};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_INDEX_DIR: &str = "faiss_index";
const INDEX_FILE: &str = "index.json";
const MANIFEST_FILE: &str = "manifest.json";
const FORMAT_VERSION: u32 = 1;

/// How much to trust a persisted index before deserializing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexTrust {
    /// The manifest must be present and its checksum must match the index file.
    #[default]
    Verified,
    /// Explicit opt-in: the checksum is not checked.
    AllowUnverified,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexManifest {
    pub format_version: u32,
    pub embedder: String,
    pub dimensions: usize,
    pub chunk_count: usize,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexedChunk {
    chunk: Chunk,
    embedding: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredIndex {
    embedder: String,
    dimensions: usize,
    entries: Vec<IndexedChunk>,
}

/// Chunks paired with their embeddings, queried by brute-force cosine similarity.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    embedder: String,
    dimensions: usize,
    entries: Vec<IndexedChunk>,
}

impl VectorIndex {
    pub fn build<E: Embedder + ?Sized>(chunks: Vec<Chunk>, embedder: &E) -> Result<Self, IndexError> {
        let dimensions = embedder.dimensions();
        let entries = chunks
            .into_iter()
            .map(|chunk| {
                let embedding = embedder.embed(&chunk.text);
                if embedding.len() != dimensions {
                    return Err(IndexError::DimensionMismatch {
                        expected: dimensions,
                        found: embedding.len(),
                    });
                }
                Ok(IndexedChunk { chunk, embedding })
            })
            .collect::<Result<Vec<_>, IndexError>>()?;

        Ok(Self {
            embedder: embedder.model_id(),
            dimensions,
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn embedder(&self) -> &str {
        &self.embedder
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|entry| &entry.chunk)
    }

    /// Returns up to `k` chunks by descending similarity; ties go to the earlier chunk.
    pub fn query<E: Embedder + ?Sized>(
        &self,
        embedder: &E,
        text: &str,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, IndexError> {
        self.ensure_compatible(embedder)?;
        let query_vector = embedder.embed(text);

        let mut scored: Vec<RetrievedChunk> = self
            .entries
            .iter()
            .map(|entry| RetrievedChunk {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(&query_vector, &entry.embedding),
            })
            .collect();

        scored.sort_by(|left, right| {
            right
                .score
                .total_cmp(&left.score)
                .then_with(|| left.chunk.index.cmp(&right.chunk.index))
        });
        scored.truncate(k);

        debug!(
            k,
            returned = scored.len(),
            top_score = scored.first().map(|hit| hit.score),
            "vector index query"
        );
        Ok(scored)
    }

    pub fn exists(dir: &Path) -> bool {
        dir.join(INDEX_FILE).is_file()
    }

    /// Writes the index into a staging directory next to `dir` and swaps it into place.
    pub fn save(&self, dir: &Path) -> Result<IndexManifest, IndexError> {
        let stored = StoredIndex {
            embedder: self.embedder.clone(),
            dimensions: self.dimensions,
            entries: self.entries.clone(),
        };
        let body = serde_json::to_vec(&stored)?;
        let manifest = IndexManifest {
            format_version: FORMAT_VERSION,
            embedder: self.embedder.clone(),
            dimensions: self.dimensions,
            chunk_count: self.entries.len(),
            checksum: sha256_hex(&body),
            created_at: Utc::now(),
        };
        let manifest_body = serde_json::to_vec_pretty(&manifest)?;

        let name = dir
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| {
                IndexError::Io(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("index path has no directory name: {}", dir.display()),
                ))
            })?;
        let parent = dir
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;

        let token = Uuid::new_v4().simple().to_string();
        let staging = parent.join(format!(".{name}.staging-{token}"));
        fs::create_dir(&staging)?;

        let retired = parent.join(format!(".{name}.retired-{token}"));
        let written = fs::write(staging.join(INDEX_FILE), &body)
            .and_then(|_| fs::write(staging.join(MANIFEST_FILE), &manifest_body))
            .and_then(|_| swap_into_place(&staging, dir, &retired));

        if let Err(error) = written {
            let _ = fs::remove_dir_all(&staging);
            return Err(error.into());
        }

        info!(
            path = %dir.display(),
            chunks = manifest.chunk_count,
            embedder = %manifest.embedder,
            "saved vector index"
        );
        Ok(manifest)
    }

    pub fn load<E: Embedder + ?Sized>(
        dir: &Path,
        embedder: &E,
        trust: IndexTrust,
    ) -> Result<Self, IndexError> {
        if !Self::exists(dir) {
            return Err(IndexError::NotReady(format!(
                "no persisted index at {}",
                dir.display()
            )));
        }

        let body = fs::read(dir.join(INDEX_FILE))?;
        let manifest_path = dir.join(MANIFEST_FILE);

        match trust {
            IndexTrust::Verified => {
                if !manifest_path.is_file() {
                    return Err(IndexError::Integrity(format!(
                        "{} is missing",
                        manifest_path.display()
                    )));
                }
                let manifest: IndexManifest = serde_json::from_slice(&fs::read(&manifest_path)?)?;
                let checksum = sha256_hex(&body);
                if manifest.checksum != checksum {
                    return Err(IndexError::Integrity(format!(
                        "checksum {checksum} does not match manifest {}",
                        manifest.checksum
                    )));
                }
            }
            IndexTrust::AllowUnverified => {
                warn!(path = %dir.display(), "loading vector index without integrity check");
            }
        }

        let stored: StoredIndex = serde_json::from_slice(&body)?;
        let index = Self {
            embedder: stored.embedder,
            dimensions: stored.dimensions,
            entries: stored.entries,
        };
        index.ensure_compatible(embedder)?;

        if let Some(entry) = index
            .entries
            .iter()
            .find(|entry| entry.embedding.len() != index.dimensions)
        {
            return Err(IndexError::DimensionMismatch {
                expected: index.dimensions,
                found: entry.embedding.len(),
            });
        }

        info!(path = %dir.display(), chunks = index.len(), "loaded vector index");
        Ok(index)
    }

    fn ensure_compatible<E: Embedder + ?Sized>(&self, embedder: &E) -> Result<(), IndexError> {
        let configured = embedder.model_id();
        if configured != self.embedder {
            return Err(IndexError::EmbedderMismatch {
                stored: self.embedder.clone(),
                configured,
            });
        }
        if embedder.dimensions() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                found: embedder.dimensions(),
            });
        }
        Ok(())
    }
}

fn swap_into_place(staging: &Path, target: &Path, retired: &Path) -> io::Result<()> {
    if !target.exists() {
        return fs::rename(staging, target);
    }

    fs::rename(target, retired)?;
    if let Err(error) = fs::rename(staging, target) {
        let _ = fs::rename(retired, target);
        return Err(error);
    }
    if let Err(error) = fs::remove_dir_all(retired) {
        warn!(%error, path = %retired.display(), "could not remove retired index");
    }
    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
