// ============================================================
// Layer 6 — Local Embedder
// ============================================================
// An EmbeddingProvider that runs without a remote embedding
// service: texts are split with the word-level tokenizer and
// each token id maps to a fixed pseudo-random vector.
//
//   "rates rise" ─▶ [2, 3] ─▶ [vec(2), vec(3)]   each [hidden]
//
// vec(id) is drawn from StdRng seeded with (seed, id), so the
// same tokenizer and seed always give the same embeddings.

use anyhow::Result;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::path::PathBuf;
use tokenizers::Tokenizer;

use crate::domain::traits::{EmbedderFactory, EmbeddingProvider};
use crate::infra::tokenizer_store::{TokenizerStore, UNK_TOKEN};

pub const DEFAULT_HIDDEN_SIZE: usize = 32;
pub const DEFAULT_EMBEDDING_SEED: u64 = 7;

pub struct LocalEmbedder {
    id:          String,
    tokenizer:   Tokenizer,
    hidden_size: usize,
    seed:        u64,
}

impl LocalEmbedder {
    pub fn new(id: impl Into<String>, tokenizer: Tokenizer, hidden_size: usize) -> Self {
        Self {
            id: id.into(),
            tokenizer,
            hidden_size,
            seed: DEFAULT_EMBEDDING_SEED,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn token_vector(&self, token_id: u32) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(self.seed ^ (u64::from(token_id) << 16));
        (0..self.hidden_size).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
    }

    fn unk_id(&self) -> u32 {
        self.tokenizer.token_to_id(UNK_TOKEN).unwrap_or(1)
    }
}

impl EmbeddingProvider for LocalEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<Vec<f32>>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let encoding = self
                .tokenizer
                .encode(text.as_str(), false)
                .map_err(|e| anyhow::anyhow!("Tokenization failed: {e}"))?;

            let mut ids = encoding.get_ids().to_vec();
            // An empty text still embeds to one position
            if ids.is_empty() {
                ids.push(self.unk_id());
            }
            out.push(ids.into_iter().map(|id| self.token_vector(id)).collect());
        }
        tracing::debug!("Embedded {} texts locally (hidden={})", texts.len(), self.hidden_size);
        Ok(out)
    }
}

// ─── Factory ──────────────────────────────────────────────────────────────────
/// Opens a LocalEmbedder over the tokenizer stored in `tokenizer_dir`.
/// Every embedding id shares that tokenizer; the id only names it.
pub struct LocalEmbedderFactory {
    tokenizer_dir: PathBuf,
    hidden_size:   usize,
}

impl LocalEmbedderFactory {
    pub fn new(tokenizer_dir: impl Into<PathBuf>, hidden_size: usize) -> Self {
        Self { tokenizer_dir: tokenizer_dir.into(), hidden_size }
    }
}

impl EmbedderFactory for LocalEmbedderFactory {
    fn open(&self, embedding_id: &str) -> Result<Box<dyn EmbeddingProvider>> {
        let tokenizer = TokenizerStore::new(&self.tokenizer_dir).load()?;
        tracing::info!("Opened local embedder '{}' (hidden={})", embedding_id, self.hidden_size);
        Ok(Box::new(LocalEmbedder::new(embedding_id, tokenizer, self.hidden_size)))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn embedder(hidden: usize) -> LocalEmbedder {
        let dir = tempdir().unwrap();
        let tok = TokenizerStore::new(dir.path())
            .build(&["alpha beta gamma".to_string()], 16)
            .unwrap();
        LocalEmbedder::new("local-test", tok, hidden)
    }

    #[test]
    fn test_one_sequence_per_text() {
        let e   = embedder(4);
        let out = e.embed(&["alpha beta".into(), "gamma".into(), "".into()]).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].len(), 2);
        assert_eq!(out[1].len(), 1);
        assert_eq!(out[2].len(), 1);
        assert!(out.iter().flatten().all(|v| v.len() == 4));
    }

    #[test]
    fn test_same_token_same_vector() {
        let e   = embedder(8);
        let out = e.embed(&["alpha".into(), "beta alpha".into()]).unwrap();
        assert_eq!(out[0][0], out[1][1]);
        assert_ne!(out[1][0], out[1][1]);
    }

    #[test]
    fn test_factory_opens_named_embedder() {
        let dir = tempdir().unwrap();
        TokenizerStore::new(dir.path()).build(&["alpha".to_string()], 8).unwrap();

        let e = LocalEmbedderFactory::new(dir.path(), 3).open("local-v1").unwrap();
        assert_eq!(e.id(), "local-v1");
        assert_eq!(e.embed(&["alpha".into()]).unwrap()[0][0].len(), 3);
    }

    #[test]
    fn test_seed_changes_vectors() {
        let a = embedder(8).embed(&["alpha".into()]).unwrap();
        let b = embedder(8).with_seed(99).embed(&["alpha".into()]).unwrap();
        assert_ne!(a, b);
    }
}
