// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Builds and loads the word-level tokenizer that backs the
// local embedder (see local_embedder.rs).
//
// The tokenizer is written as HuggingFace tokenizer JSON and
// loaded back with Tokenizer::from_file, so the same file can
// be shipped next to a base directory and reused by every run.
//
//   corpus texts ─▶ word counts ─▶ top-N words ─▶ tokenizer.json
//
// Ids: [PAD]=0, [UNK]=1, words from 2 upwards in descending
// frequency (ties broken alphabetically).

use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    fs,
    path::PathBuf,
};
use tokenizers::{
    pre_tokenizers::whitespace::Whitespace, OffsetReferential, OffsetType, PreTokenizedString,
    PreTokenizer, Tokenizer,
};

use crate::domain::error::TrainError;

pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const PAD_TOKEN: &str = "[PAD]";
pub const UNK_TOKEN: &str = "[UNK]";

const RESERVED_IDS: usize = 2;

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.path();
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {e}", path.display()))
    }

    /// Build a word-level tokenizer from `texts`, overwriting any
    /// stored one. `vocab_size` includes the two special tokens.
    pub fn build(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        if vocab_size <= RESERVED_IDS {
            return Err(TrainError::Configuration(format!(
                "tokenizer vocab size must exceed {RESERVED_IDS}, got {vocab_size}"
            ))
            .into());
        }
        fs::create_dir_all(&self.dir).map_err(|e| TrainError::io(&self.dir, e))?;

        // ── Step 1: Count words ───────────────────────────────────────────────
        // Same normalizer and pre-tokenizer as the written tokenizer.
        let mut freq: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for word in split_words(text)? {
                *freq.entry(word).or_insert(0) += 1;
            }
        }

        let mut words: Vec<(String, usize)> = freq.into_iter().collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words.truncate(vocab_size - RESERVED_IDS);

        // ── Step 2: Assign ids ────────────────────────────────────────────────
        let mut vocab = serde_json::Map::new();
        vocab.insert(PAD_TOKEN.to_string(), 0.into());
        vocab.insert(UNK_TOKEN.to_string(), 1.into());
        for (id, (word, _)) in words.iter().enumerate() {
            vocab.insert(word.clone(), (id + RESERVED_IDS).into());
        }

        // ── Step 3: Write tokenizer JSON ──────────────────────────────────────
        let json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [
                special_token(0, PAD_TOKEN),
                special_token(1, UNK_TOKEN),
            ],
            "normalizer": { "type": "Lowercase" },
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": UNK_TOKEN
            }
        });

        let path = self.path();
        fs::write(&path, serde_json::to_string_pretty(&json)?)
            .with_context(|| format!("Cannot write tokenizer to '{}'", path.display()))?;

        tracing::info!(
            "Tokenizer built with {} words, saved to '{}'",
            words.len(),
            path.display()
        );
        self.load()
    }
}

/// Lowercase `text` and split it the way the `Whitespace`
/// pre-tokenizer does: runs of word characters, runs of punctuation.
fn split_words(text: &str) -> Result<Vec<String>> {
    let mut pretok = PreTokenizedString::from(text.to_lowercase());
    Whitespace::default()
        .pre_tokenize(&mut pretok)
        .map_err(|e| anyhow::anyhow!("Cannot pre-tokenize text: {e}"))?;
    Ok(pretok
        .get_splits(OffsetReferential::Original, OffsetType::Byte)
        .into_iter()
        .map(|(word, _, _)| word.to_string())
        .collect())
}

fn special_token(id: u32, content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "content": content,
        "single_word": false,
        "lstrip": false,
        "rstrip": false,
        "normalized": false,
        "special": true
    })
}
