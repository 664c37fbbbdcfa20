// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Three subcommands:
//   train            — run one training task with local collaborators
//   instances        — list a model's instances and release flags
//   build-tokenizer  — build the local embedder's tokenizer from
//                      a samples file
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::infra::local_embedder::DEFAULT_HIDDEN_SIZE;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a new instance of a model
    Train(TrainArgs),

    /// List the instances of a model
    Instances(InstancesArgs),

    /// Build the word-level tokenizer used by the local embedder
    BuildTokenizer(BuildTokenizerArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory holding one subdirectory per model
    #[arg(long)]
    pub base_dir: PathBuf,

    /// Model name (subdirectory of --base-dir)
    #[arg(long)]
    pub model: String,

    /// JSON-lines file of labeled samples
    #[arg(long, default_value = "samples.jsonl")]
    pub samples: PathBuf,

    /// Directory with tokenizer.json for the local embedder
    #[arg(long, default_value = "tokenizer")]
    pub tokenizer_dir: PathBuf,

    /// Width of the local embedder's vectors
    #[arg(long, default_value_t = DEFAULT_HIDDEN_SIZE)]
    pub hidden_size: usize,

    /// Embedding-service id; taken from the released instance if omitted
    #[arg(long)]
    pub bert: Option<String>,

    /// Label file, one label per line; taken from the released
    /// instance if omitted
    #[arg(long)]
    pub vocab: Option<PathBuf>,

    #[command(flatten)]
    pub hyper: HyperArgs,
}

/// Training hyper-parameters, one flag per TrainConfig field.
#[derive(Args, Debug, Clone)]
pub struct HyperArgs {
    /// Peak learning rate reached after warm-up
    #[arg(long, default_value_t = 0.02)]
    pub learning_rate: f64,

    #[arg(long, default_value_t = 100)]
    pub num_warmup_steps: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Shared attention projection width, 0 to disable
    #[arg(long, default_value_t = 0)]
    pub shared_size: usize,

    #[arg(long, default_value_t = 256)]
    pub batch_size: usize,

    /// Optimizer steps to run, independent of epochs
    #[arg(long, default_value_t = 1000)]
    pub num_train_steps: usize,

    /// Fraction of samples used for training; the rest is the holdout
    #[arg(long, default_value_t = 0.9)]
    pub train_ratio: f64,

    /// Maximum number of samples to read
    #[arg(long, default_value_t = 2000)]
    pub limit: usize,

    /// Embedding positions kept per text (longer texts are truncated)
    #[arg(long, default_value_t = 128)]
    pub max_seq_len: usize,
}

impl From<HyperArgs> for TrainConfig {
    fn from(a: HyperArgs) -> Self {
        TrainConfig {
            learning_rate:    a.learning_rate,
            num_warmup_steps: a.num_warmup_steps,
            dropout:          a.dropout,
            shared_size:      a.shared_size,
            batch_size:       a.batch_size,
            num_train_steps:  a.num_train_steps,
            train_ratio:      a.train_ratio,
            limit:            a.limit,
            max_seq_len:      a.max_seq_len,
        }
    }
}

#[derive(Args, Debug)]
pub struct InstancesArgs {
    #[arg(long)]
    pub base_dir: PathBuf,

    #[arg(long)]
    pub model: String,
}

#[derive(Args, Debug)]
pub struct BuildTokenizerArgs {
    /// JSON-lines file of labeled samples
    #[arg(long, default_value = "samples.jsonl")]
    pub samples: PathBuf,

    /// Where tokenizer.json is written
    #[arg(long, default_value = "tokenizer")]
    pub tokenizer_dir: PathBuf,

    /// Vocabulary size including [PAD] and [UNK]
    #[arg(long, default_value_t = 30000)]
    pub vocab_size: usize,
}
