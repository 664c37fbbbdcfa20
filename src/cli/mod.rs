// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and wires the local collaborators
// (JSON-lines samples, tokenizer-backed embedder, filesystem
// classifier loader) into the application layer.
//
//   train           → TrainModelTask on a background thread,
//                     prints the final status
//   instances       → one line per instance: id + release flag
//   build-tokenizer → tokenizer.json from the samples file
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{BuildTokenizerArgs, Commands, InstancesArgs, TrainArgs};
use std::{fs, sync::Arc};

use crate::application::train_task::{
    spawn_task, StatusHolder, TaskEnvironment, TrainModelRequest, TrainModelTask,
};
use crate::domain::traits::StatusSink;
use crate::domain::vocabulary::Vocabulary;
use crate::infra::{
    instance_classifier::FsClassifierLoader,
    instance_store::InstanceStore,
    local_embedder::LocalEmbedderFactory,
    sample_file::JsonlSampleStore,
    tokenizer_store::TokenizerStore,
};

#[derive(Parser, Debug)]
#[command(
    name = "topic-trainer",
    version,
    about = "Train and version multi-label topic classifiers."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)          => run_train(args),
            Commands::Instances(args)      => run_instances(args),
            Commands::BuildTokenizer(args) => run_build_tokenizer(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    let vocab = match &args.vocab {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Cannot read vocabulary '{}'", path.display()))?;
            Some(Vocabulary::from_lines(&text).labels().to_vec())
        }
        None => None,
    };

    let request = TrainModelRequest {
        base_classifier_dir: args.base_dir.clone(),
        model:               args.model.clone(),
        vocab,
        bert:                args.bert.clone(),
        limit:               args.hyper.limit,
    };
    let env = TaskEnvironment {
        embedders:   Arc::new(LocalEmbedderFactory::new(&args.tokenizer_dir, args.hidden_size)),
        samples:     Arc::new(JsonlSampleStore::new(&args.samples)),
        classifiers: Arc::new(FsClassifierLoader),
        config:      args.hyper.into(),
    };

    let status = StatusHolder::new();
    status.set_status("Queued".to_string());
    let handle = spawn_task(Box::new(TrainModelTask::new(request, env)), status.clone());
    if handle.join().is_err() {
        anyhow::bail!("Training thread panicked");
    }

    let final_status = status.get();
    if let Some(reason) = final_status.strip_prefix("Failed: ") {
        anyhow::bail!("Training failed: {reason}");
    }
    println!("Trained instance: {final_status}");
    Ok(())
}

fn run_instances(args: InstancesArgs) -> Result<()> {
    let store = InstanceStore::new(&args.base_dir, &args.model)?;
    let released = FsClassifierLoader::released_id(&store)?;

    for id in store.list_instances()? {
        let instance = store.instance(&id);
        let flag = match instance.read_config() {
            Ok(cfg) if Some(&id) == released.as_ref() => format!("released (bert={})", cfg.bert),
            Ok(cfg) if cfg.is_released => format!("released, superseded (bert={})", cfg.bert),
            Ok(cfg) => format!("unreleased (bert={})", cfg.bert),
            Err(_) => "incomplete".to_string(),
        };
        println!("{id}\t{flag}");
    }
    Ok(())
}

fn run_build_tokenizer(args: BuildTokenizerArgs) -> Result<()> {
    let texts: Vec<String> = JsonlSampleStore::new(&args.samples)
        .read_all()?
        .into_iter()
        .map(|s| s.seq)
        .collect();
    tracing::info!("Building tokenizer from {} samples", texts.len());

    let tokenizer = TokenizerStore::new(&args.tokenizer_dir).build(&texts, args.vocab_size)?;
    println!(
        "Tokenizer with {} entries written to '{}'",
        tokenizer.get_vocab_size(false),
        args.tokenizer_dir.display()
    );
    Ok(())
}
