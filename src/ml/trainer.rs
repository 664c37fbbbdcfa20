// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Step-driven training over a repeating, reshuffled dataset.
//
//   - Batches of cfg.batch_size; the last batch of a pass may
//     be short (no drop_remainder)
//   - The DataLoader reshuffles on every pass, so each repeat
//     cycle sees a new order
//   - The loop stops after exactly cfg.num_train_steps optimizer
//     steps, wherever that lands relative to pass boundaries
//   - Weights are checkpointed every min(num_train_steps, 500)
//     steps and at the final step
//
// Learning rate: linear warm-up to cfg.learning_rate over
// cfg.num_warmup_steps, then linear decay towards zero at
// cfg.num_train_steps.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam,
//            Devlin et al. (2019) BERT warm-up schedule

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, Autodiff, NdArray},
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::TopicBatcher, dataset::TopicDataset};
use crate::domain::error::TrainError;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{MetricsLogger, StepMetrics};
use crate::ml::model::{ClassAttentionConfig, ClassAttentionModel};

pub type TrainBackend = Autodiff<NdArray>;
pub type InferBackend = NdArray;

/// Seed for the per-pass reshuffle.
const SHUFFLE_SEED: u64 = 42;

/// A finished model on the inference backend, plus the config that
/// rebuilds its architecture.
#[derive(Debug)]
pub struct TrainedModel {
    pub model:  ClassAttentionModel<InferBackend>,
    pub config: ClassAttentionConfig,
    pub steps:  usize,
}

/// Warm-up then linear decay.
#[derive(Debug, Clone, Copy)]
pub struct LearningRateSchedule {
    peak:         f64,
    warmup_steps: usize,
    total_steps:  usize,
}

impl LearningRateSchedule {
    pub fn new(peak: f64, warmup_steps: usize, total_steps: usize) -> Self {
        Self { peak, warmup_steps, total_steps }
    }

    /// Learning rate for the (0-based) step about to run.
    pub fn at(&self, step: usize) -> f64 {
        let decayed = self.peak * (1.0 - step as f64 / self.total_steps.max(1) as f64);
        if step < self.warmup_steps {
            // (step + 1) so the very first update is not a no-op
            let warm = self.peak * (step + 1) as f64 / self.warmup_steps as f64;
            warm.min(decayed.max(0.0)).max(0.0)
        } else {
            decayed.max(0.0)
        }
    }
}

/// True when `step` (1-based, already taken) gets a checkpoint.
fn is_checkpoint_step(step: usize, every: usize, total_steps: usize) -> bool {
    step == total_steps || (every > 0 && step % every == 0)
}

pub fn run_training(
    cfg:          &TrainConfig,
    dataset:      TopicDataset,
    ckpt_manager: &CheckpointManager,
) -> Result<TrainedModel> {
    let device = NdArrayDevice::default();
    tracing::info!("Using NdArray device: {:?}", device);
    train_loop(cfg, dataset, ckpt_manager, device)
}

fn train_loop(
    cfg:          &TrainConfig,
    dataset:      TopicDataset,
    ckpt_manager: &CheckpointManager,
    device:       NdArrayDevice,
) -> Result<TrainedModel> {
    if dataset.record_count() == 0 {
        return Err(TrainError::Data("training split is empty".to_string()).into());
    }

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = ClassAttentionConfig::new(dataset.hidden_size(), dataset.num_classes())
        .with_shared_size(cfg.shared_size)
        .with_dropout(cfg.dropout);
    let mut model: ClassAttentionModel<TrainBackend> = model_cfg.init(&device);
    tracing::info!(
        "Model ready: hidden={}, classes={}, shared_size={}",
        model_cfg.hidden_size,
        model_cfg.num_classes,
        model_cfg.shared_size
    );

    let mut optim = AdamConfig::new().with_epsilon(1e-6).init();

    // ── Repeating, reshuffled data loader ─────────────────────────────────────
    let batcher = TopicBatcher::<TrainBackend>::new(device.clone());
    let loader  = DataLoaderBuilder::new(batcher)
        .batch_size(cfg.batch_size)
        .shuffle(SHUFFLE_SEED)
        .num_workers(1)
        .build(dataset);

    let schedule    = LearningRateSchedule::new(cfg.learning_rate, cfg.num_warmup_steps, cfg.num_train_steps);
    let every       = cfg.checkpoint_every();
    let total_steps = cfg.num_train_steps;
    let metrics     = MetricsLogger::new(ckpt_manager.dir())?;

    // ── Step loop ─────────────────────────────────────────────────────────────
    let mut step = 0usize;
    'training: loop {
        for batch in loader.iter() {
            let lr = schedule.at(step);
            let (loss, _) = model.forward_loss(batch.embeddings, batch.input_mask, batch.label_ids);
            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(lr, model, grads);
            step += 1;

            if is_checkpoint_step(step, every, total_steps) {
                ckpt_manager.save_model(&model, step)?;
                metrics.log(&StepMetrics::new(step, loss_val, lr))?;
                tracing::info!("Step {:>6}/{} | loss={:.4} | lr={:.6}", step, total_steps, loss_val, lr);
            }

            if step >= total_steps {
                break 'training;
            }
        }
    }

    tracing::info!("Training complete after {} steps", step);
    Ok(TrainedModel { model: model.valid(), config: model_cfg, steps: step })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::MAX_CHECKPOINT_INTERVAL;
    use crate::data::features::FeatureRecord;
    use tempfile::tempdir;

    fn tiny_dataset(n: usize) -> TopicDataset {
        TopicDataset::new(
            (0..n)
                .map(|i| {
                    let x = i as f32 / n as f32;
                    let labels = if i % 2 == 0 { vec![1, 0] } else { vec![0, 1] };
                    FeatureRecord::from_sequence(&[vec![x, 1.0 - x]], labels, 3, 2)
                })
                .collect(),
        )
    }

    fn step_files(ckpt: &CheckpointManager) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(ckpt.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with("model_step_"))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_checkpoint_cadence() {
        let steps = |total: usize, every: usize| -> Vec<usize> {
            (1..=total).filter(|&s| is_checkpoint_step(s, every, total)).collect()
        };
        assert_eq!(steps(1203, 500), vec![500, 1000, 1203]);
        assert_eq!(steps(1000, 500), vec![500, 1000]);
        assert_eq!(steps(7, 7), vec![7]);
    }

    #[test]
    fn test_stops_after_exact_steps_across_passes() {
        let dir  = tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        // 5 records at batch 2 is 3 batches per pass, so 7 steps
        // ends one batch into the third pass
        let cfg = TrainConfig {
            batch_size:       2,
            num_train_steps:  7,
            num_warmup_steps: 1,
            ..TrainConfig::default()
        };

        let trained = run_training(&cfg, tiny_dataset(5), &ckpt).unwrap();
        assert_eq!(trained.steps, 7);
        assert_eq!(ckpt.latest_step().unwrap(), Some(7));
        assert_eq!(step_files(&ckpt), vec!["model_step_7.mpk.gz"]);

        let rows = MetricsLogger::new(ckpt.dir()).unwrap().read_all().unwrap();
        assert_eq!(rows.iter().map(|m| m.step).collect::<Vec<_>>(), vec![7]);
    }

    #[test]
    fn test_periodic_and_final_checkpoints() {
        let dir  = tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let cfg  = TrainConfig {
            batch_size:       3,
            num_train_steps:  MAX_CHECKPOINT_INTERVAL + 3,
            num_warmup_steps: 1,
            ..TrainConfig::default()
        };

        let trained = run_training(&cfg, tiny_dataset(3), &ckpt).unwrap();
        assert_eq!(trained.steps, 503);
        assert_eq!(ckpt.latest_step().unwrap(), Some(503));
        assert_eq!(step_files(&ckpt), vec!["model_step_500.mpk.gz", "model_step_503.mpk.gz"]);
    }

    #[test]
    fn test_empty_dataset_rejected() {
        let dir  = tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let err  = run_training(&TrainConfig::default(), TopicDataset::new(vec![]), &ckpt).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_schedule_warms_up_then_decays() {
        let s = LearningRateSchedule::new(0.02, 100, 1000);
        assert!(s.at(0) > 0.0);
        assert!(s.at(10) < s.at(50));
        assert!((s.at(99) - 0.02 * (1.0 - 99.0 / 1000.0)).abs() < 1e-9);
        assert!(s.at(500) > s.at(900));
        assert_eq!(s.at(1000), 0.0);
    }

    #[test]
    fn test_schedule_single_step_is_positive() {
        let s = LearningRateSchedule::new(0.02, 100, 1);
        let lr = s.at(0);
        assert!(lr > 0.0 && lr <= 0.02);
    }
}
