// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the sample datastore and tensor batches:
//
//   SampleStore
//       │
//       ▼
//   snapshot     → rows captured under the global sample lock
//       │
//       ▼
//   splitter     → seeded train/test partition
//       │
//       ├──▶ split_file → train_seqs.csv / test_seqs.csv
//       ▼
//   features     → examples → padded FeatureRecords
//       │
//       ▼
//   TopicDataset → implements Burn's Dataset trait
//       │
//       ▼
//   TopicBatcher → stacks records into tensor batches
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Global sample lock and snapshot capture
pub mod snapshot;

/// Deterministic train/test split
pub mod splitter;

/// One-column CSV split files
pub mod split_file;

/// Examples and fixed-width feature records
pub mod features;

/// Implements Burn's Dataset trait for feature records
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
