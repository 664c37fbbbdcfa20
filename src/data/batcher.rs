// ============================================================
// Layer 4 — Topic Batcher
// ============================================================
// Implements Burn's Batcher trait to stack FeatureRecords into
// tensors for the training loop.
//
//   Input:  Vec of N FeatureRecords, each [T, D] + mask [T]
//   Output: TopicBatch
//             embeddings [N, T, D]  float
//             input_mask [N, T]     int
//             label_ids  [N, C]     int
//
// All records are already padded to the same T, so stacking is
// a flatten followed by a reshape.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::features::FeatureRecord;

/// A batch of feature records ready for the forward pass.
#[derive(Debug, Clone)]
pub struct TopicBatch<B: Backend> {
    /// shape: [batch_size, max_len, hidden_size]
    pub embeddings: Tensor<B, 3>,

    /// shape: [batch_size, max_len] — 1 = real position, 0 = padding
    pub input_mask: Tensor<B, 2, Int>,

    /// shape: [batch_size, num_classes] — multi-hot targets
    pub label_ids: Tensor<B, 2, Int>,
}

#[derive(Clone, Debug)]
pub struct TopicBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> TopicBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<FeatureRecord, TopicBatch<B>> for TopicBatcher<B> {
    fn batch(&self, items: Vec<FeatureRecord>) -> TopicBatch<B> {
        let batch_size  = items.len();
        let max_len     = items[0].max_len;
        let hidden_size = items[0].hidden_size;
        let num_classes = items[0].num_classes();

        let emb_flat: Vec<f32> = items
            .iter()
            .flat_map(|r| r.embeddings.iter().copied())
            .collect();

        let mask_flat: Vec<i32> = items
            .iter()
            .flat_map(|r| r.input_mask.iter().map(|&m| m as i32))
            .collect();

        let label_flat: Vec<i32> = items
            .iter()
            .flat_map(|r| r.label_ids.iter().map(|&l| l as i32))
            .collect();

        let embeddings = Tensor::<B, 1>::from_floats(emb_flat.as_slice(), &self.device)
            .reshape([batch_size, max_len, hidden_size]);

        let input_mask = Tensor::<B, 1, Int>::from_ints(mask_flat.as_slice(), &self.device)
            .reshape([batch_size, max_len]);

        let label_ids = Tensor::<B, 1, Int>::from_ints(label_flat.as_slice(), &self.device)
            .reshape([batch_size, num_classes]);

        TopicBatch { embeddings, input_mask, label_ids }
    }
}
