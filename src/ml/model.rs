// ============================================================
// Layer 5 — Class-Based Attention Classifier
// ============================================================
// A light head over frozen sequence embeddings. Each class owns
// one attention query; the query picks the positions that matter
// for that class and pools them into one vector, which a per-class
// weight vector scores into a single logit.
//
//   embeddings [B, T, D] ─(optional shared projection)─▶ h [B, T, W]
//   scores   = h · Q            [B, T, C]   (padding → -10000)
//   alpha    = softmax over T   [B, T, C]
//   pooled   = alphaᵀ · h        [B, C, W]
//   logits_c = pooled_c · w_c + b_c          [B, C]
//
// W = shared_size when it is non-zero, D otherwise.
// Multi-label: each logit goes through its own sigmoid, trained
// with binary cross-entropy.

use burn::{
    nn::{
        loss::BinaryCrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::{activation::softmax, backend::AutodiffBackend},
};

/// Large negative score that masks padding out of the softmax.
const MASK_PENALTY: f64 = -10_000.0;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct ClassAttentionConfig {
    pub hidden_size: usize,
    pub num_classes: usize,
    /// Width of the shared projection; 0 attends on raw embeddings
    #[config(default = 0)]
    pub shared_size: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl ClassAttentionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ClassAttentionModel<B> {
        let shared = (self.shared_size > 0)
            .then(|| LinearConfig::new(self.hidden_size, self.shared_size).init(device));
        let width = self.attention_width();

        let class_queries = LinearConfig::new(width, self.num_classes)
            .with_bias(false)
            .init(device);
        let class_output = LinearConfig::new(width, self.num_classes).init(device);
        let dropout      = DropoutConfig::new(self.dropout).init();

        ClassAttentionModel { shared, class_queries, class_output, dropout }
    }

    pub fn attention_width(&self) -> usize {
        if self.shared_size > 0 { self.shared_size } else { self.hidden_size }
    }
}

#[derive(Module, Debug)]
pub struct ClassAttentionModel<B: Backend> {
    pub shared:        Option<Linear<B>>,
    pub class_queries: Linear<B>,
    /// weight [W, C]: column c is class c's scoring vector
    pub class_output:  Linear<B>,
    pub dropout:       Dropout,
}

impl<B: Backend> ClassAttentionModel<B> {
    /// embeddings: [batch, time, D], input_mask: [batch, time] → logits [batch, C]
    pub fn forward(&self, embeddings: Tensor<B, 3>, input_mask: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let h = match &self.shared {
            Some(shared) => shared.forward(embeddings),
            None         => embeddings,
        };
        let [batch, time, width] = h.dims();

        let scores = self.class_queries.forward(h.clone()); // [B, T, C]
        let [_, _, classes] = scores.dims();

        // 0 for real positions, MASK_PENALTY for padding
        let penalty = input_mask
            .float()
            .neg()
            .add_scalar(1.0)
            .mul_scalar(MASK_PENALTY)
            .unsqueeze_dim::<3>(2)
            .expand([batch, time, classes]);
        let alpha = softmax(scores + penalty, 1); // over time

        let pooled = alpha.swap_dims(1, 2).matmul(h); // [B, C, W]
        let pooled = self.dropout.forward(pooled);

        let weights = self
            .class_output
            .weight
            .val()
            .transpose()                 // [C, W]
            .unsqueeze::<3>()            // [1, C, W]
            .expand([batch, classes, width]);
        let logits = (pooled * weights).sum_dim(2).reshape([batch, classes]);

        match &self.class_output.bias {
            Some(bias) => logits + bias.val().unsqueeze::<2>().expand([batch, classes]),
            None       => logits,
        }
    }

    /// Independent per-class probabilities
    pub fn predict(&self, embeddings: Tensor<B, 3>, input_mask: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        burn::tensor::activation::sigmoid(self.forward(embeddings, input_mask))
    }

    pub fn forward_loss(
        &self,
        embeddings: Tensor<B, 3>,
        input_mask: Tensor<B, 2, Int>,
        label_ids:  Tensor<B, 2, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>)
    where
        B: AutodiffBackend,
    {
        let logits = self.forward(embeddings, input_mask);
        let bce = BinaryCrossEntropyLossConfig::new()
            .with_logits(true)
            .init(&logits.device());
        let loss = bce.forward(logits.clone(), label_ids);
        (loss, logits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn inputs(device: &<TestBackend as Backend>::Device) -> (Tensor<TestBackend, 3>, Tensor<TestBackend, 2, Int>) {
        let emb = Tensor::<TestBackend, 3>::ones([2, 4, 3], device);
        let mask = Tensor::<TestBackend, 1, Int>::from_ints([1, 1, 0, 0, 1, 0, 0, 0], device)
            .reshape([2, 4]);
        (emb, mask)
    }

    #[test]
    fn test_logits_shape() {
        let device = Default::default();
        let model: ClassAttentionModel<TestBackend> =
            ClassAttentionConfig::new(3, 5).with_dropout(0.0).init(&device);
        let (emb, mask) = inputs(&device);
        assert_eq!(model.forward(emb, mask).dims(), [2, 5]);
    }

    #[test]
    fn test_shared_projection_shape() {
        let device = Default::default();
        let cfg = ClassAttentionConfig::new(3, 2).with_shared_size(6).with_dropout(0.0);
        assert_eq!(cfg.attention_width(), 6);
        let model: ClassAttentionModel<TestBackend> = cfg.init(&device);
        let (emb, mask) = inputs(&device);
        assert_eq!(model.forward(emb, mask).dims(), [2, 2]);
    }

    #[test]
    fn test_padding_content_is_ignored() {
        let device = Default::default();
        let model: ClassAttentionModel<TestBackend> =
            ClassAttentionConfig::new(3, 2).with_dropout(0.0).init(&device);
        let mask = Tensor::<TestBackend, 1, Int>::from_ints([1, 1, 0, 0], &device).reshape([1, 4]);

        let clean = Tensor::<TestBackend, 1>::from_floats(
            [0.5, 0.1, 0.2, 0.3, 0.4, 0.9, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            &device,
        )
        .reshape([1, 4, 3]);
        let noisy = Tensor::<TestBackend, 1>::from_floats(
            [0.5, 0.1, 0.2, 0.3, 0.4, 0.9, 7.0, 7.0, 7.0, -3.0, 2.0, 9.0],
            &device,
        )
        .reshape([1, 4, 3]);

        let a: Vec<f32> = model.predict(clean, mask.clone()).into_data().to_vec::<f32>().unwrap();
        let b: Vec<f32> = model.predict(noisy, mask).into_data().to_vec::<f32>().unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-4, "{x} vs {y}");
        }
    }
}
