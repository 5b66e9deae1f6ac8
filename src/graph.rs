//! The explicit contract between this layer and the external trainable
//! computation graph. The graph is a black box: it owns the network
//! architecture and any internal parallelism, and exposes a strictly
//! synchronous call per batch.
use crate::channels::{Channel, ChannelData};
use anyhow::Result;
use ndarray::{Array1, Array2};

/// Receptor chain selector for the feature extractor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Chain {
    Alpha,
    Beta,
}

impl Chain {
    pub fn name(&self) -> &'static str {
        match self {
            Chain::Alpha => "alpha",
            Chain::Beta => "beta",
        }
    }

    /// The sequence channel carrying this chain.
    pub fn channel(&self) -> Channel {
        match self {
            Chain::Alpha => Channel::SeqAlpha,
            Chain::Beta => Channel::SeqBeta,
        }
    }
}

/// Sparse sample-membership indicator in coordinate form, shape
/// (samples, sequences). Entry (i, j) = 1 when sequence column j belongs to
/// sample row i; the graph uses it to pool sequence-level features into
/// sample-level representations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SparseIndicator {
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
    pub values: Vec<f64>,
    pub shape: (usize, usize),
}

impl SparseIndicator {
    /// Indicator mapping each sequence column to its encoded sample row.
    pub fn from_memberships(sample_of: &[usize], n_samples: usize) -> SparseIndicator {
        SparseIndicator {
            rows: sample_of.to_vec(),
            cols: (0..sample_of.len()).collect(),
            values: vec![1.0; sample_of.len()],
            shape: (n_samples, sample_of.len()),
        }
    }

    /// Identity indicator: each sequence is its own sample.
    pub fn identity(n: usize) -> SparseIndicator {
        SparseIndicator::from_memberships(&(0..n).collect::<Vec<_>>(), n)
    }

    /// Densified copy, mostly useful for tests and mock graphs.
    pub fn to_dense(&self) -> Array2<f64> {
        let mut out = Array2::zeros(self.shape);
        for ((&r, &c), &v) in self.rows.iter().zip(&self.cols).zip(&self.values) {
            out[[r, c]] = v;
        }
        out
    }
}

/// Everything fed to the graph for one batch. Only active channels are
/// populated; the witness-function fields stay `None` in per-sequence mode.
#[derive(Clone, Debug, Default)]
pub struct Feed {
    pub channels: Vec<(Channel, ChannelData)>,
    pub labels: Option<Array2<f64>>,
    /// Dropout keep probability; callers pass `None` to leave dropout off
    /// (the usual choice for evaluation passes).
    pub dropout_keep: Option<f64>,
    /// Clonal frequency of each sequence row (witness-function mode).
    pub freq: Option<Array1<f64>>,
    /// Sample-membership indicator (witness-function mode).
    pub indicator: Option<SparseIndicator>,
}

impl Feed {
    pub fn channel(&self, channel: Channel) -> Option<&ChannelData> {
        self.channels
            .iter()
            .find(|(c, _)| *c == channel)
            .map(|(_, data)| data)
    }
}

/// One forward pass worth of named outputs.
#[derive(Clone, Debug)]
pub struct StepOutput {
    pub loss: f64,
    pub accuracy: f64,
    /// Predicted scores, one row per batch row (sequence or sample).
    pub predicted: Array2<f64>,
}

/// The named slots this layer needs from the computation graph: inputs per
/// feature channel plus labels/frequency/indicator/dropout, and outputs for
/// loss, accuracy, prediction, the optimizer step and the per-chain
/// convolutional feature maps.
pub trait TrainableGraph {
    /// Forward pass plus one optimizer step.
    fn train_step(&mut self, feed: &Feed) -> Result<StepOutput>;

    /// Forward pass only.
    fn eval_step(&mut self, feed: &Feed) -> Result<StepOutput>;

    /// Inference-only prediction (no loss/accuracy outputs requested).
    fn predict(&mut self, feed: &Feed) -> Result<Array2<f64>>;

    /// Convolutional feature maps for one chain together with the position
    /// of maximal activation per (sequence, feature); both (n, features).
    fn sequence_features(&mut self, chain: Chain, feed: &Feed)
        -> Result<(Array2<f64>, Array2<usize>)>;
}
