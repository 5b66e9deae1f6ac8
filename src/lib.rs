#![warn(clippy::large_types_passed_by_value)]
//! Training-loop plumbing and post-hoc differential feature analysis for
//! deep immune-repertoire (TCR) classifiers.
//!
//! The crate marshals heterogeneous per-sequence and per-sample arrays
//! (encoded receptor sequences, V/D/J gene usage, clonal frequencies,
//! sparse sample-membership indicators) into an external trainable
//! computation graph, in both per-sequence and witness-function (sample
//! aggregated) modes, and ranks the learned feature activations by their
//! separation between phenotype groups.

pub mod analysis;
pub mod batch;
pub mod channels;
pub mod graph;
pub mod partition;
pub mod plot;
pub mod runner;
pub mod stats;
pub mod utils;

pub use crate::analysis::{
    diff_features, diff_features_witness, DiffFeatureRow, DiffOptions, DiffResult, MotifTable,
    WitnessDiffOptions,
};
pub use crate::batch::{batches, batches_ordered, tile_sequences, Batches};
pub use crate::channels::{Channel, ChannelData, ChannelSet, DataSet, RepertoireData, SampleSet};
pub use crate::graph::{Chain, Feed, SparseIndicator, StepOutput, TrainableGraph};
pub use crate::partition::{
    split_by_indices, split_indices, train_valid_test, Split, SplitIndices,
};
pub use crate::runner::{
    extract_sequence_features, run_epoch_sequence, run_epoch_witness, sequence_predictions,
    EpochMetrics, ExtractedFeatures, FeatureCache, RunConfig,
};
pub use crate::utils::LabelEncoder;
